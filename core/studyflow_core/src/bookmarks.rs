use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::classify::{bookmark_category, extract_domain, is_web_url, Category};
use crate::clock::{next_id, rfc3339};
use crate::error::AppError;
use crate::progress::award_xp;
use crate::store::{self, StoreError, StoreResult, BOOKMARKS_KEY};
use crate::tracker::TabView;

pub const ADD_BOOKMARK_XP: i64 = 5;
pub const IMPORT_BOOKMARK_XP: i64 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub category: String,
    /// Minutes.
    #[serde(default)]
    pub time_spent: i64,
    pub added_at: String,
    #[serde(default)]
    pub last_visited: String,
    #[serde(default)]
    pub is_custom: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewBookmark {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBookmark {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub category: String,
    pub time_spent: i64,
    pub added_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_date: String,
    pub total_bookmarks: usize,
    pub bookmarks: Vec<ExportedBookmark>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

pub fn list(conn: &Connection) -> StoreResult<Vec<Bookmark>> {
    store::kv_read_or_default(conn, BOOKMARKS_KEY)
}

/// Most time first, optionally restricted to one category.
pub fn list_sorted(conn: &Connection, category: Option<&str>) -> StoreResult<Vec<Bookmark>> {
    let mut out: Vec<Bookmark> = list(conn)?
        .into_iter()
        .filter(|b| category.map_or(true, |c| b.category == c))
        .collect();
    out.sort_by(|a, b| b.time_spent.cmp(&a.time_spent).then_with(|| a.title.cmp(&b.title)));
    Ok(out)
}

/// Promotes productive tabs with at least `min_minutes` into bookmarks.
/// Automatic bookmarks keep their best time; custom ones are left alone.
pub fn sync_from_tabs(
    conn: &mut Connection,
    tabs: &[TabView],
    min_minutes: i64,
    now: OffsetDateTime,
) -> StoreResult<usize> {
    let candidates: Vec<&TabView> = tabs
        .iter()
        .filter(|t| t.category == Category::Productive && t.time_spent >= min_minutes)
        .collect();
    if candidates.is_empty() {
        return Ok(0);
    }

    let ts = rfc3339(now);
    let added = store::kv_update(conn, BOOKMARKS_KEY, |bookmarks: &mut Vec<Bookmark>| {
        let mut added = 0;
        for tab in candidates {
            if let Some(b) = bookmarks.iter_mut().find(|b| b.domain == tab.domain) {
                if !b.is_custom {
                    b.time_spent = b.time_spent.max(tab.time_spent);
                    b.last_visited = ts.clone();
                    if !tab.title.is_empty() {
                        b.title = tab.title.clone();
                    }
                }
                continue;
            }
            let title = if tab.title.is_empty() {
                tab.domain.clone()
            } else {
                tab.title.clone()
            };
            bookmarks.push(Bookmark {
                id: next_id(bookmarks.iter().map(|b| b.id), now),
                title,
                url: tab.url.clone(),
                domain: tab.domain.clone(),
                category: bookmark_category(&tab.domain).to_string(),
                time_spent: tab.time_spent,
                added_at: ts.clone(),
                last_visited: ts.clone(),
                is_custom: false,
            });
            added += 1;
        }
        added
    })?;
    debug!("bookmark sync added {added}");
    Ok(added)
}

pub fn add_custom(
    conn: &mut Connection,
    new: NewBookmark,
    now: OffsetDateTime,
) -> Result<Bookmark, AppError> {
    let title = new.title.trim().to_string();
    let url = new.url.trim().to_string();
    if title.is_empty() {
        return Err(AppError::MissingTitle);
    }
    if url.is_empty() {
        return Err(AppError::MissingUrl);
    }
    if !is_web_url(&url) {
        return Err(AppError::InvalidUrl);
    }
    let domain = extract_domain(&url);
    let category = new
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| bookmark_category(&domain).to_string());

    store::transact(conn, |tx| {
        let mut bookmarks: Vec<Bookmark> = store::kv_get_or_default(tx, BOOKMARKS_KEY)?;
        if bookmarks.iter().any(|b| b.domain == domain) {
            return Err(AppError::DuplicateDomain);
        }
        let ts = rfc3339(now);
        let bookmark = Bookmark {
            id: next_id(bookmarks.iter().map(|b| b.id), now),
            title,
            url,
            domain,
            category,
            time_spent: 0,
            added_at: ts.clone(),
            last_visited: ts,
            is_custom: true,
        };
        bookmarks.push(bookmark.clone());
        store::kv_set(tx, BOOKMARKS_KEY, &bookmarks)?;
        award_xp(tx, ADD_BOOKMARK_XP)?;
        info!("bookmark added: {}", bookmark.domain);
        Ok(bookmark)
    })
}

pub fn remove(conn: &mut Connection, id: i64) -> Result<(), AppError> {
    store::kv_try_update(conn, BOOKMARKS_KEY, |bookmarks: &mut Vec<Bookmark>| {
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        if bookmarks.len() == before {
            Err(AppError::NotFound)
        } else {
            Ok(())
        }
    })
}

pub fn export(conn: &Connection, now: OffsetDateTime) -> Result<ExportDocument, AppError> {
    let bookmarks = list(conn)?;
    if bookmarks.is_empty() {
        return Err(AppError::NothingToExport);
    }
    Ok(ExportDocument {
        export_date: rfc3339(now),
        total_bookmarks: bookmarks.len(),
        bookmarks: bookmarks
            .into_iter()
            .map(|b| ExportedBookmark {
                title: b.title,
                url: b.url,
                domain: b.domain,
                category: b.category,
                time_spent: b.time_spent,
                added_at: b.added_at,
            })
            .collect(),
    })
}

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("")
}

/// Imports an exported document. The document must carry a `bookmarks`
/// array; otherwise nothing is written.
pub fn import(
    conn: &mut Connection,
    doc: &Value,
    now: OffsetDateTime,
) -> Result<ImportOutcome, AppError> {
    let entries = doc
        .get("bookmarks")
        .and_then(Value::as_array)
        .ok_or(AppError::InvalidImport)?;

    let ts = rfc3339(now);
    store::transact(conn, |tx| {
        let mut bookmarks: Vec<Bookmark> = store::kv_get_or_default(tx, BOOKMARKS_KEY)?;
        let mut seen: HashSet<String> = bookmarks.iter().map(|b| b.domain.clone()).collect();
        let mut imported = 0;

        for entry in entries {
            let domain = str_field(entry, "domain").to_lowercase();
            if domain.is_empty() || !seen.insert(domain.clone()) {
                continue;
            }
            let url = str_field(entry, "url");
            let title = match str_field(entry, "title") {
                "" => domain.clone(),
                t => t.to_string(),
            };
            let category = match str_field(entry, "category") {
                "" => bookmark_category(&domain).to_string(),
                c => c.to_string(),
            };
            bookmarks.push(Bookmark {
                id: next_id(bookmarks.iter().map(|b| b.id), now),
                title,
                url: if url.is_empty() { format!("https://{domain}") } else { url.to_string() },
                domain,
                category,
                time_spent: entry.get("timeSpent").and_then(Value::as_i64).unwrap_or(0).max(0),
                added_at: ts.clone(),
                last_visited: ts.clone(),
                is_custom: true,
            });
            imported += 1;
        }

        if imported > 0 {
            store::kv_set(tx, BOOKMARKS_KEY, &bookmarks)?;
            award_xp(tx, IMPORT_BOOKMARK_XP * imported as i64)?;
        }
        info!("imported {imported} bookmarks");
        Ok::<_, StoreError>(ImportOutcome {
            imported,
            skipped: entries.len() - imported,
        })
    })
    .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::at;
    use crate::progress::xp;

    fn view(domain: &str, category: Category, minutes: i64) -> TabView {
        TabView {
            id: "1".to_string(),
            title: format!("{domain} title"),
            url: format!("https://{domain}/"),
            domain: domain.to_string(),
            category,
            time_spent: minutes,
            is_active: false,
            last_accessed: "2026-02-15T10:00:00Z".to_string(),
            visit_count: 1,
        }
    }

    fn custom(title: &str, url: &str) -> NewBookmark {
        NewBookmark {
            title: title.to_string(),
            url: url.to_string(),
            category: None,
        }
    }

    #[test]
    fn sync_promotes_productive_tabs_over_threshold() {
        let mut conn = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        let tabs = vec![
            view("github.com", Category::Productive, 12),
            view("arxiv.org", Category::Productive, 4),
            view("reddit.com", Category::Distracting, 60),
        ];
        assert_eq!(sync_from_tabs(&mut conn, &tabs, 5, now).unwrap(), 1);
        let b = &list(&conn).unwrap()[0];
        assert_eq!(b.domain, "github.com");
        assert_eq!(b.category, "documentation");
        assert!(!b.is_custom);

        let tabs = vec![view("github.com", Category::Productive, 7)];
        assert_eq!(sync_from_tabs(&mut conn, &tabs, 5, now).unwrap(), 0);
        assert_eq!(list(&conn).unwrap()[0].time_spent, 12);
    }

    #[test]
    fn sync_leaves_custom_bookmarks_alone() {
        let mut conn = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        add_custom(&mut conn, custom("Mine", "https://github.com/me"), now).unwrap();
        let tabs = vec![view("github.com", Category::Productive, 30)];
        sync_from_tabs(&mut conn, &tabs, 5, now).unwrap();
        let all = list(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Mine");
        assert_eq!(all[0].time_spent, 0);
    }

    #[test]
    fn add_custom_validates_and_rejects_duplicates() {
        let mut conn = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        assert!(matches!(
            add_custom(&mut conn, custom("", "https://a.com"), now),
            Err(AppError::MissingTitle)
        ));
        assert!(matches!(
            add_custom(&mut conn, custom("A", "notaurl"), now),
            Err(AppError::InvalidUrl)
        ));
        let b = add_custom(&mut conn, custom("Docs", "https://www.react.dev/learn"), now).unwrap();
        assert_eq!(b.domain, "react.dev");
        assert_eq!(b.category, "documentation");
        assert!(matches!(
            add_custom(&mut conn, custom("Again", "https://react.dev"), now),
            Err(AppError::DuplicateDomain)
        ));
        assert_eq!(xp(&conn).unwrap(), ADD_BOOKMARK_XP);

        remove(&mut conn, b.id).unwrap();
        assert!(matches!(export(&conn, now), Err(AppError::NothingToExport)));
    }

    #[test]
    fn export_then_import_into_empty_store() {
        let mut src = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        add_custom(&mut src, custom("Docs", "https://react.dev"), now).unwrap();
        add_custom(&mut src, custom("Papers", "https://arxiv.org"), now).unwrap();
        let doc = serde_json::to_value(export(&src, now).unwrap()).unwrap();
        assert_eq!(doc["totalBookmarks"], 2);

        let mut dst = store::test_conn();
        let out = import(&mut dst, &doc, now).unwrap();
        assert_eq!(out.imported, 2);
        let again = import(&mut dst, &doc, now).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped, 2);

        let mut domains: Vec<String> = list(&dst).unwrap().into_iter().map(|b| b.domain).collect();
        domains.sort();
        assert_eq!(domains, vec!["arxiv.org", "react.dev"]);
        assert!(list(&dst).unwrap().iter().all(|b| b.is_custom));
        assert_eq!(xp(&dst).unwrap(), 2 * IMPORT_BOOKMARK_XP);
    }

    #[test]
    fn import_rejects_malformed_and_skips_in_file_duplicates() {
        let mut conn = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        let bad = serde_json::json!({"items": []});
        assert!(matches!(import(&mut conn, &bad, now), Err(AppError::InvalidImport)));
        assert!(list(&conn).unwrap().is_empty());

        let doc = serde_json::json!({"bookmarks": [
            {"title": "A", "url": "https://a.dev", "domain": "a.dev"},
            {"title": "A again", "url": "https://a.dev/x", "domain": "a.dev"},
            {"title": "No domain"}
        ]});
        let out = import(&mut conn, &doc, now).unwrap();
        assert_eq!(out.imported, 1);
        assert_eq!(out.skipped, 2);
    }

    #[test]
    fn list_sorted_by_time_with_filter() {
        let mut conn = store::test_conn();
        let now = at("2026-02-15T10:00:00Z");
        let tabs = vec![
            view("github.com", Category::Productive, 12),
            view("arxiv.org", Category::Productive, 40),
            view("react.dev", Category::Productive, 20),
        ];
        sync_from_tabs(&mut conn, &tabs, 5, now).unwrap();
        let all: Vec<String> = list_sorted(&conn, None)
            .unwrap()
            .into_iter()
            .map(|b| b.domain)
            .collect();
        assert_eq!(all, vec!["arxiv.org", "react.dev", "github.com"]);
        let docs = list_sorted(&conn, Some("documentation")).unwrap();
        assert_eq!(docs.len(), 2);
    }
}
