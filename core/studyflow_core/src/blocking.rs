use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::store::{self, StoreResult, BLOCKED_SITES_KEY};

pub const MAX_RULES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleActionType {
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: RuleActionType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// A declarative block rule in the shape the extension installs as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

/// Full replacement: drop every id the service could have installed, then
/// add the fresh set.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<BlockRule>,
}

/// Trimmed, non-empty, first occurrence wins.
pub fn normalize_sites<S: AsRef<str>>(sites: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    sites
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

pub fn build_rules<S: AsRef<str>>(sites: &[S]) -> Vec<BlockRule> {
    let sites = normalize_sites(sites);
    if sites.len() > MAX_RULES {
        warn!(
            "{} blocked sites exceed the {MAX_RULES} rule cap; dropping {}",
            sites.len(),
            sites.len() - MAX_RULES
        );
    }
    sites
        .into_iter()
        .take(MAX_RULES)
        .enumerate()
        .map(|(i, site)| BlockRule {
            id: i as u32 + 1,
            priority: 1,
            action: RuleAction {
                kind: RuleActionType::Block,
            },
            condition: RuleCondition {
                url_filter: site,
                resource_types: vec![ResourceType::MainFrame],
            },
        })
        .collect()
}

/// The rule set currently installed in the browser.
#[derive(Debug, Default)]
pub struct RuleSet {
    installed: Vec<BlockRule>,
}

impl RuleSet {
    pub fn replace_all<S: AsRef<str>>(&mut self, sites: &[S]) -> RuleUpdate {
        let rules = build_rules(sites);
        info!("blocking rules replaced: {} active", rules.len());
        self.installed = rules.clone();
        RuleUpdate {
            remove_rule_ids: (1..=MAX_RULES as u32).collect(),
            add_rules: rules,
        }
    }

    pub fn rules(&self) -> &[BlockRule] {
        &self.installed
    }

    /// First rule whose filter occurs in `url`, case-insensitively.
    pub fn matching_rule(&self, url: &str) -> Option<&BlockRule> {
        let url = url.to_lowercase();
        self.installed
            .iter()
            .find(|r| url.contains(&r.condition.url_filter.to_lowercase()))
    }

    #[cfg(test)]
    pub fn is_blocked(&self, url: &str) -> bool {
        self.matching_rule(url).is_some()
    }
}

pub fn blocked_sites(conn: &Connection) -> StoreResult<Vec<String>> {
    store::kv_read_or_default(conn, BLOCKED_SITES_KEY)
}

/// Stores the normalized list and returns it.
pub fn set_blocked_sites<S: AsRef<str>>(
    conn: &Connection,
    sites: &[S],
) -> StoreResult<Vec<String>> {
    let sites = normalize_sites(sites);
    store::kv_set(conn, BLOCKED_SITES_KEY, &sites)?;
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_shape_matches_declarative_format() {
        let rules = build_rules(&["reddit.com"]);
        let v = serde_json::to_value(&rules[0]).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "id": 1,
                "priority": 1,
                "action": {"type": "block"},
                "condition": {"urlFilter": "reddit.com", "resourceTypes": ["main_frame"]}
            })
        );
    }

    #[test]
    fn rules_are_capped_and_fully_replaced() {
        let sites: Vec<String> = (0..150).map(|i| format!("site{i}.com")).collect();
        let mut set = RuleSet::default();
        let update = set.replace_all(&sites);
        assert_eq!(update.add_rules.len(), MAX_RULES);
        assert_eq!(update.add_rules.last().unwrap().id, 100);
        assert_eq!(update.remove_rule_ids.len(), MAX_RULES);

        let update = set.replace_all(&["x.com"]);
        assert_eq!(update.remove_rule_ids, (1..=100).collect::<Vec<u32>>());
        assert_eq!(set.rules().len(), 1);
    }

    #[test]
    fn empty_and_duplicate_sites_are_skipped() {
        let rules = build_rules(&[" youtube.com ", "", "YouTube.com", "x.com"]);
        let filters: Vec<&str> = rules.iter().map(|r| r.condition.url_filter.as_str()).collect();
        assert_eq!(filters, vec!["youtube.com", "x.com"]);
        assert_eq!(rules[1].id, 2);
    }

    #[test]
    fn is_blocked_uses_substring_match() {
        let mut set = RuleSet::default();
        set.replace_all(&["reddit.com"]);
        assert!(set.is_blocked("https://www.Reddit.com/r/rust"));
        assert!(!set.is_blocked("https://github.com"));
    }

    #[test]
    fn blocked_sites_roundtrip() {
        let conn = store::test_conn();
        assert!(blocked_sites(&conn).unwrap().is_empty());
        let stored = set_blocked_sites(&conn, &["a.com", "a.com", " b.com"]).unwrap();
        assert_eq!(stored, vec!["a.com", "b.com"]);
        assert_eq!(blocked_sites(&conn).unwrap(), stored);
    }
}
