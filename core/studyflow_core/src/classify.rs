use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Productive,
    Distracting,
    #[default]
    Neutral,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Productive => "productive",
            Category::Distracting => "distracting",
            Category::Neutral => "neutral",
        }
    }
}

const PRODUCTIVE_SITES: &[&str] = &[
    // learning platforms
    "khanacademy.org", "coursera.org", "edx.org", "udemy.com", "nptel.ac.in",
    "unacademy.com", "byjus.com", "vedantu.com", "toppr.com", "academicearth.org",
    // ai tools
    "chat.openai.com", "chatgpt.com", "claude.ai", "gemini.google.com", "bard.google.com",
    "perplexity.ai", "quillbot.com", "grammarly.com", "chatpdf.com", "doctrina.ai",
    "unriddle.ai", "otter.ai", "notion.ai",
    // notes and flashcards
    "quizlet.com", "brainscape.com", "sparknotes.com", "chegg.com", "coursehero.com",
    "studocu.com", "study.com", "clearias.com", "examrace.com", "jagranjosh.com",
    // research
    "scholar.google.com", "ndl.iitkgp.ac.in", "jstor.org", "pubmed.ncbi.nlm.nih.gov",
    "eric.ed.gov", "researchgate.net", "muse.jhu.edu", "sciencedirect.com",
    "zotero.org", "mendeley.com", "arxiv.org",
    // focus tools
    "notion.so", "todoist.com", "upbase.io", "flocus.com", "lifeat.io",
    "loficafe.com", "noisli.com", "imissmycafe.com", "lucidchart.com", "trello.com",
    // programming
    "github.com", "stackoverflow.com", "codecademy.com", "freecodecamp.org",
    "mdn.mozilla.org", "w3schools.com", "react.dev", "vuejs.org", "angular.io",
    "developer.mozilla.org", "npmjs.com", "leetcode.com", "hackerrank.com",
    "codepen.io", "replit.com", "codesandbox.io", "glitch.com",
    // docs and articles
    "medium.com", "dev.to", "hashnode.com", "wikipedia.org",
    "ted.com", "brilliant.org", "skillshare.com",
    // careers
    "linkedin.com", "glassdoor.com", "indeed.com",
    "pluralsight.com", "lynda.com", "udacity.com", "edureka.co",
    // institutions
    "mit.edu", "harvard.edu", "stanford.edu", "berkeley.edu", "ox.ac.uk",
    "cambridge.org", "iitb.ac.in", "iitd.ac.in", "iisc.ac.in",
    // languages
    "duolingo.com", "babbel.com", "rosettastone.com", "memrise.com",
    "busuu.com", "lingoda.com", "italki.com",
    // design
    "figma.com", "canva.com", "adobe.com", "sketch.com", "invisionapp.com",
    "dribbble.com", "behance.net",
    // math and science
    "wolframalpha.com", "desmos.com", "geogebra.org", "mathway.com",
    "symbolab.com", "photomath.com",
    // reference
    "britannica.com", "dictionary.com", "merriam-webster.com", "thesaurus.com",
    "google.com", "duckduckgo.com",
];

const DISTRACTING_SITES: &[&str] = &[
    // social
    "instagram.com", "facebook.com", "snapchat.com", "telegram.org", "telegram.me",
    "twitter.com", "x.com", "reddit.com", "discord.com", "whatsapp.com",
    "web.whatsapp.com", "messenger.com", "signal.org",
    // streaming
    "netflix.com", "primevideo.com", "amazon.com/prime",
    "hotstar.com", "twitch.tv", "jiocinema.com", "sonyliv.com",
    "zee5.com", "voot.com", "altbalaji.com", "eros.com",
    "hulu.com", "disneyplus.com", "hbomax.com", "paramount.com",
    // games
    "steam.com", "epicgames.com", "miniclip.com", "coolmathgames.com",
    "roblox.com", "chess.com", "lichess.org", "pogo.com",
    "addictinggames.com", "kongregate.com", "newgrounds.com",
    "armor.games", "y8.com", "friv.com",
    // shopping
    "amazon.com", "amazon.in", "flipkart.com", "myntra.com",
    "nykaa.com", "aliexpress.com", "ebay.com", "etsy.com",
    "shopify.com", "zara.com", "h&m.com", "uniqlo.com",
    // forums
    "quora.com", "pinterest.com", "buzzfeed.com", "9gag.com",
    "driveandlisten.herokuapp.com", "imgur.com", "tumblr.com",
    "tiktok.com", "vine.co",
    // gossip
    "dailymail.co.uk", "tmz.com", "entertainment.com", "eonline.com",
    "peoplemagazine.com", "usmagazine.com", "cosmopolitan.com",
    // sports
    "espn.com", "cricbuzz.com", "cricinfo.com", "goal.com",
    "nba.com", "nfl.com", "fifa.com",
    // music
    "spotify.com", "apple.com/music", "soundcloud.com", "pandora.com",
    "last.fm", "bandcamp.com", "mixcloud.com",
    // memes
    "memebase.cheezburger.com", "knowyourmeme.com", "funnyjunk.com",
    "collegehumor.com", "theonion.com", "satirewire.com",
];

const BOOKMARK_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "learning",
        &[
            "khanacademy.org", "coursera.org", "edx.org", "udemy.com", "skillshare.com",
            "brilliant.org", "duolingo.com", "babbel.com", "memrise.com",
        ],
    ),
    (
        "research",
        &[
            "scholar.google.com", "jstor.org", "pubmed.ncbi.nlm.nih.gov", "researchgate.net",
            "arxiv.org", "wikipedia.org", "britannica.com",
        ],
    ),
    (
        "tools",
        &[
            "notion.so", "todoist.com", "trello.com", "figma.com", "canva.com",
            "grammarly.com", "quillbot.com", "otter.ai",
        ],
    ),
    (
        "documentation",
        &[
            "mdn.mozilla.org", "stackoverflow.com", "github.com", "developer.mozilla.org",
            "w3schools.com", "react.dev", "vuejs.org",
        ],
    ),
];

const UNTRACKED_SCHEMES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "moz-extension://",
];

// Containment is checked both ways, so a bare `google.com` host matches
// `scholar.google.com` too.
fn list_matches(list: &[&str], host: &str) -> bool {
    list.iter()
        .any(|site| host.contains(site) || site.contains(host))
}

pub fn classify_domain(host: &str) -> Category {
    let host = host.trim().to_lowercase();
    if host.is_empty() {
        return Category::Neutral;
    }
    if list_matches(PRODUCTIVE_SITES, &host) {
        Category::Productive
    } else if list_matches(DISTRACTING_SITES, &host) {
        Category::Distracting
    } else {
        Category::Neutral
    }
}

pub fn bookmark_category(domain: &str) -> &'static str {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return "learning";
    }
    BOOKMARK_CATEGORIES
        .iter()
        .find(|(_, sites)| list_matches(sites, &domain))
        .map(|(name, _)| *name)
        .unwrap_or("learning")
}

pub fn is_trackable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !UNTRACKED_SCHEMES.iter().any(|s| url.starts_with(s))
}

/// Lowercased host of `scheme://[user@]host[:port]/...`.
pub fn hostname(url: &str) -> Option<String> {
    let (_, rest) = url.trim().split_once("://")?;
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = if let Some(v6) = host_port.strip_prefix('[') {
        v6.split(']').next().unwrap_or("")
    } else {
        host_port.split(':').next().unwrap_or("")
    };
    let host = host.trim().to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Hostname without a leading `www.`, or `unknown`.
pub fn extract_domain(url: &str) -> String {
    match hostname(url) {
        Some(h) => h.strip_prefix("www.").map(str::to_string).unwrap_or(h),
        None => "unknown".to_string(),
    }
}

pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && hostname(&lower).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_productive_site_is_productive() {
        for site in PRODUCTIVE_SITES {
            assert_eq!(classify_domain(site), Category::Productive, "{site}");
        }
    }

    #[test]
    fn distracting_and_neutral_examples() {
        for site in ["instagram.com", "netflix.com", "reddit.com", "twitch.tv", "espn.com"] {
            assert_eq!(classify_domain(site), Category::Distracting, "{site}");
        }
        assert_eq!(classify_domain("m.facebook.com"), Category::Distracting);
        assert_eq!(classify_domain("example.org"), Category::Neutral);
        assert_eq!(classify_domain(""), Category::Neutral);
    }

    #[test]
    fn classification_is_case_insensitive_and_productive_first() {
        assert_eq!(classify_domain("GitHub.com"), Category::Productive);
        assert_eq!(classify_domain("Scholar.Google.com"), Category::Productive);
    }

    #[test]
    fn extract_domain_strips_www_port_and_path() {
        assert_eq!(extract_domain("https://www.khanacademy.org/math"), "khanacademy.org");
        assert_eq!(extract_domain("http://user@Example.com:8080/x?y#z"), "example.com");
        assert_eq!(extract_domain("http://[::1]:3000/"), "::1");
        assert_eq!(extract_domain("not a url"), "unknown");
    }

    #[test]
    fn browser_internal_pages_are_not_tracked() {
        assert!(!is_trackable_url("chrome://extensions"));
        assert!(!is_trackable_url("chrome-extension://abc/popup.html"));
        assert!(!is_trackable_url(""));
        assert!(is_trackable_url("https://github.com"));
    }

    #[test]
    fn bookmark_categories() {
        assert_eq!(bookmark_category("arxiv.org"), "research");
        assert_eq!(bookmark_category("github.com"), "documentation");
        assert_eq!(bookmark_category("notion.so"), "tools");
        assert_eq!(bookmark_category("leetcode.com"), "learning");
    }
}
