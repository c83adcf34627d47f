use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Matches pull-request URLs on any host, case-insensitively
static PULL_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https://[^/\s]+/([^/\s]+)/([^/\s]+)/pull/(\d+)")
        .expect("pull URL pattern is valid")
});

/// Repository identity on the code host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Locator for a single review unit: repository plus number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullLocator {
    pub repo: RepoId,
    pub number: u64,
}

impl PullLocator {
    /// Parse the first pull-request URL in `text`, if any
    pub fn parse(text: &str) -> Option<Self> {
        extract_pull_locators(text).into_iter().next()
    }
}

impl fmt::Display for PullLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

/// Extract every pull-request locator embedded in free text
///
/// Numbers too large for u64 are skipped rather than treated as an error.
pub fn extract_pull_locators(text: &str) -> Vec<PullLocator> {
    PULL_URL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let number = caps.get(3)?.as_str().parse::<u64>().ok()?;
            Some(PullLocator {
                repo: RepoId::new(caps.get(1)?.as_str(), caps.get(2)?.as_str()),
                number,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_url() {
        let loc = PullLocator::parse("https://github.com/acme/widgets/pull/412").unwrap();
        assert_eq!(loc.repo, RepoId::new("acme", "widgets"));
        assert_eq!(loc.number, 412);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let loc = PullLocator::parse("HTTPS://GitHub.com/Acme/Widgets/PULL/7").unwrap();
        assert_eq!(loc.number, 7);
    }

    #[test]
    fn test_extract_from_surrounding_text() {
        let text = "fixed in https://git.example.io/team/repo/pull/3 and \
                    https://github.com/team/other/pull/44, see notes";
        let locators = extract_pull_locators(text);
        assert_eq!(locators.len(), 2);
        assert_eq!(locators[0].repo.owner, "team");
        assert_eq!(locators[1].number, 44);
    }

    #[test]
    fn test_non_pull_urls_ignored() {
        assert!(extract_pull_locators("https://github.com/acme/widgets/issues/5").is_empty());
        assert!(extract_pull_locators("no links here").is_empty());
    }

    #[test]
    fn test_overflowing_number_skipped() {
        let text = "https://github.com/a/b/pull/99999999999999999999999999";
        assert!(extract_pull_locators(text).is_empty());
    }
}
