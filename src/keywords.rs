//! Matching of metadata keywords against the DFDD feature-concept register.

use std::path::Path;
use std::sync::{Arc, OnceLock};

const DFDD_KEYWORDS: &str = include_str!("../resources/dfdd.keywords");

static PACKAGED_KEYWORDS: OnceLock<Arc<[String]>> = OnceLock::new();

/// Checks keyword lists against a controlled vocabulary
pub trait KeywordMatcher {
    /// `true` if at least one of `keywords` is in the vocabulary. Matching is
    /// exact and case-sensitive; an empty list never matches.
    fn contains_at_least_one_keyword(&self, keywords: &[&str]) -> bool;
}

/// Keyword matcher backed by a line-delimited register
#[derive(Debug, Clone)]
pub struct DfddKeywordMatcher {
    keywords: Arc<[String]>,
}

impl DfddKeywordMatcher {
    /// Matcher over the packaged register, parsed once per process.
    pub fn new() -> Self {
        let keywords = PACKAGED_KEYWORDS.get_or_init(|| parse_keywords(DFDD_KEYWORDS).into());
        Self {
            keywords: Arc::clone(keywords),
        }
    }

    /// Matcher over a register file. An unreadable file gives an empty register.
    pub fn from_file(path: &Path) -> Self {
        let keywords = match std::fs::read_to_string(path) {
            Ok(text) => parse_keywords(&text),
            Err(e) => {
                log::warn!("Keywords file {} could not be read: {}", path.display(), e);
                Vec::new()
            }
        };
        Self {
            keywords: keywords.into(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for DfddKeywordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordMatcher for DfddKeywordMatcher {
    fn contains_at_least_one_keyword(&self, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .any(|candidate| self.keywords.iter().any(|k| k == candidate))
    }
}

fn parse_keywords(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
