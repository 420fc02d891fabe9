use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Regex pattern for runs of whitespace collapsed by normalization
const WHITESPACE_PATTERN: &str = r"\s+";

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(WHITESPACE_PATTERN).unwrap());

/// How inbound text is compared against option keywords.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMode {
    /// trim, collapse inner whitespace, lowercase
    #[default]
    Normalized,
    /// byte-for-byte equality
    Exact,
}

impl MatchMode {
    pub fn normalize<'a>(
        &self,
        text: &'a str,
    ) -> Cow<'a, str> {
        match self {
            MatchMode::Exact => Cow::Borrowed(text),
            MatchMode::Normalized => Cow::Owned(WHITESPACE_RE.replace_all(text.trim(), " ").to_lowercase()),
        }
    }

    /// Empty keywords never match anything.
    pub fn matches(
        &self,
        keyword: &str,
        input: &str,
    ) -> bool {
        let keyword = self.normalize(keyword);
        !keyword.is_empty() && keyword == self.normalize(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_match() {
        let mode = MatchMode::Normalized;
        assert!(mode.matches("1", " 1 "));
        assert!(mode.matches("Talk to Agent", "talk   to\tagent\n"));
        assert!(mode.matches("ÜBER", "über"));
        assert!(!mode.matches("1", "11"));
        assert!(!mode.matches("yes", "yes please"));
    }

    #[test]
    fn test_exact_match() {
        let mode = MatchMode::Exact;
        assert!(mode.matches("Yes", "Yes"));
        assert!(!mode.matches("Yes", "yes"));
        assert!(!mode.matches("Yes", " Yes"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        assert!(!MatchMode::Normalized.matches("", ""));
        assert!(!MatchMode::Normalized.matches("  ", " "));
        assert!(!MatchMode::Exact.matches("", ""));
    }
}
