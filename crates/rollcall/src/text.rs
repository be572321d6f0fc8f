//! Small text helpers shared by the services.

use std::sync::OnceLock;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Lowercase `s` and strip diacritics from Latin letters.
#[must_use]
pub fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

fn matcher() -> &'static SkimMatcherV2 {
    static MATCHER: OnceLock<SkimMatcherV2> = OnceLock::new();
    MATCHER.get_or_init(SkimMatcherV2::default)
}

/// Score how well `search` loosely matches `text`, ignoring case and
/// accents. Higher is better; `None` means no match.
///
/// An empty `text` or `search` never matches.
#[must_use]
pub fn fuzzy_score(text: &str, search: &str) -> Option<i64> {
    if text.is_empty() || search.is_empty() {
        return None;
    }
    let text = fold(text);
    let search = fold(search);
    matcher().fuzzy_match(&text, &search)
}

/// Whether every character of `search` appears in `text`, in order,
/// ignoring case and accents.
#[must_use]
pub fn fuzzy_match(text: &str, search: &str) -> bool {
    fuzzy_score(text, search).is_some()
}

/// Render a duration in minutes, e.g. `"45 min"` or `"2h 5min"`.
#[must_use]
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("João Conceição"), "joao conceicao");
        assert_eq!(fold("ÁRVORE"), "arvore");
    }

    #[test]
    fn test_fuzzy_match_subsequence() {
        assert!(fuzzy_match("João Silva", "jsilva"));
        assert!(fuzzy_match("João Silva", "JOAO"));
        assert!(fuzzy_match("Conceição", "conce"));
        assert!(!fuzzy_match("João Silva", "silvaj"));
    }

    #[test]
    fn test_fuzzy_score_prefers_tighter_match() {
        let tight = fuzzy_score("Ana Souza", "ana").unwrap();
        let loose = fuzzy_score("Adriana Nascimento", "ana").unwrap();
        assert!(tight > loose);
        assert_eq!(fuzzy_score("Bruno", "ana"), None);
    }

    #[test]
    fn test_fuzzy_match_empty() {
        assert!(!fuzzy_match("", "a"));
        assert!(!fuzzy_match("Ana", ""));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 min");
        assert_eq!(format_duration(59), "59 min");
        assert_eq!(format_duration(60), "1h 0min");
        assert_eq!(format_duration(125), "2h 5min");
    }
}
