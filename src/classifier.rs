//! Keyword-based category classification for expense descriptions.
//!
//! Categories are scanned in declaration order and, within a category,
//! keywords in declaration order; the first keyword found in the
//! (lowercased) description decides the label. Descriptions that match no
//! keyword fall back to [DEFAULT_CATEGORY].

use serde::{Deserialize, Serialize};

/// The label assigned when no keyword matches.
pub const DEFAULT_CATEGORY: &str = "Other";

/// How keywords are matched against a description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// A keyword matches anywhere inside the description, so "taxi" matches
    /// "taxidermist". This is the behaviour the ledger has always had and
    /// remains the default for compatibility.
    #[default]
    Substring,
    /// A keyword matches only when it is not embedded in a longer
    /// alphanumeric run, i.e. at word boundaries.
    WholeWord,
}

#[derive(Debug, Clone)]
struct CategoryRule {
    label: String,
    keywords: Vec<String>,
}

impl CategoryRule {
    fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        }
    }
}

/// Maps free-text descriptions to category labels by keyword lookup.
///
/// Pure and side-effect-free: the only inputs are the description and the
/// rule set fixed at construction time.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
    match_mode: MatchMode,
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(MatchMode::default())
    }
}

impl CategoryClassifier {
    /// Create a classifier with the built-in rule set and the given match
    /// mode.
    pub fn new(match_mode: MatchMode) -> Self {
        Self {
            rules: default_rules(),
            match_mode,
        }
    }

    /// Determine the category label for `description`.
    ///
    /// Empty or otherwise degenerate input simply matches nothing and
    /// yields [DEFAULT_CATEGORY].
    pub fn classify(&self, description: &str) -> &str {
        let description = description.to_lowercase();

        for rule in &self.rules {
            for keyword in &rule.keywords {
                let hit = match self.match_mode {
                    MatchMode::Substring => description.contains(keyword.as_str()),
                    MatchMode::WholeWord => contains_whole_word(&description, keyword),
                };

                if hit {
                    return &rule.label;
                }
            }
        }

        DEFAULT_CATEGORY
    }

    /// All known labels, in classification order, ending with the default
    /// label.
    pub fn labels(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|rule| rule.label.as_str())
            .chain(std::iter::once(DEFAULT_CATEGORY))
            .collect()
    }

    /// The keywords configured for `label`, or `None` for labels without
    /// keywords (including the default label).
    pub fn keywords(&self, label: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|rule| rule.label == label)
            .map(|rule| rule.keywords.as_slice())
    }

    /// Map a stored category label onto one of the known reporting buckets.
    ///
    /// Labels the classifier knows pass through unchanged; anything else
    /// (e.g. a custom label written by a manual edit) folds into
    /// [DEFAULT_CATEGORY].
    pub fn bucket<'a>(&'a self, label: &'a str) -> &'a str {
        if label == DEFAULT_CATEGORY || self.rules.iter().any(|rule| rule.label == label) {
            label
        } else {
            DEFAULT_CATEGORY
        }
    }
}

/// Whether `needle` occurs in `haystack` without being embedded in a longer
/// alphanumeric run on either side.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut search_from = 0;
    while let Some(position) = haystack[search_from..].find(needle) {
        let begin = search_from + position;
        let end = begin + needle.len();

        let clear_before = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |character| !character.is_alphanumeric());
        let clear_after = haystack[end..]
            .chars()
            .next()
            .map_or(true, |character| !character.is_alphanumeric());

        if clear_before && clear_after {
            return true;
        }

        search_from = end;
    }

    false
}

fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Food",
            &[
                "grocery",
                "groceries",
                "food",
                "supermarket",
                "market",
                "biedronka",
                "lidl",
                "kaufland",
                "zabka",
                "żabka",
                "auchan",
                "carrefour",
                "dino",
                "netto",
                "stokrotka",
                "sklep",
                "zakupy",
                "restaurant",
                "cafe",
                "coffee",
                "pizza",
                "sushi",
                "kebab",
                "mcdonald",
                "kfc",
                "glovo",
                "pyszne",
                "uber eats",
                "delivery",
                "bar",
                "pub",
            ],
        ),
        CategoryRule::new(
            "Transport",
            &[
                "taxi", "uber", "bolt", "bus", "tram", "metro", "train", "fuel", "petrol",
                "parking", "transport",
            ],
        ),
        CategoryRule::new(
            "Entertainment",
            &[
                "cinema",
                "movie",
                "theatre",
                "concert",
                "museum",
                "netflix",
                "spotify",
                "game",
                "party",
                "entertainment",
            ],
        ),
        CategoryRule::new(
            "Health",
            &[
                "pharmacy", "apteka", "doctor", "dentist", "hospital", "clinic", "medicine",
                "health",
            ],
        ),
        CategoryRule::new(
            "Home",
            &[
                "rent",
                "apartment",
                "utilities",
                "electricity",
                "internet",
                "furniture",
                "ikea",
                "castorama",
                "leroy",
                "repair",
                "home",
            ],
        ),
    ]
}

#[cfg(test)]
mod category_classifier_tests {
    use super::{CategoryClassifier, DEFAULT_CATEGORY, MatchMode};

    #[test]
    fn classify_matches_configured_keyword() {
        let classifier = CategoryClassifier::default();

        assert_eq!(classifier.classify("bought biedronka groceries"), "Food");
        assert_eq!(classifier.classify("taxi to the airport"), "Transport");
        assert_eq!(classifier.classify("APTEKA painkillers"), "Health");
    }

    #[test]
    fn classify_returns_default_for_unknown_description() {
        let classifier = CategoryClassifier::default();

        assert_eq!(classifier.classify("xyz"), DEFAULT_CATEGORY);
    }

    #[test]
    fn classify_returns_default_for_empty_description() {
        let classifier = CategoryClassifier::default();

        assert_eq!(classifier.classify(""), DEFAULT_CATEGORY);
        assert_eq!(classifier.classify("   "), DEFAULT_CATEGORY);
    }

    #[test]
    fn classify_prefers_earlier_category_on_multiple_matches() {
        let classifier = CategoryClassifier::default();

        // "uber eats" is a Food keyword and Food is declared before
        // Transport, so it must win over Transport's "uber".
        assert_eq!(classifier.classify("uber eats order"), "Food");
        // Both "taxi" (Transport) and "home" (Home) occur; Transport is
        // declared first.
        assert_eq!(classifier.classify("taxi home"), "Transport");
    }

    #[test]
    fn substring_mode_matches_embedded_keywords() {
        let classifier = CategoryClassifier::new(MatchMode::Substring);

        assert_eq!(classifier.classify("visited the taxidermist"), "Transport");
    }

    #[test]
    fn whole_word_mode_ignores_embedded_keywords() {
        let classifier = CategoryClassifier::new(MatchMode::WholeWord);

        assert_eq!(classifier.classify("visited the taxidermist"), DEFAULT_CATEGORY);
        assert_eq!(classifier.classify("took a taxi downtown"), "Transport");
    }

    #[test]
    fn whole_word_mode_matches_multi_word_keywords() {
        let classifier = CategoryClassifier::new(MatchMode::WholeWord);

        assert_eq!(classifier.classify("uber eats dinner"), "Food");
    }

    #[test]
    fn labels_include_default_last() {
        let classifier = CategoryClassifier::default();
        let labels = classifier.labels();

        assert_eq!(labels.first(), Some(&"Food"));
        assert_eq!(labels.last(), Some(&DEFAULT_CATEGORY));
    }

    #[test]
    fn keywords_exposes_rule_set() {
        let classifier = CategoryClassifier::default();

        let keywords = classifier.keywords("Food").unwrap();
        assert!(keywords.iter().any(|keyword| keyword == "biedronka"));

        assert!(classifier.keywords(DEFAULT_CATEGORY).is_none());
        assert!(classifier.keywords("Nonsense").is_none());
    }

    #[test]
    fn bucket_folds_unknown_labels_into_default() {
        let classifier = CategoryClassifier::default();

        assert_eq!(classifier.bucket("Food"), "Food");
        assert_eq!(classifier.bucket(DEFAULT_CATEGORY), DEFAULT_CATEGORY);
        assert_eq!(classifier.bucket("Souvenirs"), DEFAULT_CATEGORY);
    }
}
