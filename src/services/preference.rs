//! Season and style preference extraction from free text.
//!
//! Dictionaries map a canonical label to its surface keywords in any language.
//! They are plain data: the built-in tables can be replaced with a JSON file at
//! startup without touching code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Characters separating tokens in stored metadata values
const TOKEN_SEPARATORS: [char; 5] = [',', '/', ' ', '|', '\n'];

/// A canonical label and the keywords that signal it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Ordered dictionary of labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<KeywordEntry>", into = "Vec<KeywordEntry>")]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
}

impl From<Vec<KeywordEntry>> for KeywordTable {
    fn from(entries: Vec<KeywordEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| KeywordEntry {
                label: entry.label.trim().to_lowercase(),
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .filter(|entry| !entry.label.is_empty())
            .collect();
        Self { entries }
    }
}

impl From<KeywordTable> for Vec<KeywordEntry> {
    fn from(table: KeywordTable) -> Self {
        table.entries
    }
}

impl KeywordTable {
    fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        pairs
            .iter()
            .map(|(label, keywords)| KeywordEntry {
                label: label.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// Labels whose keywords occur anywhere in `text`, case-insensitively
    pub fn detect(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|entry| entry.label.clone())
            .collect()
    }

    /// Every token accepted as a match for `labels`: the labels and their keywords
    fn terms_for(&self, labels: &BTreeSet<String>) -> BTreeSet<String> {
        let mut terms = labels.clone();
        for entry in self.entries.iter().filter(|e| labels.contains(&e.label)) {
            terms.extend(entry.keywords.iter().cloned());
        }
        terms
    }
}

/// Season and style dictionaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDictionaries {
    pub seasons: KeywordTable,
    pub styles: KeywordTable,
}

impl Default for PreferenceDictionaries {
    fn default() -> Self {
        Self {
            seasons: KeywordTable::from_pairs(&[
                ("spring", &["봄", "spring"]),
                ("summer", &["여름", "summer"]),
                ("autumn", &["가을", "autumn", "fall"]),
                ("winter", &["겨울", "winter"]),
            ]),
            styles: KeywordTable::from_pairs(&[
                ("casual", &["캐주얼", "casual"]),
                ("formal", &["포멀", "정장", "formal"]),
                ("street", &["스트릿", "street"]),
                ("sporty", &["스포츠", "athleisure", "운동"]),
                ("minimal", &["미니멀", "minimal"]),
                ("romantic", &["로맨틱", "페미닌", "feminine", "romantic"]),
                ("business", &["비즈니스", "오피스", "office"]),
            ]),
        }
    }
}

impl PreferenceDictionaries {
    /// Loads dictionaries from a JSON file shaped like
    /// `{"seasons": [{"label": "...", "keywords": [...]}], "styles": [...]}`
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let dictionaries = serde_json::from_str(&raw)?;
        Ok(dictionaries)
    }
}

/// Seasons and styles inferred from a request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preference {
    pub seasons: BTreeSet<String>,
    pub styles: BTreeSet<String>,
    season_terms: BTreeSet<String>,
    style_terms: BTreeSet<String>,
}

impl Preference {
    /// Preference matching the labels literally, without keyword variants
    pub fn new<S: Into<String>>(
        seasons: impl IntoIterator<Item = S>,
        styles: impl IntoIterator<Item = S>,
    ) -> Self {
        let seasons: BTreeSet<String> = seasons.into_iter().map(Into::into).collect();
        let styles: BTreeSet<String> = styles.into_iter().map(Into::into).collect();
        Self {
            season_terms: seasons.clone(),
            style_terms: styles.clone(),
            seasons,
            styles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty() && self.styles.is_empty()
    }

    /// Whether a stored season value names a preferred season.
    /// Always true when no season was inferred.
    pub fn season_matches(&self, value: &str) -> bool {
        contains_any(value, &self.season_terms)
    }

    /// Whether a stored style value names a preferred style.
    /// Always true when no style was inferred.
    pub fn style_matches(&self, value: &str) -> bool {
        contains_any(value, &self.style_terms)
    }
}

/// Derives preferences from request text using injected dictionaries
#[derive(Debug, Clone, Default)]
pub struct PreferenceExtractor {
    dictionaries: PreferenceDictionaries,
}

impl PreferenceExtractor {
    pub fn new(dictionaries: PreferenceDictionaries) -> Self {
        Self { dictionaries }
    }

    pub fn detect_seasons(&self, text: &str) -> BTreeSet<String> {
        self.dictionaries.seasons.detect(text)
    }

    pub fn detect_styles(&self, text: &str) -> BTreeSet<String> {
        self.dictionaries.styles.detect(text)
    }

    /// Unions the labels detected in both inputs
    pub fn derive_preference(&self, weather: &str, style: &str) -> Preference {
        let mut seasons = self.detect_seasons(weather);
        seasons.extend(self.detect_seasons(style));
        let mut styles = self.detect_styles(weather);
        styles.extend(self.detect_styles(style));

        Preference {
            season_terms: self.dictionaries.seasons.terms_for(&seasons),
            style_terms: self.dictionaries.styles.terms_for(&styles),
            seasons,
            styles,
        }
    }
}

/// Whether any token of `value` is one of `labels`
///
/// An empty label set never disqualifies, so this returns true.
pub fn contains_any(value: &str, labels: &BTreeSet<String>) -> bool {
    if labels.is_empty() {
        return true;
    }
    split_tokens(value)
        .iter()
        .any(|token| labels.contains(token))
}

fn split_tokens(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split(|c: char| TOKEN_SEPARATORS.contains(&c))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
