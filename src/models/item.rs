use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Category, ItemId};

/// Descriptive metadata derived by the vision provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemMetadata {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

/// Prefixes of tags generated from metadata rather than typed by the user
const DERIVED_TAG_PREFIXES: [&str; 3] = ["season:", "style:", "color:"];

impl ItemMetadata {
    /// Trims free text, lower-cases labels and drops blank or repeated colors
    pub fn normalize(&mut self) {
        self.summary = non_blank(self.summary.take().map(|s| s.trim().to_string()));
        self.season = non_blank(self.season.take().map(|s| normalize_word(&s)));
        self.style = non_blank(self.style.take().map(|s| normalize_word(&s)));
        self.colors = normalize_list(std::mem::take(&mut self.colors));
    }

    /// Searchable tags mirroring the metadata: `season:<x>`, `style:<x>` and
    /// one `color:<x>` per color
    pub fn derived_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(season) = self.season.as_deref().filter(|s| !s.is_empty()) {
            tags.push(format!("season:{}", season));
        }
        if let Some(style) = self.style.as_deref().filter(|s| !s.is_empty()) {
            tags.push(format!("style:{}", style));
        }
        tags.extend(
            self.colors
                .iter()
                .filter(|c| !c.is_empty())
                .map(|color| format!("color:{}", color)),
        );
        tags
    }
}

/// Whether a tag was generated by [`ItemMetadata::derived_tags`]
pub fn is_derived_tag(tag: &str) -> bool {
    let tag = tag.trim();
    DERIVED_TAG_PREFIXES
        .iter()
        .any(|prefix| tag.starts_with(prefix))
}

/// Output shape of the external vision provider for one image
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionDescription {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl VisionDescription {
    /// Splits the description into normalized metadata and its suggested tags
    pub fn into_parts(self) -> (ItemMetadata, Vec<String>) {
        let mut metadata = ItemMetadata {
            summary: Some(self.summary),
            season: Some(self.season),
            style: Some(self.style),
            colors: self.colors,
        };
        metadata.normalize();
        (metadata, normalize_list(self.tags))
    }
}

/// A clothing item in a user's inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub metadata: ItemMetadata,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to register a new item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub category: Category,
    pub tags: Vec<String>,
    pub metadata: ItemMetadata,
}

/// Criteria for listing a user's items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub category: Option<Category>,
    /// Every listed tag must be present on the item
    pub tags: Vec<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.category.map_or(true, |category| item.category == category)
            && self.tags.iter().all(|tag| item.tags.contains(tag))
    }
}

/// Parses a free-form tag list separated by commas or whitespace, dropping a
/// leading `#` and repeats
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|part| part.trim().trim_start_matches('#').trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Stored embedding for a single item
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub item_id: ItemId,
    pub model: String,
    pub dim: usize,
    /// Little-endian f32 components, `dim * 4` bytes
    pub vector: Vec<u8>,
}

/// An item joined with its current embedding, as loaded for ranking
#[derive(Debug, Clone)]
pub struct EmbeddedItem {
    pub item: Item,
    pub embedding: Embedding,
}

/// Merges user tags with provider tags, keeping first occurrence order
pub fn merge_tags(base: Vec<String>, extras: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    base.into_iter()
        .chain(extras)
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

fn normalize_word(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| normalize_word(v))
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
