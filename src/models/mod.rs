use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod item;
pub mod recommendation;

pub use item::{
    is_derived_tag, merge_tags, parse_tag_list, EmbeddedItem, Embedding, Item, ItemFilter,
    ItemMetadata, NewItem, VisionDescription,
};
pub use recommendation::{
    ExclusionToken, LockSelections, RankedCandidate, Recommendation, RecommendationQuery,
    RecommendationResult,
};

/// Identifier of an inventory item
pub type ItemId = i64;

/// Clothing category partitioning a user's inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Shoes,
    Accessory,
}

impl Category {
    /// Presentation order of a recommended outfit
    pub const ORDER: [Category; 4] = [
        Category::Top,
        Category::Bottom,
        Category::Shoes,
        Category::Accessory,
    ];

    /// Categories an outfit should never be missing when any candidate exists
    pub const REQUIRED: [Category; 2] = [Category::Top, Category::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Shoes => "shoes",
            Category::Accessory => "accessory",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Category::Top),
            "bottom" => Ok(Category::Bottom),
            "shoes" => Ok(Category::Shoes),
            "accessory" => Ok(Category::Accessory),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}
