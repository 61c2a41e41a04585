use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use super::{Category, Item, ItemId};

/// Raw recommendation request as sent by the client
///
/// `exclude_token` and `locks` are parsed tolerantly: anything malformed is
/// dropped instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub style: String,
    #[serde(default, deserialize_with = "lenient_token")]
    pub exclude_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_locks")]
    pub locks: HashMap<String, Value>,
}

/// Accepts a string or a bare number; any other shape means no token
fn lenient_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(token) => Some(token),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

/// Accepts an object; any other shape means no locks
fn lenient_locks<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(locks) => locks.into_iter().collect(),
        _ => HashMap::new(),
    })
}

/// Opaque set of item ids already shown to the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionToken(BTreeSet<ItemId>);

impl ExclusionToken {
    /// Parses a comma separated id list, skipping blank, non-numeric and
    /// non-positive entries
    pub fn parse(raw: &str) -> Self {
        let ids = raw
            .split(',')
            .filter_map(|part| part.trim().parse::<ItemId>().ok())
            .filter(|id| *id > 0)
            .collect();
        Self(ids)
    }

    pub fn from_ids<I: IntoIterator<Item = ItemId>>(ids: I) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Display for ExclusionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Client pinned items, at most one per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSelections(BTreeMap<Category, ItemId>);

impl LockSelections {
    /// Builds locks from the raw request map. Unknown categories and ids that are
    /// not positive integers (as a number or a numeric string) are dropped.
    pub fn from_raw(raw: &HashMap<String, Value>) -> Self {
        let mut locks = BTreeMap::new();
        for (key, value) in raw {
            let Ok(category) = key.parse::<Category>() else {
                continue;
            };
            let id = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<ItemId>().ok(),
                _ => None,
            };
            if let Some(id) = id.filter(|id| *id > 0) {
                locks.insert(category, id);
            }
        }
        Self(locks)
    }

    pub fn new(locks: BTreeMap<Category, ItemId>) -> Self {
        Self(locks)
    }

    pub fn get(&self, category: Category) -> Option<ItemId> {
        self.0.get(&category).copied()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, ItemId)> + '_ {
        self.0.iter().map(|(category, id)| (*category, *id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A scored candidate produced by the ranker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub item_id: ItemId,
    pub category: Category,
    pub score: f64,
}

/// The item chosen for one category of the outfit
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub category: Category,
    pub item: Item,
    /// Absent for locked selections, which bypass scoring
    pub score: Option<f64>,
    pub locked: bool,
}

impl Recommendation {
    /// Short human readable note shown next to the item
    pub fn note(&self) -> String {
        if self.locked {
            return "locked selection".to_string();
        }
        match &self.item.metadata.summary {
            Some(summary) => summary.clone(),
            None => self.item.tags.join(", "),
        }
    }
}

/// Outcome of a single recommendation request
#[derive(Debug, Clone)]
pub struct RecommendationResult {
    /// Ordered by `Category::ORDER`
    pub recommendations: Vec<Recommendation>,
    pub exclude_token: ExclusionToken,
    pub has_more: bool,
}
