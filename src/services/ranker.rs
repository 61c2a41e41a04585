use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::{
    models::{Category, EmbeddedItem, ItemMetadata, RankedCandidate},
    services::{preference::Preference, vector_codec},
};

/// Bonus for an item whose season matches a preferred season
pub const SEASON_BOOST: f64 = 0.15;
/// Bonus for an item whose style matches a preferred style
pub const STYLE_BOOST: f64 = 0.10;

/// Cosine of the angle between two vectors, 0 when either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Additive bonus for metadata agreeing with the inferred preference
///
/// Missing metadata or an empty side of the preference contributes nothing.
pub fn metadata_boost(metadata: &ItemMetadata, preference: &Preference) -> f64 {
    let mut boost = 0.0;
    if let Some(season) = &metadata.season {
        if !preference.seasons.is_empty() && preference.season_matches(season) {
            boost += SEASON_BOOST;
        }
    }
    if let Some(style) = &metadata.style {
        if !preference.styles.is_empty() && preference.style_matches(style) {
            boost += STYLE_BOOST;
        }
    }
    boost
}

/// Scores a candidate, or `None` when its stored vector is unusable against
/// `query` (undecodable, empty, inconsistent with its recorded dimension, or of a
/// different dimension than the query)
pub fn score(query: &[f32], candidate: &EmbeddedItem, preference: &Preference) -> Option<f64> {
    let vector = vector_codec::decode(&candidate.embedding.vector)?;
    if vector.is_empty() || vector.len() != query.len() || vector.len() != candidate.embedding.dim
    {
        return None;
    }
    Some(cosine_similarity(query, &vector) + metadata_boost(&candidate.item.metadata, preference))
}

/// Per-category ranking of a candidate pool
#[derive(Debug, Clone, Default)]
pub struct RankedPool {
    ranked: BTreeMap<Category, Vec<RankedCandidate>>,
    eligible: BTreeMap<Category, usize>,
}

impl RankedPool {
    /// Best candidates of a category, highest score first
    pub fn candidates(&self, category: Category) -> &[RankedCandidate] {
        self.ranked
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn top(&self, category: Category) -> Option<&RankedCandidate> {
        self.candidates(category).first()
    }

    /// Number of scoreable candidates of a category before truncation
    pub fn eligible(&self, category: Category) -> usize {
        self.eligible.get(&category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Copies the ranking of each listed category missing here from `other`
    pub fn fill_missing(&mut self, other: &RankedPool, categories: &[Category]) -> Vec<Category> {
        let mut filled = Vec::new();
        for category in categories {
            if self.top(*category).is_some() || other.top(*category).is_none() {
                continue;
            }
            self.ranked
                .insert(*category, other.candidates(*category).to_vec());
            self.eligible.insert(*category, other.eligible(*category));
            filled.push(*category);
        }
        filled
    }
}

/// Ranks candidates per category by descending score, keeping the `top_k` best
///
/// Equal scores keep their input order. Unscoreable candidates are left out.
pub fn rank_by_category(
    query: &[f32],
    candidates: &[EmbeddedItem],
    preference: &Preference,
    top_k: usize,
) -> RankedPool {
    let mut pool = RankedPool::default();

    for candidate in candidates {
        let Some(score) = score(query, candidate, preference) else {
            tracing::debug!(
                item_id = candidate.item.id,
                dim = candidate.embedding.dim,
                query_dim = query.len(),
                "Skipping candidate with unusable embedding"
            );
            continue;
        };
        let category = candidate.item.category;
        pool.ranked.entry(category).or_default().push(RankedCandidate {
            item_id: candidate.item.id,
            category,
            score,
        });
        *pool.eligible.entry(category).or_default() += 1;
    }

    let top_k = top_k.max(1);
    for list in pool.ranked.values_mut() {
        list.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        list.truncate(top_k);
    }

    pool
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Embedding, Item, ItemId};
    use chrono::Utc;

    pub(crate) fn embedded(
        id: ItemId,
        category: Category,
        vector: &[f32],
        season: Option<&str>,
        style: Option<&str>,
    ) -> EmbeddedItem {
        EmbeddedItem {
            item: Item {
                id,
                owner_id: "owner".to_string(),
                category,
                tags: vec![],
                metadata: ItemMetadata {
                    summary: None,
                    season: season.map(str::to_string),
                    style: style.map(str::to_string),
                    colors: vec![],
                },
                updated_at: Utc::now(),
            },
            embedding: Embedding {
                item_id: id,
                model: "test-model".to_string(),
                dim: vector.len(),
                vector: vector_codec::encode(vector),
            },
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let a = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_bounds() {
        let pairs: Vec<(Vec<f32>, Vec<f32>)> = vec![
            (vec![1.0, 0.0], vec![-1.0, 0.0]),
            (vec![1.0, 2.0, 3.0], vec![-4.0, 0.5, 2.0]),
            (vec![1e-3, 5.0], vec![7.0, -1e3]),
        ];
        for (a, b) in pairs {
            let similarity = cosine_similarity(&a, &b);
            assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&similarity));
        }
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_metadata_boost_is_additive() {
        let preference = Preference::new(["summer"], ["casual"]);
        let both = embedded(1, Category::Top, &[1.0], Some("summer"), Some("casual"));
        let season_only = embedded(2, Category::Top, &[1.0], Some("summer"), Some("formal"));
        let none = embedded(3, Category::Top, &[1.0], None, None);

        assert!((metadata_boost(&both.item.metadata, &preference) - 0.25).abs() < 1e-9);
        assert!((metadata_boost(&season_only.item.metadata, &preference) - 0.15).abs() < 1e-9);
        assert_eq!(metadata_boost(&none.item.metadata, &preference), 0.0);
    }

    #[test]
    fn test_metadata_boost_requires_a_preference() {
        let candidate = embedded(1, Category::Top, &[1.0], Some("summer"), Some("casual"));
        assert_eq!(
            metadata_boost(&candidate.item.metadata, &Preference::default()),
            0.0
        );
    }

    #[test]
    fn test_score_skips_dimension_mismatch() {
        let query = [1.0, 0.0, 0.0];
        let short = embedded(1, Category::Top, &[1.0, 0.0], None, None);
        let empty = embedded(2, Category::Top, &[], None, None);
        let mut broken = embedded(3, Category::Top, &[1.0, 0.0, 0.0], None, None);
        broken.embedding.vector.pop();

        assert_eq!(score(&query, &short, &Preference::default()), None);
        assert_eq!(score(&query, &empty, &Preference::default()), None);
        assert_eq!(score(&query, &broken, &Preference::default()), None);
    }

    #[test]
    fn test_rank_excludes_mismatched_dimensions_regardless_of_score() {
        let query = [1.0, 0.0];
        let candidates = vec![
            embedded(1, Category::Top, &[0.0, 1.0], None, None),
            embedded(2, Category::Top, &[1.0, 0.0, 0.0], Some("summer"), Some("casual")),
        ];
        let preference = Preference::new(["summer"], ["casual"]);
        let pool = rank_by_category(&query, &candidates, &preference, 5);

        let ids: Vec<_> = pool.candidates(Category::Top).iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(pool.eligible(Category::Top), 1);
    }

    #[test]
    fn test_rank_orders_by_score_and_truncates() {
        let query = [1.0, 0.0];
        let candidates = vec![
            embedded(1, Category::Top, &[0.0, 1.0], None, None),
            embedded(2, Category::Top, &[1.0, 0.0], None, None),
            embedded(3, Category::Top, &[1.0, 1.0], None, None),
            embedded(4, Category::Shoes, &[1.0, 0.0], None, None),
        ];
        let pool = rank_by_category(&query, &candidates, &Preference::default(), 2);

        let tops: Vec<_> = pool.candidates(Category::Top).iter().map(|c| c.item_id).collect();
        assert_eq!(tops, vec![2, 3]);
        assert_eq!(pool.eligible(Category::Top), 3);
        assert_eq!(pool.top(Category::Shoes).map(|c| c.item_id), Some(4));
        assert!(pool.top(Category::Bottom).is_none());
    }

    #[test]
    fn test_rank_is_stable_under_ties() {
        let query = [1.0, 1.0];
        let candidates = vec![
            embedded(7, Category::Bottom, &[1.0, 1.0], None, None),
            embedded(3, Category::Bottom, &[1.0, 1.0], None, None),
            embedded(5, Category::Bottom, &[1.0, 1.0], None, None),
        ];
        let pool = rank_by_category(&query, &candidates, &Preference::default(), 3);
        let ids: Vec<_> = pool.candidates(Category::Bottom).iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_boost_can_overtake_similarity() {
        let query = [1.0, 0.0];
        let candidates = vec![
            embedded(1, Category::Top, &[1.0, 0.1], None, None),
            embedded(2, Category::Top, &[1.0, 0.3], Some("summer"), None),
        ];
        let preference = Preference::new(["summer"], Vec::<&str>::new());
        let pool = rank_by_category(&query, &candidates, &preference, 1);
        assert_eq!(pool.top(Category::Top).map(|c| c.item_id), Some(2));
    }

    #[test]
    fn test_fill_missing_only_listed_empty_categories() {
        let query = [1.0];
        let filtered = rank_by_category(
            &query,
            &[embedded(1, Category::Top, &[1.0], None, None)],
            &Preference::default(),
            1,
        );
        let full = rank_by_category(
            &query,
            &[
                embedded(1, Category::Top, &[1.0], None, None),
                embedded(2, Category::Bottom, &[1.0], None, None),
                embedded(3, Category::Shoes, &[1.0], None, None),
            ],
            &Preference::default(),
            1,
        );

        let mut pool = filtered;
        let filled = pool.fill_missing(&full, &Category::REQUIRED);
        assert_eq!(filled, vec![Category::Bottom]);
        assert_eq!(pool.top(Category::Bottom).map(|c| c.item_id), Some(2));
        assert!(pool.top(Category::Shoes).is_none());
    }
}
