use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::WardrobeStore,
    error::{AppError, AppResult},
    models::{
        Category, EmbeddedItem, ExclusionToken, Item, ItemId, LockSelections, Recommendation,
        RecommendationQuery, RecommendationResult,
    },
    services::{
        preference::{Preference, PreferenceExtractor},
        providers::{EmbeddingProvider, TaskType},
        ranker::{self, RankedPool},
    },
};

/// Candidates kept per category. Only the best one is returned, and
/// `has_more` is derived from eligibility counts, not from this depth.
const RANKING_DEPTH: usize = 1;

/// Builds outfit recommendations for one owner at a time
///
/// Holds no per-request state: every call loads a fresh snapshot of the
/// owner's embedded items and scores it in memory.
pub struct Recommender {
    store: Arc<dyn WardrobeStore>,
    provider: Arc<dyn EmbeddingProvider>,
    extractor: PreferenceExtractor,
    query_timeout: Duration,
}

impl Recommender {
    pub fn new(
        store: Arc<dyn WardrobeStore>,
        provider: Arc<dyn EmbeddingProvider>,
        extractor: PreferenceExtractor,
        query_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            extractor,
            query_timeout,
        }
    }

    /// Picks one item per category for the given conditions
    ///
    /// Excluded ids never come back, locked categories always return their
    /// pinned item, and the returned token lists the ids chosen this time.
    #[tracing::instrument(skip_all, fields(owner_id = %owner_id))]
    pub async fn recommend(
        &self,
        owner_id: &str,
        query: &RecommendationQuery,
    ) -> AppResult<RecommendationResult> {
        let text = format!("{} {}", query.weather, query.style).trim().to_string();
        if text.is_empty() {
            return Err(AppError::InvalidInput("conditions required".to_string()));
        }

        let excluded = query
            .exclude_token
            .as_deref()
            .map(ExclusionToken::parse)
            .unwrap_or_default();
        let locks = LockSelections::from_raw(&query.locks);
        let preference = self
            .extractor
            .derive_preference(&query.weather, &query.style);

        tracing::debug!(
            owner_id,
            seasons = ?preference.seasons,
            styles = ?preference.styles,
            excluded = excluded.len(),
            "Derived recommendation preference"
        );

        let query_vector = self.embed_query(&text).await?;

        let embedded = self.store.list_embedded_items(owner_id).await?;
        if embedded.is_empty() {
            return Err(AppError::NoData(
                "no items available to recommend from".to_string(),
            ));
        }

        let locked = self.resolve_locks(owner_id, &locks).await?;
        let locked_ids: BTreeSet<ItemId> = locked.values().map(|item| item.id).collect();

        let pool: Vec<EmbeddedItem> = embedded
            .into_iter()
            .filter(|candidate| {
                !excluded.contains(candidate.item.id) && !locked_ids.contains(&candidate.item.id)
            })
            .collect();

        let ranked = self.rank(&query_vector, &pool, &preference);
        let items: HashMap<ItemId, &Item> = pool
            .iter()
            .map(|candidate| (candidate.item.id, &candidate.item))
            .collect();

        let mut recommendations = Vec::new();
        let mut has_more = false;
        for category in Category::ORDER {
            if let Some(item) = locked.get(&category) {
                recommendations.push(Recommendation {
                    category,
                    item: item.clone(),
                    score: None,
                    locked: true,
                });
                continue;
            }

            let returned = match ranked
                .top(category)
                .and_then(|top| items.get(&top.item_id).map(|item| (top, *item)))
            {
                Some((top, item)) => {
                    recommendations.push(Recommendation {
                        category,
                        item: item.clone(),
                        score: Some(top.score),
                        locked: false,
                    });
                    1
                }
                None => 0,
            };
            if ranked.eligible(category) > returned {
                has_more = true;
            }
        }

        if recommendations.is_empty() {
            return Err(AppError::NoData(
                "no matching recommendation found".to_string(),
            ));
        }

        let exclude_token =
            ExclusionToken::from_ids(recommendations.iter().map(|r| r.item.id));

        tracing::info!(
            owner_id,
            returned = recommendations.len(),
            locked = locked.len(),
            has_more,
            "Recommendation assembled"
        );

        Ok(RecommendationResult {
            recommendations,
            exclude_token,
            has_more,
        })
    }

    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let vector = tokio::time::timeout(
            self.query_timeout,
            self.provider.embed(text, TaskType::Query),
        )
        .await
        .map_err(|_| {
            AppError::Provider(format!(
                "Query embedding timed out after {:?}",
                self.query_timeout
            ))
        })??;

        if vector.is_empty() {
            return Err(AppError::Provider(
                "Query embedding response was empty".to_string(),
            ));
        }
        Ok(vector)
    }

    /// Loads pinned items. Locks naming an unknown item, another owner's item or
    /// an item of a different category are dropped and that category is ranked.
    async fn resolve_locks(
        &self,
        owner_id: &str,
        locks: &LockSelections,
    ) -> AppResult<BTreeMap<Category, Item>> {
        let mut resolved = BTreeMap::new();
        for (category, item_id) in locks.iter() {
            match self.store.get_item(owner_id, item_id).await? {
                Some(item) if item.category == category => {
                    resolved.insert(category, item);
                }
                Some(item) => tracing::warn!(
                    owner_id,
                    item_id,
                    lock = %category,
                    actual = %item.category,
                    "Ignoring lock on item of another category"
                ),
                None => tracing::warn!(owner_id, item_id, lock = %category, "Ignoring lock on unknown item"),
            }
        }
        Ok(resolved)
    }

    fn rank(&self, query: &[f32], pool: &[EmbeddedItem], preference: &Preference) -> RankedPool {
        let Some(filtered) = filter_by_preference(pool, preference) else {
            return ranker::rank_by_category(query, pool, preference, RANKING_DEPTH);
        };

        let mut ranked = ranker::rank_by_category(query, &filtered, preference, RANKING_DEPTH);
        if Category::REQUIRED
            .iter()
            .any(|category| ranked.top(*category).is_none())
        {
            let unfiltered = ranker::rank_by_category(query, pool, preference, RANKING_DEPTH);
            let filled = ranked.fill_missing(&unfiltered, &Category::REQUIRED);
            if !filled.is_empty() {
                tracing::debug!(?filled, "Filled required categories from the unfiltered pool");
            }
        }
        ranked
    }
}

/// Candidates agreeing with the preference, or `None` when the whole pool should
/// be ranked instead: either nothing was inferred or nothing matched.
///
/// Missing metadata never disqualifies a candidate.
pub fn filter_by_preference(
    pool: &[EmbeddedItem],
    preference: &Preference,
) -> Option<Vec<EmbeddedItem>> {
    if preference.is_empty() {
        return None;
    }

    let filtered: Vec<EmbeddedItem> = pool
        .iter()
        .filter(|candidate| matches_preference(candidate, preference))
        .cloned()
        .collect();

    if filtered.is_empty() {
        tracing::info!(
            pool = pool.len(),
            "No candidate matched the inferred preference, ranking the full pool"
        );
        return None;
    }
    Some(filtered)
}

fn matches_preference(candidate: &EmbeddedItem, preference: &Preference) -> bool {
    let metadata = &candidate.item.metadata;
    let season_ok = metadata
        .season
        .as_deref()
        .map_or(true, |season| preference.season_matches(season));
    let style_ok = metadata
        .style
        .as_deref()
        .map_or(true, |style| preference.style_matches(style));
    season_ok && style_ok
}
