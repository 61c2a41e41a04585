use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::WardrobeStore,
    error::{AppError, AppResult},
    models::{Category, EmbeddedItem, Embedding, Item, ItemFilter, ItemId, ItemMetadata, NewItem},
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const ITEM_COLUMNS: &str = "i.id, i.user_uid, i.kind, i.tags, i.meta_summary, i.meta_season, \
                            i.meta_style, i.meta_colors, i.updated_at";

/// PostgreSQL backed wardrobe store
///
/// Expects two tables:
/// - `closet_items(id BIGSERIAL PRIMARY KEY, user_uid TEXT, kind TEXT, tags TEXT[],
///   meta_summary TEXT, meta_season TEXT, meta_style TEXT, meta_colors TEXT[],
///   updated_at TIMESTAMPTZ)`
/// - `closet_item_embeddings(item_id BIGINT PRIMARY KEY REFERENCES closet_items,
///   model TEXT, dim INTEGER, vec_f32 BYTEA, updated_at TIMESTAMPTZ)`
#[derive(Clone)]
pub struct PgWardrobeStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    user_uid: String,
    kind: String,
    tags: Vec<String>,
    meta_summary: Option<String>,
    meta_season: Option<String>,
    meta_style: Option<String>,
    meta_colors: Vec<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct EmbeddedItemRow {
    #[sqlx(flatten)]
    item: ItemRow,
    model: String,
    dim: i32,
    vec_f32: Vec<u8>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> AppResult<Self> {
        let category = row.kind.parse::<Category>().map_err(|e| {
            AppError::Internal(format!("Item {} has invalid category: {}", row.id, e))
        })?;

        Ok(Item {
            id: row.id,
            owner_id: row.user_uid,
            category,
            tags: row.tags,
            metadata: ItemMetadata {
                summary: row.meta_summary,
                season: row.meta_season,
                style: row.meta_style,
                colors: row.meta_colors,
            },
            updated_at: row.updated_at,
        })
    }
}

impl PgWardrobeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WardrobeStore for PgWardrobeStore {
    async fn list_embedded_items(&self, owner_id: &str) -> AppResult<Vec<EmbeddedItem>> {
        let query = format!(
            "SELECT {}, e.model, e.dim, e.vec_f32 \
             FROM closet_items i \
             JOIN closet_item_embeddings e ON e.item_id = i.id \
             WHERE i.user_uid = $1 \
             ORDER BY i.id",
            ITEM_COLUMNS
        );

        let rows: Vec<EmbeddedItemRow> = sqlx::query_as(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item_id = row.item.id;
            let dim = usize::try_from(row.dim).unwrap_or(0);
            match Item::try_from(row.item) {
                Ok(item) => items.push(EmbeddedItem {
                    item,
                    embedding: Embedding {
                        item_id,
                        model: row.model,
                        dim,
                        vector: row.vec_f32,
                    },
                }),
                Err(e) => tracing::warn!(item_id, error = %e, "Skipping unreadable item row"),
            }
        }

        Ok(items)
    }

    async fn list_items(&self, owner_id: &str, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let query = format!(
            "SELECT {} FROM closet_items i \
             WHERE i.user_uid = $1 \
               AND ($2::text IS NULL OR i.kind = $2) \
               AND i.tags @> $3 \
             ORDER BY i.id",
            ITEM_COLUMNS
        );

        let rows: Vec<ItemRow> = sqlx::query_as(&query)
            .bind(owner_id)
            .bind(filter.category.map(|category| category.as_str()))
            .bind(&filter.tags)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Item::try_from).collect()
    }

    async fn get_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<Option<Item>> {
        let query = format!(
            "SELECT {} FROM closet_items i WHERE i.id = $1 AND i.user_uid = $2",
            ITEM_COLUMNS
        );

        let row: Option<ItemRow> = sqlx::query_as(&query)
            .bind(item_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }

    async fn create_item(&self, owner_id: &str, item: NewItem) -> AppResult<Item> {
        let row: ItemRow = sqlx::query_as(
            "INSERT INTO closet_items AS i \
                 (user_uid, kind, tags, meta_summary, meta_season, meta_style, meta_colors, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             RETURNING i.id, i.user_uid, i.kind, i.tags, i.meta_summary, i.meta_season, \
                       i.meta_style, i.meta_colors, i.updated_at",
        )
        .bind(owner_id)
        .bind(item.category.as_str())
        .bind(item.tags)
        .bind(item.metadata.summary)
        .bind(item.metadata.season)
        .bind(item.metadata.style)
        .bind(item.metadata.colors)
        .fetch_one(&self.pool)
        .await?;

        Item::try_from(row)
    }

    async fn update_item(
        &self,
        owner_id: &str,
        item_id: ItemId,
        tags: Vec<String>,
        metadata: ItemMetadata,
    ) -> AppResult<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            "UPDATE closet_items AS i \
             SET tags = $3, meta_summary = $4, meta_season = $5, meta_style = $6, \
                 meta_colors = $7, updated_at = now() \
             WHERE i.id = $1 AND i.user_uid = $2 \
             RETURNING i.id, i.user_uid, i.kind, i.tags, i.meta_summary, i.meta_season, \
                       i.meta_style, i.meta_colors, i.updated_at",
        )
        .bind(item_id)
        .bind(owner_id)
        .bind(tags)
        .bind(metadata.summary)
        .bind(metadata.season)
        .bind(metadata.style)
        .bind(metadata.colors)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Item::try_from).transpose()
    }

    async fn delete_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM closet_item_embeddings e \
             USING closet_items i \
             WHERE e.item_id = i.id AND i.id = $1 AND i.user_uid = $2",
        )
        .bind(item_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM closet_items WHERE id = $1 AND user_uid = $2")
            .bind(item_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn put_embedding(&self, embedding: Embedding) -> AppResult<()> {
        let dim = i32::try_from(embedding.dim).map_err(|_| {
            AppError::InvalidInput(format!("Embedding dimension {} is too large", embedding.dim))
        })?;

        sqlx::query(
            "INSERT INTO closet_item_embeddings (item_id, model, dim, vec_f32, updated_at) \
             SELECT i.id, $2, $3, $4, now() FROM closet_items i WHERE i.id = $1 \
             ON CONFLICT (item_id) DO UPDATE \
             SET model = EXCLUDED.model, dim = EXCLUDED.dim, \
                 vec_f32 = EXCLUDED.vec_f32, updated_at = now()",
        )
        .bind(embedding.item_id)
        .bind(embedding.model)
        .bind(dim)
        .bind(embedding.vector)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
