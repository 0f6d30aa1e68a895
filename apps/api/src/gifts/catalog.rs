use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::gift::GiftRow;

pub async fn gift_exists(pool: &PgPool, gift_id: i64) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM gifts WHERE id = $1)")
            .bind(gift_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Loads the given gifts in id order, silently skipping ids that no longer exist.
pub async fn gifts_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<GiftRow>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(
        sqlx::query_as::<_, GiftRow>("SELECT * FROM gifts WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(pool)
            .await?,
    )
}
