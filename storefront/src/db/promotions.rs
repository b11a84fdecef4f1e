use crate::models::{DiscountType, Promotion};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PROMOTION_COLUMNS: &str = "id, code, description, discount_type, discount_value, min_order_value, max_discount, \
  usage_limit, used_count, start_date, end_date, is_active, created_at";

#[derive(Debug, Clone)]
pub struct PromotionInput {
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub min_order_value: i64,
  pub max_discount: Option<i64>,
  pub usage_limit: Option<i32>,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub is_active: bool,
}

/// Case-insensitive lookup; codes are stored upper-cased.
pub async fn find_by_code<'e, E: PgExecutor<'e>>(executor: E, code: &str) -> sqlx::Result<Option<Promotion>> {
  let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = $1");
  sqlx::query_as::<_, Promotion>(&sql)
    .bind(Promotion::normalize_code(code))
    .fetch_optional(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Promotion>> {
  let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = $1");
  sqlx::query_as::<_, Promotion>(&sql).bind(id).fetch_optional(pool).await
}

pub async fn list_all(pool: &PgPool) -> sqlx::Result<Vec<Promotion>> {
  let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions ORDER BY created_at DESC");
  sqlx::query_as::<_, Promotion>(&sql).fetch_all(pool).await
}

pub async fn insert(pool: &PgPool, input: &PromotionInput) -> sqlx::Result<Promotion> {
  let sql = format!(
    "INSERT INTO promotions (id, code, description, discount_type, discount_value, min_order_value, max_discount, \
       usage_limit, start_date, end_date, is_active) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {PROMOTION_COLUMNS}"
  );
  sqlx::query_as::<_, Promotion>(&sql)
    .bind(Uuid::new_v4())
    .bind(Promotion::normalize_code(&input.code))
    .bind(&input.description)
    .bind(input.discount_type)
    .bind(input.discount_value)
    .bind(input.min_order_value)
    .bind(input.max_discount)
    .bind(input.usage_limit)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.is_active)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: Uuid, input: &PromotionInput) -> sqlx::Result<Option<Promotion>> {
  let sql = format!(
    "UPDATE promotions SET code = $2, description = $3, discount_type = $4, discount_value = $5, \
       min_order_value = $6, max_discount = $7, usage_limit = $8, start_date = $9, end_date = $10, is_active = $11 \
     WHERE id = $1 RETURNING {PROMOTION_COLUMNS}"
  );
  sqlx::query_as::<_, Promotion>(&sql)
    .bind(id)
    .bind(Promotion::normalize_code(&input.code))
    .bind(&input.description)
    .bind(input.discount_type)
    .bind(input.discount_value)
    .bind(input.min_order_value)
    .bind(input.max_discount)
    .bind(input.usage_limit)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.is_active)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM promotions WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() == 1)
}

/// Counts one use; `false` when the usage limit was reached concurrently.
pub async fn consume<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query(
    "UPDATE promotions SET used_count = used_count + 1 \
     WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
  )
  .bind(id)
  .execute(executor)
  .await?;
  Ok(result.rows_affected() == 1)
}
