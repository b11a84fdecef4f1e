use crate::models::{CartItem, CartLine};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const CART_ITEM_COLUMNS: &str = "id, user_id, product_id, quantity, unit_price, added_at";

pub async fn lines_for_user(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<CartLine>> {
  sqlx::query_as::<_, CartLine>(
    "SELECT ci.product_id, p.name AS product_name, COALESCE(p.short_description, p.description) AS description, \
       p.image_url, ci.quantity, ci.unit_price, p.price AS current_price, p.stock_quantity, p.is_active, \
       p.weight_grams, ci.added_at \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await
}

pub async fn find_item(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> sqlx::Result<Option<CartItem>> {
  let sql = format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE user_id = $1 AND product_id = $2");
  sqlx::query_as::<_, CartItem>(&sql)
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// Adds `quantity` to the user's line, creating it with `unit_price` when missing.
pub async fn add_quantity(
  pool: &PgPool,
  user_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  unit_price: i64,
) -> sqlx::Result<CartItem> {
  let sql = format!(
    "INSERT INTO cart_items (id, user_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
     RETURNING {CART_ITEM_COLUMNS}"
  );
  sqlx::query_as::<_, CartItem>(&sql)
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(pool)
    .await
}

pub async fn set_quantity(pool: &PgPool, user_id: Uuid, product_id: Uuid, quantity: i32) -> sqlx::Result<bool> {
  let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn remove(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn clear<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> sqlx::Result<u64> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(executor)
    .await?;
  Ok(result.rows_affected())
}

/// Sum of quantities and sum of line totals.
pub async fn count_and_total(pool: &PgPool, user_id: Uuid) -> sqlx::Result<(i64, i64)> {
  sqlx::query_as::<_, (i64, i64)>(
    "SELECT COALESCE(SUM(quantity), 0)::BIGINT, COALESCE(SUM(quantity * unit_price), 0)::BIGINT \
     FROM cart_items WHERE user_id = $1",
  )
  .bind(user_id)
  .fetch_one(pool)
  .await
}
