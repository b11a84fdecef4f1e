use crate::models::{Product, ProductDetail};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.short_description, p.description, p.price, p.stock_quantity, \
  p.image_url, p.is_active, p.is_featured, p.weight_grams, p.origin, p.story, p.category_id, p.created_at, p.updated_at";

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
  pub category_slug: Option<String>,
  pub name_pattern: Option<String>,
  pub featured_only: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub short_description: Option<String>,
  pub description: Option<String>,
  pub price: i64,
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  pub is_featured: bool,
  pub weight_grams: Option<i32>,
  pub origin: Option<String>,
  pub story: Option<String>,
  pub category_id: Option<Uuid>,
}

const FILTER_CLAUSE: &str = "p.is_active \
  AND ($1::text IS NULL OR c.slug = $1) \
  AND ($2::text IS NULL OR p.name ILIKE $2) \
  AND (NOT $3 OR p.is_featured)";

pub async fn list_active(pool: &PgPool, filter: &ProductFilter, limit: i64, offset: i64) -> sqlx::Result<Vec<Product>> {
  let sql = format!(
    "SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON c.id = p.category_id \
     WHERE {FILTER_CLAUSE} ORDER BY p.created_at DESC LIMIT $4 OFFSET $5"
  );
  sqlx::query_as::<_, Product>(&sql)
    .bind(filter.category_slug.as_deref())
    .bind(filter.name_pattern.as_deref())
    .bind(filter.featured_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_active(pool: &PgPool, filter: &ProductFilter) -> sqlx::Result<i64> {
  let sql = format!("SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE {FILTER_CLAUSE}");
  sqlx::query_scalar::<_, i64>(&sql)
    .bind(filter.category_slug.as_deref())
    .bind(filter.name_pattern.as_deref())
    .bind(filter.featured_only)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<Product>> {
  let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
  sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(executor).await
}

/// Active product with its category name.
pub async fn find_active_detail(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<ProductDetail>> {
  let sql = format!(
    "SELECT {PRODUCT_COLUMNS}, c.name AS category_name FROM products p \
     LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = $1 AND p.is_active"
  );
  sqlx::query_as::<_, ProductDetail>(&sql).bind(id).fetch_optional(pool).await
}

pub async fn find_many<'e, E: PgExecutor<'e>>(executor: E, ids: &[Uuid]) -> sqlx::Result<Vec<Product>> {
  let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)");
  sqlx::query_as::<_, Product>(&sql).bind(ids.to_vec()).fetch_all(executor).await
}

pub async fn weights(pool: &PgPool, ids: &[Uuid]) -> sqlx::Result<Vec<(Uuid, Option<i32>)>> {
  sqlx::query_as::<_, (Uuid, Option<i32>)>("SELECT id, weight_grams FROM products WHERE id = ANY($1)")
    .bind(ids.to_vec())
    .fetch_all(pool)
    .await
}

/// Takes `quantity` units out of stock; `false` when not enough are left.
pub async fn decrement_stock<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, quantity: i32) -> sqlx::Result<bool> {
  let result = sqlx::query(
    "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
     WHERE id = $1 AND stock_quantity >= $2",
  )
  .bind(id)
  .bind(quantity)
  .execute(executor)
  .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn restore_stock<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, quantity: i32) -> sqlx::Result<()> {
  sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .bind(quantity)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn insert(pool: &PgPool, new: &NewProduct) -> sqlx::Result<Product> {
  let sql = format!(
    "INSERT INTO products AS p (id, name, short_description, description, price, stock_quantity, image_url, \
       is_featured, weight_grams, origin, story, category_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {PRODUCT_COLUMNS}"
  );
  sqlx::query_as::<_, Product>(&sql)
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.short_description)
    .bind(&new.description)
    .bind(new.price)
    .bind(new.stock_quantity)
    .bind(&new.image_url)
    .bind(new.is_featured)
    .bind(new.weight_grams)
    .bind(&new.origin)
    .bind(&new.story)
    .bind(new.category_id)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() == 1)
}
