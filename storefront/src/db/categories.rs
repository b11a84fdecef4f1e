use crate::models::Category;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn list_active(pool: &PgPool) -> sqlx::Result<Vec<Category>> {
  sqlx::query_as::<_, Category>(
    "SELECT id, name, slug, description, is_active, created_at FROM categories WHERE is_active ORDER BY name",
  )
  .fetch_all(pool)
  .await
}

pub async fn insert(pool: &PgPool, name: &str, slug: &str, description: Option<&str>) -> sqlx::Result<Category> {
  sqlx::query_as::<_, Category>(
    "INSERT INTO categories (id, name, slug, description) VALUES ($1, $2, $3, $4) \
     RETURNING id, name, slug, description, is_active, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(name)
  .bind(slug)
  .bind(description)
  .fetch_one(pool)
  .await
}
