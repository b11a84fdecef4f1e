use crate::models::product_qa::{ProductQa, ProductQaWithReplies};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const QA_COLUMNS: &str = "q.id, q.parent_id, q.product_id, q.user_name, q.user_email, q.question, q.answer, q.answered_by, \
  q.is_answered, q.is_visible, q.likes_count, q.created_at, q.answered_at, q.updated_at";

pub async fn insert(
  pool: &PgPool,
  product_id: Uuid,
  parent_id: Option<Uuid>,
  user_name: &str,
  user_email: Option<&str>,
  question: &str,
) -> sqlx::Result<ProductQa> {
  let sql = format!(
    "INSERT INTO product_qa AS q (id, parent_id, product_id, user_name, user_email, question) \
     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {QA_COLUMNS}"
  );
  sqlx::query_as::<_, ProductQa>(&sql)
    .bind(Uuid::new_v4())
    .bind(parent_id)
    .bind(product_id)
    .bind(user_name)
    .bind(user_email)
    .bind(question)
    .fetch_one(pool)
    .await
}

pub async fn find<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<ProductQa>> {
  let sql = format!("SELECT {QA_COLUMNS} FROM product_qa q WHERE q.id = $1");
  sqlx::query_as::<_, ProductQa>(&sql).bind(id).fetch_optional(executor).await
}

/// Visible top-level entries, newest first, each with its visible reply count.
pub async fn list_top_level(pool: &PgPool, product_id: Uuid) -> sqlx::Result<Vec<ProductQaWithReplies>> {
  let sql = format!(
    "SELECT {QA_COLUMNS}, \
       (SELECT COUNT(*) FROM product_qa r WHERE r.parent_id = q.id AND r.is_visible) AS replies_count \
     FROM product_qa q WHERE q.product_id = $1 AND q.parent_id IS NULL AND q.is_visible \
     ORDER BY q.created_at DESC"
  );
  sqlx::query_as::<_, ProductQaWithReplies>(&sql)
    .bind(product_id)
    .fetch_all(pool)
    .await
}

pub async fn replies(pool: &PgPool, question_id: Uuid) -> sqlx::Result<Vec<ProductQa>> {
  let sql = format!("SELECT {QA_COLUMNS} FROM product_qa q WHERE q.parent_id = $1 AND q.is_visible ORDER BY q.created_at ASC");
  sqlx::query_as::<_, ProductQa>(&sql).bind(question_id).fetch_all(pool).await
}

pub async fn replies_count(pool: &PgPool, question_id: Uuid) -> sqlx::Result<i64> {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM product_qa WHERE parent_id = $1 AND is_visible")
    .bind(question_id)
    .fetch_one(pool)
    .await
}

pub async fn set_answer(pool: &PgPool, id: Uuid, answer: &str, answered_by: &str) -> sqlx::Result<Option<ProductQa>> {
  let sql = format!(
    "UPDATE product_qa AS q SET answer = $2, answered_by = $3, is_answered = TRUE, answered_at = NOW(), updated_at = NOW() \
     WHERE q.id = $1 RETURNING {QA_COLUMNS}"
  );
  sqlx::query_as::<_, ProductQa>(&sql)
    .bind(id)
    .bind(answer)
    .bind(answered_by)
    .fetch_optional(pool)
    .await
}

pub async fn set_visibility(pool: &PgPool, id: Uuid, visible: bool) -> sqlx::Result<bool> {
  let result = sqlx::query("UPDATE product_qa SET is_visible = $2, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .bind(visible)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn has_liked<'e, E: PgExecutor<'e>>(executor: E, qa_id: Uuid, user_identifier: &str) -> sqlx::Result<bool> {
  sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM qa_likes WHERE qa_id = $1 AND user_identifier = $2)")
    .bind(qa_id)
    .bind(user_identifier)
    .fetch_one(executor)
    .await
}

pub async fn insert_like<'e, E: PgExecutor<'e>>(executor: E, qa_id: Uuid, user_identifier: &str) -> sqlx::Result<bool> {
  let result = sqlx::query(
    "INSERT INTO qa_likes (id, qa_id, user_identifier) VALUES ($1, $2, $3) ON CONFLICT (qa_id, user_identifier) DO NOTHING",
  )
  .bind(Uuid::new_v4())
  .bind(qa_id)
  .bind(user_identifier)
  .execute(executor)
  .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn delete_like<'e, E: PgExecutor<'e>>(executor: E, qa_id: Uuid, user_identifier: &str) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM qa_likes WHERE qa_id = $1 AND user_identifier = $2")
    .bind(qa_id)
    .bind(user_identifier)
    .execute(executor)
    .await?;
  Ok(result.rows_affected() == 1)
}

/// Adds `delta` to the like counter without going below zero; returns the new count.
pub async fn adjust_likes<'e, E: PgExecutor<'e>>(executor: E, qa_id: Uuid, delta: i32) -> sqlx::Result<i32> {
  sqlx::query_scalar::<_, i32>(
    "UPDATE product_qa SET likes_count = GREATEST(likes_count + $2, 0) WHERE id = $1 RETURNING likes_count",
  )
  .bind(qa_id)
  .bind(delta)
  .fetch_one(executor)
  .await
}
