use crate::models::PasswordResetToken;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub async fn insert(pool: &PgPool, user_id: Uuid, token: &str, expiry_date: DateTime<Utc>) -> sqlx::Result<()> {
  sqlx::query("INSERT INTO password_reset_tokens (id, token, user_id, expiry_date) VALUES ($1, $2, $3, $4)")
    .bind(Uuid::new_v4())
    .bind(token)
    .bind(user_id)
    .bind(expiry_date)
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn find_by_token(pool: &PgPool, token: &str) -> sqlx::Result<Option<PasswordResetToken>> {
  sqlx::query_as::<_, PasswordResetToken>(
    "SELECT id, token, user_id, expiry_date, used, created_at FROM password_reset_tokens WHERE token = $1",
  )
  .bind(token)
  .fetch_optional(pool)
  .await
}

/// Marks an unused, unexpired token as used. `false` means another request already consumed it.
pub async fn claim<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query(
    "UPDATE password_reset_tokens SET used = TRUE WHERE id = $1 AND used = FALSE AND expiry_date > NOW()",
  )
  .bind(id)
  .execute(executor)
  .await?;
  Ok(result.rows_affected() == 1)
}
