use crate::models::{Role, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str =
  "id, username, email, password_hash, full_name, phone_number, role, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
  pub role: Role,
}

/// Back-office row: the user plus order aggregates.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserWithTotals {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
  pub role: Role,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub total_orders: i64,
  pub total_spent: i64,
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<User>> {
  let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
  sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(executor).await
}

/// Sign-in and forgot-password accept either the username or the email.
pub async fn find_by_login(pool: &PgPool, login: &str) -> sqlx::Result<Option<User>> {
  let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR LOWER(email) = LOWER($1) LIMIT 1");
  sqlx::query_as::<_, User>(&sql).bind(login.trim()).fetch_optional(pool).await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
  let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
  sqlx::query_as::<_, User>(&sql).bind(email.trim()).fetch_optional(pool).await
}

pub async fn username_exists(pool: &PgPool, username: &str) -> sqlx::Result<bool> {
  sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
    .bind(username)
    .fetch_one(pool)
    .await
}

pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
  sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
    .bind(email)
    .fetch_one(pool)
    .await
}

pub async fn count(pool: &PgPool) -> sqlx::Result<i64> {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(pool).await
}

pub async fn insert(pool: &PgPool, new: &NewUser) -> sqlx::Result<User> {
  let sql = format!(
    "INSERT INTO users (id, username, email, password_hash, full_name, phone_number, role) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
  );
  sqlx::query_as::<_, User>(&sql)
    .bind(Uuid::new_v4())
    .bind(&new.username)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.full_name)
    .bind(&new.phone_number)
    .bind(new.role)
    .fetch_one(pool)
    .await
}

pub async fn update_password<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
  sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .bind(password_hash)
    .execute(executor)
    .await?;
  Ok(())
}

/// Partial profile update; `None` keeps the stored value.
pub async fn update_profile(
  pool: &PgPool,
  id: Uuid,
  full_name: Option<&str>,
  email: Option<&str>,
  phone_number: Option<&str>,
) -> sqlx::Result<Option<User>> {
  let sql = format!(
    "UPDATE users SET full_name = COALESCE($2, full_name), email = COALESCE($3, email), \
       phone_number = COALESCE($4, phone_number), updated_at = NOW() \
     WHERE id = $1 RETURNING {USER_COLUMNS}"
  );
  sqlx::query_as::<_, User>(&sql)
    .bind(id)
    .bind(full_name)
    .bind(email)
    .bind(phone_number)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() == 1)
}

const TOTALS_SELECT: &str = "SELECT u.id, u.username, u.email, u.full_name, u.phone_number, u.role, u.is_active, u.created_at, \
    COUNT(o.id) AS total_orders, COALESCE(SUM(o.total_amount), 0)::BIGINT AS total_spent \
  FROM users u LEFT JOIN orders o ON o.user_id = u.id AND o.status <> 'CANCELLED'";

pub async fn list_with_totals(
  pool: &PgPool,
  search_pattern: Option<&str>,
  limit: i64,
  offset: i64,
) -> sqlx::Result<Vec<UserWithTotals>> {
  let sql = format!(
    "{TOTALS_SELECT} WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.email ILIKE $1 OR u.full_name ILIKE $1) \
     GROUP BY u.id ORDER BY u.created_at DESC LIMIT $2 OFFSET $3"
  );
  sqlx::query_as::<_, UserWithTotals>(&sql)
    .bind(search_pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_matching(pool: &PgPool, search_pattern: Option<&str>) -> sqlx::Result<i64> {
  sqlx::query_scalar::<_, i64>(
    "SELECT COUNT(*) FROM users u WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.email ILIKE $1 OR u.full_name ILIKE $1)",
  )
  .bind(search_pattern)
  .fetch_one(pool)
  .await
}

pub async fn find_with_totals(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<UserWithTotals>> {
  let sql = format!("{TOTALS_SELECT} WHERE u.id = $1 GROUP BY u.id");
  sqlx::query_as::<_, UserWithTotals>(&sql).bind(id).fetch_optional(pool).await
}
