use crate::models::Address;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const ADDRESS_COLUMNS: &str = "id, user_id, full_name, phone, address_line1, address_line2, city, province, postal_code, \
  country, is_default, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct AddressInput {
  pub full_name: String,
  pub phone: String,
  pub address_line1: String,
  pub address_line2: Option<String>,
  pub city: String,
  pub province: Option<String>,
  pub postal_code: Option<String>,
  pub country: String,
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Address>> {
  let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC");
  sqlx::query_as::<_, Address>(&sql).bind(user_id).fetch_all(pool).await
}

pub async fn find<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<Address>> {
  let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1");
  sqlx::query_as::<_, Address>(&sql).bind(id).fetch_optional(executor).await
}

pub async fn count_for_user<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> sqlx::Result<i64> {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn insert<'e, E: PgExecutor<'e>>(
  executor: E,
  user_id: Uuid,
  input: &AddressInput,
  is_default: bool,
) -> sqlx::Result<Address> {
  let sql = format!(
    "INSERT INTO addresses (id, user_id, full_name, phone, address_line1, address_line2, city, province, postal_code, \
       country, is_default) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {ADDRESS_COLUMNS}"
  );
  sqlx::query_as::<_, Address>(&sql)
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.address_line1)
    .bind(&input.address_line2)
    .bind(&input.city)
    .bind(&input.province)
    .bind(&input.postal_code)
    .bind(&input.country)
    .bind(is_default)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
  executor: E,
  id: Uuid,
  input: &AddressInput,
  is_default: bool,
) -> sqlx::Result<Address> {
  let sql = format!(
    "UPDATE addresses SET full_name = $2, phone = $3, address_line1 = $4, address_line2 = $5, city = $6, \
       province = $7, postal_code = $8, country = $9, is_default = $10, updated_at = NOW() \
     WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
  );
  sqlx::query_as::<_, Address>(&sql)
    .bind(id)
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.address_line1)
    .bind(&input.address_line2)
    .bind(&input.city)
    .bind(&input.province)
    .bind(&input.postal_code)
    .bind(&input.country)
    .bind(is_default)
    .fetch_one(executor)
    .await
}

/// Clears the default flag on every address of the user except `keep`.
pub async fn clear_defaults<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid, keep: Option<Uuid>) -> sqlx::Result<()> {
  sqlx::query(
    "UPDATE addresses SET is_default = FALSE, updated_at = NOW() \
     WHERE user_id = $1 AND is_default AND ($2::uuid IS NULL OR id <> $2)",
  )
  .bind(user_id)
  .bind(keep)
  .execute(executor)
  .await?;
  Ok(())
}

pub async fn mark_default<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<()> {
  sqlx::query("UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<bool> {
  let result = sqlx::query("DELETE FROM addresses WHERE id = $1").bind(id).execute(executor).await?;
  Ok(result.rows_affected() == 1)
}

/// Makes the most recently created remaining address the default.
pub async fn promote_latest<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> sqlx::Result<()> {
  sqlx::query(
    "UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = \
       (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1)",
  )
  .bind(user_id)
  .execute(executor)
  .await?;
  Ok(())
}
