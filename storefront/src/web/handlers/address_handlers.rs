use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, addresses::AddressInput};
use crate::errors::AppError;
use crate::models::{address::DEFAULT_COUNTRY, Address};
use crate::services::validation;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
  pub full_name: String,
  pub phone: String,
  pub address_line1: String,
  pub address_line2: Option<String>,
  pub city: String,
  pub province: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
  #[serde(default)]
  pub is_default: bool,
}

impl AddressPayload {
  fn to_input(&self) -> Result<AddressInput, AppError> {
    if self.full_name.trim().is_empty() {
      return Err(AppError::Validation("Vui lòng nhập họ tên".to_string()));
    }
    if !validation::is_valid_phone(&self.phone) {
      return Err(AppError::Validation("Số điện thoại không hợp lệ".to_string()));
    }
    if self.address_line1.trim().is_empty() || self.city.trim().is_empty() {
      return Err(AppError::Validation("Vui lòng nhập địa chỉ và thành phố".to_string()));
    }
    Ok(AddressInput {
      full_name: self.full_name.trim().to_string(),
      phone: self.phone.trim().to_string(),
      address_line1: self.address_line1.trim().to_string(),
      address_line2: validation::non_blank(self.address_line2.as_deref()),
      city: self.city.trim().to_string(),
      province: validation::non_blank(self.province.as_deref()),
      postal_code: validation::non_blank(self.postal_code.as_deref()),
      country: validation::non_blank(self.country.as_deref()).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    })
  }
}

/// Loads an address and checks it belongs to the caller.
async fn owned_address<'e, E: sqlx::PgExecutor<'e>>(
  executor: E,
  id: Uuid,
  user: &AuthenticatedUser,
) -> Result<Address, AppError> {
  let address = db::addresses::find(executor, id)
    .await?
    .ok_or_else(|| AppError::NotFound("Không tìm thấy địa chỉ".to_string()))?;
  if address.user_id != user.user_id {
    warn!(address_id = %id, user_id = %user.user_id, "Address does not belong to caller.");
    return Err(AppError::Forbidden("Bạn không có quyền truy cập địa chỉ này".to_string()));
  }
  Ok(address)
}

#[instrument(name = "handler::list_addresses", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn list_addresses_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let addresses = db::addresses::list_for_user(&app_state.db_pool, user.user_id).await?;
  Ok(HttpResponse::Ok().json(addresses))
}

#[instrument(name = "handler::get_address", skip(app_state, user, path), fields(user_id = %user.user_id, address_id = %path.as_ref()))]
pub async fn get_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address = owned_address(&app_state.db_pool, path.into_inner(), &user).await?;
  Ok(HttpResponse::Ok().json(json!({
    "address": address,
    "fullAddress": address.full_address(),
  })))
}

/// The user's first address always becomes the default.
#[instrument(name = "handler::create_address", skip(app_state, user, payload), fields(user_id = %user.user_id))]
pub async fn create_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: web::Json<AddressPayload>,
) -> Result<HttpResponse, AppError> {
  let input = payload.to_input()?;
  let mut tx = app_state.db_pool.begin().await?;
  let is_default = payload.is_default || db::addresses::count_for_user(&mut *tx, user.user_id).await? == 0;
  if is_default {
    db::addresses::clear_defaults(&mut *tx, user.user_id, None).await?;
  }
  let address = db::addresses::insert(&mut *tx, user.user_id, &input, is_default).await?;
  tx.commit().await?;
  info!(address_id = %address.id, is_default, "Address created.");
  Ok(HttpResponse::Created().json(address))
}

#[instrument(name = "handler::update_address", skip(app_state, user, path, payload), fields(user_id = %user.user_id, address_id = %path.as_ref()))]
pub async fn update_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<AddressPayload>,
) -> Result<HttpResponse, AppError> {
  let input = payload.to_input()?;
  let mut tx = app_state.db_pool.begin().await?;
  let existing = owned_address(&mut *tx, path.into_inner(), &user).await?;
  let is_default = existing.is_default || payload.is_default;
  if payload.is_default {
    db::addresses::clear_defaults(&mut *tx, user.user_id, Some(existing.id)).await?;
  }
  let address = db::addresses::update(&mut *tx, existing.id, &input, is_default).await?;
  tx.commit().await?;
  Ok(HttpResponse::Ok().json(address))
}

#[instrument(name = "handler::delete_address", skip(app_state, user, path), fields(user_id = %user.user_id, address_id = %path.as_ref()))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  let address = owned_address(&mut *tx, path.into_inner(), &user).await?;
  db::addresses::delete(&mut *tx, address.id).await?;
  if address.is_default {
    db::addresses::promote_latest(&mut *tx, user.user_id).await?;
  }
  tx.commit().await?;
  info!(was_default = address.is_default, "Address deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Đã xóa địa chỉ" })))
}

#[instrument(name = "handler::set_default_address", skip(app_state, user, path), fields(user_id = %user.user_id, address_id = %path.as_ref()))]
pub async fn set_default_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  let address = owned_address(&mut *tx, path.into_inner(), &user).await?;
  db::addresses::clear_defaults(&mut *tx, user.user_id, Some(address.id)).await?;
  db::addresses::mark_default(&mut *tx, address.id).await?;
  tx.commit().await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Đã đặt làm địa chỉ mặc định" })))
}
