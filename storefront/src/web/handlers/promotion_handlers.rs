use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{self, promotions::PromotionInput};
use crate::errors::AppError;
use crate::models::{DiscountType, Promotion, PromotionSummary};
use crate::state::AppState;
use crate::web::extractors::StaffUser;

const INVALID_CODE: &str = "Mã giảm giá không hợp lệ hoặc không đủ điều kiện";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromotionQuery {
  pub code: String,
  pub order_total: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPayload {
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  #[serde(default)]
  pub min_order_value: i64,
  pub max_discount: Option<i64>,
  pub usage_limit: Option<i32>,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

impl PromotionPayload {
  fn into_input(self) -> Result<PromotionInput, AppError> {
    if self.code.trim().is_empty() {
      return Err(AppError::Validation("Mã khuyến mãi không được để trống".to_string()));
    }
    if self.discount_value <= 0 {
      return Err(AppError::Validation("Giá trị giảm phải lớn hơn 0".to_string()));
    }
    if self.discount_type == DiscountType::Percentage && self.discount_value > 100 {
      return Err(AppError::Validation("Phần trăm giảm không được vượt quá 100".to_string()));
    }
    if self.min_order_value < 0 || self.max_discount.is_some_and(|cap| cap < 0) {
      return Err(AppError::Validation("Giá trị không được âm".to_string()));
    }
    if self.end_date < self.start_date {
      return Err(AppError::Validation("Ngày kết thúc phải sau ngày bắt đầu".to_string()));
    }
    Ok(PromotionInput {
      code: self.code,
      description: self.description,
      discount_type: self.discount_type,
      discount_value: self.discount_value,
      min_order_value: self.min_order_value,
      max_discount: self.max_discount,
      usage_limit: self.usage_limit,
      start_date: self.start_date,
      end_date: self.end_date,
      is_active: self.is_active,
    })
  }
}

/// Maps a unique-key violation on `code` to a 409.
fn duplicate_code(err: sqlx::Error) -> AppError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
      AppError::Conflict("Mã khuyến mãi đã tồn tại".to_string())
    }
    _ => AppError::Sqlx(err),
  }
}

#[instrument(name = "handler::validate_promotion", skip(app_state, query), fields(code = %query.code, order_total = query.order_total))]
pub async fn validate_promotion_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ValidatePromotionQuery>,
) -> Result<HttpResponse, AppError> {
  if query.order_total <= 0 || query.order_total > Promotion::MAX_ORDER_TOTAL {
    return Err(AppError::Validation("Tổng đơn hàng không hợp lệ".to_string()));
  }
  let now = Utc::now();
  let promotion = db::promotions::find_by_code(&app_state.db_pool, &query.code)
    .await?
    .filter(|p| p.can_apply(query.order_total, now));

  let Some(promotion) = promotion else {
    return Ok(HttpResponse::Ok().json(json!({ "success": false, "message": INVALID_CODE })));
  };
  let discount = promotion.calculate_discount(query.order_total, now);
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Áp dụng mã giảm giá thành công",
    "promotion": PromotionSummary::from(&promotion),
    "discountAmount": discount,
    "newTotal": query.order_total - discount,
  })))
}

#[instrument(name = "handler::admin_list_promotions", skip(app_state, _staff))]
pub async fn list_promotions_handler(app_state: web::Data<AppState>, _staff: StaffUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(db::promotions::list_all(&app_state.db_pool).await?))
}

#[instrument(name = "handler::admin_create_promotion", skip(app_state, _staff, payload), fields(code = %payload.code))]
pub async fn create_promotion_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  payload: web::Json<PromotionPayload>,
) -> Result<HttpResponse, AppError> {
  let input = payload.into_inner().into_input()?;
  let promotion = db::promotions::insert(&app_state.db_pool, &input)
    .await
    .map_err(duplicate_code)?;
  info!(promotion_id = %promotion.id, "Promotion created.");
  Ok(HttpResponse::Created().json(promotion))
}

#[instrument(name = "handler::admin_update_promotion", skip(app_state, _staff, path, payload), fields(promotion_id = %path.as_ref()))]
pub async fn update_promotion_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<PromotionPayload>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  if db::promotions::find_by_id(&app_state.db_pool, id).await?.is_none() {
    return Err(AppError::NotFound("Không tìm thấy mã khuyến mãi".to_string()));
  }
  let input = payload.into_inner().into_input()?;
  let promotion = db::promotions::update(&app_state.db_pool, id, &input)
    .await
    .map_err(duplicate_code)?
    .ok_or_else(|| AppError::NotFound("Không tìm thấy mã khuyến mãi".to_string()))?;
  Ok(HttpResponse::Ok().json(promotion))
}

#[instrument(name = "handler::admin_delete_promotion", skip(app_state, _staff, path), fields(promotion_id = %path.as_ref()))]
pub async fn delete_promotion_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !db::promotions::delete(&app_state.db_pool, path.into_inner()).await? {
    return Err(AppError::NotFound("Không tìm thấy mã khuyến mãi".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Đã xóa mã khuyến mãi" })))
}
