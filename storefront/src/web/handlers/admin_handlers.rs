//! Back-office endpoints for orders and user accounts.

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use storeflow::{Ctx, Outcome};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, orders::AdminOrderFilter, orders::OrderDetailsPatch, users::NewUser, PageRequest};
use crate::errors::AppError;
use crate::models::{OrderStatus, OrderWithItems, PaymentStatus, Role};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{ApproveCodCtxData, OrderStatusCtxData};
use crate::pipelines::signup_pipeline;
use crate::services::{auth_service, validation};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, StaffUser};

const DEFAULT_PAGE_SIZE: i64 = 10;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrdersQuery {
  pub page: Option<i64>,
  pub size: Option<i64>,
  pub status: Option<String>,
  /// `YYYY-MM-DD`, inclusive.
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub search: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StatusChangePayload {
  pub status: OrderStatus,
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatePayload {
  pub status: Option<OrderStatus>,
  pub payment_status: Option<PaymentStatus>,
  pub shipping_carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
}

impl OrderUpdatePayload {
  /// Non-status fields to write. Notes already went through the status workflow when a status was given.
  pub fn details_patch(&self, notes_taken: bool) -> OrderDetailsPatch {
    OrderDetailsPatch {
      payment_status: self.payment_status,
      shipping_carrier: validation::non_blank(self.shipping_carrier.as_deref()),
      tracking_number: validation::non_blank(self.tracking_number.as_deref()),
      notes: if notes_taken { None } else { validation::non_blank(self.notes.as_deref()) },
    }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApproveCodPayload {
  pub shipping_carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdminUsersQuery {
  pub page: Option<i64>,
  pub size: Option<i64>,
  pub search: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
  pub username: String,
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
  pub role: Option<Role>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub phone_number: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
      .map(Some)
      .map_err(|_| AppError::Validation(format!("Ngày không hợp lệ: {}", s))),
  }
}

/// Status wins over the date range; dates cover whole days.
pub fn build_order_filter(query: &AdminOrdersQuery) -> Result<AdminOrderFilter, AppError> {
  let search_pattern = db::like_pattern(query.search.as_deref());
  if let Some(raw) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    let status: OrderStatus = raw.parse().map_err(AppError::Validation)?;
    return Ok(AdminOrderFilter {
      status: Some(status),
      search_pattern,
      ..Default::default()
    });
  }
  let start_of_day = NaiveTime::MIN;
  let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
  Ok(AdminOrderFilter {
    status: None,
    from: parse_date(query.start_date.as_deref())?.map(|d| Utc.from_utc_datetime(&d.and_time(start_of_day))),
    to: parse_date(query.end_date.as_deref())?.map(|d| Utc.from_utc_datetime(&d.and_time(end_of_day))),
    search_pattern,
  })
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, _staff, query))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = PageRequest::new(query.page, query.size, DEFAULT_PAGE_SIZE);
  let filter = build_order_filter(&query)?;
  let orders = db::orders::admin_list(&app_state.db_pool, &filter, page.size, page.offset()).await?;
  let total = db::orders::admin_count(&app_state.db_pool, &filter).await?;
  Ok(HttpResponse::Ok().json(json!({
    "content": orders,
    "page": page.page,
    "size": page.size,
    "totalElements": total,
    "totalPages": page.total_pages(total),
  })))
}

#[instrument(name = "handler::admin_get_order", skip(app_state, _staff, path), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = common_steps::load_order(&app_state.db_pool, path.into_inner()).await?;
  let items = db::orders::items_for(&app_state.db_pool, order.id).await?;
  Ok(HttpResponse::Ok().json(OrderWithItems::new(order, items)))
}

async fn run_status_workflow(
  app_state: &web::Data<AppState>,
  order_id: Uuid,
  new_status: OrderStatus,
  notes: Option<String>,
) -> Result<Ctx<OrderStatusCtxData>, AppError> {
  let ctx = Ctx::new(OrderStatusCtxData {
    app_state: app_state.get_ref().clone(),
    order_id,
    new_status,
    notes,
    order: None,
    previous_status: None,
    changed: false,
    notified: false,
  });
  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => Ok(ctx),
    Outcome::Halted => Err(AppError::PipelineHalted("Cập nhật trạng thái bị gián đoạn".to_string())),
  }
}

#[instrument(name = "handler::admin_change_status", skip(app_state, staff, path, payload), fields(order_id = %path.as_ref(), status = ?payload.status, staff = %staff.0.username))]
pub async fn change_status_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<StatusChangePayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = run_status_workflow(&app_state, path.into_inner(), payload.status, payload.notes).await?;
  let guard = ctx.read();
  let order = guard
    .order
    .clone()
    .ok_or_else(|| AppError::Internal("Status workflow finished without an order".to_string()))?;
  info!(changed = guard.changed, notified = guard.notified, "Order status updated.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": format!("Đã cập nhật trạng thái: {}", order.status.display_name()),
    "order": order,
    "emailSent": guard.notified,
  })))
}

/// Partial update. A status change goes through the status workflow first.
#[instrument(name = "handler::admin_update_order", skip(app_state, _staff, path, payload), fields(order_id = %path.as_ref()))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<OrderUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let payload = payload.into_inner();

  let status_handled_notes = match payload.status {
    Some(status) => {
      run_status_workflow(&app_state, order_id, status, payload.notes.clone()).await?;
      true
    }
    None => false,
  };

  let patch = payload.details_patch(status_handled_notes);
  let mut tx = app_state.db_pool.begin().await?;
  let current = db::orders::find_for_update(&mut *tx, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Không tìm thấy đơn hàng {}", order_id)))?;
  let previous_payment = current.payment_status;
  let order = if patch.is_empty() {
    current
  } else {
    db::orders::apply_details(&mut *tx, order_id, &patch).await?
  };
  tx.commit().await?;

  if let Err(e) = app_state
    .notifier
    .payment_change(&order, previous_payment, order.payment_status)
    .await
  {
    warn!(error = %e, "Payment status email failed.");
  }

  Ok(HttpResponse::Ok().json(json!({
    "message": "Order updated successfully",
    "timestamp": Utc::now().to_rfc3339(),
  })))
}

#[instrument(name = "handler::admin_approve_cod", skip(app_state, staff, path, payload), fields(order_id = %path.as_ref(), staff = %staff.0.username))]
pub async fn approve_cod_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<ApproveCodPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = Ctx::new(ApproveCodCtxData {
    app_state: app_state.get_ref().clone(),
    order_id: path.into_inner(),
    shipping_carrier: payload.shipping_carrier,
    tracking_number: payload.tracking_number,
    notes: payload.notes,
    order: None,
    notified: false,
  });
  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => {
      info!(notified = ctx.read().notified, "COD order approved.");
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Đơn hàng COD đã được phê duyệt thành công",
      })))
    }
    Outcome::Halted => Err(AppError::PipelineHalted("Phê duyệt đơn hàng bị gián đoạn".to_string())),
  }
}

// --- Users ---

#[instrument(name = "handler::admin_list_users", skip(app_state, _staff, query))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  query: web::Query<AdminUsersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = PageRequest::new(query.page, query.size, DEFAULT_PAGE_SIZE);
  let pattern = db::like_pattern(query.search.as_deref());
  let users = db::users::list_with_totals(&app_state.db_pool, pattern.as_deref(), page.size, page.offset()).await?;
  let total = db::users::count_matching(&app_state.db_pool, pattern.as_deref()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "content": users,
    "page": page.page,
    "size": page.size,
    "totalElements": total,
    "totalPages": page.total_pages(total),
  })))
}

#[instrument(name = "handler::admin_create_user", skip(app_state, _staff, payload), fields(username = %payload.username))]
pub async fn create_user_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  payload: web::Json<CreateUserPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let username = payload.username.trim().to_string();
  let email = payload.email.trim().to_string();
  signup_pipeline::validate_signup_fields(&username, &email, &payload.password)?;

  if db::users::username_exists(&app_state.db_pool, &username).await? {
    return Err(AppError::Conflict("Tên đăng nhập đã tồn tại".to_string()));
  }
  if db::users::email_exists(&app_state.db_pool, &email).await? {
    return Err(AppError::Conflict("Email đã tồn tại".to_string()));
  }

  let user = db::users::insert(
    &app_state.db_pool,
    &NewUser {
      username,
      email,
      password_hash: auth_service::hash_password(&payload.password)?,
      full_name: validation::non_blank(payload.full_name.as_deref()),
      phone_number: validation::non_blank(payload.phone_number.as_deref()),
      role: payload.role.unwrap_or(Role::User),
    },
  )
  .await?;
  info!(user_id = %user.id, role = ?user.role, "User created from back-office.");
  Ok(HttpResponse::Created().json(user))
}

#[instrument(name = "handler::admin_get_user", skip(app_state, _staff, path), fields(user_id = %path.as_ref()))]
pub async fn get_user_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let user = db::users::find_with_totals(&app_state.db_pool, path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Không tìm thấy người dùng".to_string()))?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::admin_update_user", skip(app_state, _staff, path, payload), fields(user_id = %path.as_ref()))]
pub async fn update_user_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateUserPayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  let current = db::users::find_by_id(&app_state.db_pool, user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Không tìm thấy người dùng".to_string()))?;

  let email = validation::non_blank(payload.email.as_deref());
  if let Some(email) = email.as_deref() {
    if !validation::is_valid_email(email) {
      return Err(AppError::Validation("Email không hợp lệ".to_string()));
    }
    if !email.eq_ignore_ascii_case(&current.email) && db::users::email_exists(&app_state.db_pool, email).await? {
      return Err(AppError::Conflict("Email đã tồn tại".to_string()));
    }
  }

  let user = db::users::update_profile(
    &app_state.db_pool,
    user_id,
    validation::non_blank(payload.full_name.as_deref()).as_deref(),
    email.as_deref(),
    validation::non_blank(payload.phone_number.as_deref()).as_deref(),
  )
  .await?
  .ok_or_else(|| AppError::NotFound("Không tìm thấy người dùng".to_string()))?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::admin_delete_user", skip(app_state, admin, path), fields(user_id = %path.as_ref(), admin = %admin.0.username))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == admin.0.user_id {
    return Err(AppError::Validation("Không thể xóa tài khoản đang đăng nhập".to_string()));
  }
  if !db::users::delete(&app_state.db_pool, user_id).await? {
    return Err(AppError::NotFound("Không tìm thấy người dùng".to_string()));
  }
  let revoked = app_state.sessions.revoke_user(user_id);
  info!(revoked_sessions = revoked, "User deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Đã xóa người dùng" })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_filter_ignores_dates() {
    let query = AdminOrdersQuery {
      status: Some("SHIPPED".into()),
      start_date: Some("not-a-date".into()),
      ..Default::default()
    };
    let filter = build_order_filter(&query).unwrap();
    assert_eq!(filter.status, Some(OrderStatus::Shipped));
    assert!(filter.from.is_none());
  }

  #[test]
  fn date_range_covers_whole_days() {
    let query = AdminOrdersQuery {
      start_date: Some("2025-01-01".into()),
      end_date: Some("2025-01-31".into()),
      search: Some("ORD17".into()),
      ..Default::default()
    };
    let filter = build_order_filter(&query).unwrap();
    assert_eq!(filter.from.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    assert_eq!(filter.to.unwrap().to_rfc3339(), "2025-01-31T23:59:59+00:00");
    assert_eq!(filter.search_pattern.as_deref(), Some("%ORD17%"));
  }

  #[test]
  fn bad_inputs_are_validation_errors() {
    let bad_status = AdminOrdersQuery {
      status: Some("LOST".into()),
      ..Default::default()
    };
    assert!(matches!(build_order_filter(&bad_status), Err(AppError::Validation(_))));

    let bad_date = AdminOrdersQuery {
      end_date: Some("31/01/2025".into()),
      ..Default::default()
    };
    assert!(matches!(build_order_filter(&bad_date), Err(AppError::Validation(_))));
  }

  #[test]
  fn details_patch_only_carries_given_fields() {
    assert!(OrderUpdatePayload::default().details_patch(false).is_empty());

    let payload = OrderUpdatePayload {
      status: Some(OrderStatus::Shipped),
      shipping_carrier: Some("  ".into()),
      tracking_number: Some(" GHN123 ".into()),
      notes: Some("Giao giờ hành chính".into()),
      ..Default::default()
    };
    let patch = payload.details_patch(true);
    assert!(patch.payment_status.is_none());
    assert!(patch.shipping_carrier.is_none());
    assert_eq!(patch.tracking_number.as_deref(), Some("GHN123"));
    assert!(patch.notes.is_none());

    let patch = payload.details_patch(false);
    assert_eq!(patch.notes.as_deref(), Some("Giao giờ hành chính"));
  }
}
