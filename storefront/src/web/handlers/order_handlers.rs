//! Customer-facing order history, cancellation and guest tracking.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{Order, OrderStatus, OrderWithItems};
use crate::pipelines::common_steps;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct TrackQuery {
  pub email: String,
}

fn ensure_owner(order: &Order, user: &AuthenticatedUser) -> Result<(), AppError> {
  if order.user_id != Some(user.user_id) {
    warn!(order_id = %order.id, user_id = %user.user_id, "Order does not belong to caller.");
    return Err(AppError::Forbidden("Bạn không có quyền xem đơn hàng này".to_string()));
  }
  Ok(())
}

fn order_not_found() -> AppError {
  AppError::NotFound("Không tìm thấy đơn hàng".to_string())
}

#[instrument(name = "handler::list_orders", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let orders = db::orders::list_for_user(&app_state.db_pool, user.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, user, path), fields(user_id = %user.user_id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = db::orders::find_by_id(&app_state.db_pool, path.into_inner())
    .await?
    .ok_or_else(order_not_found)?;
  ensure_owner(&order, &user)?;
  let items = db::orders::items_for(&app_state.db_pool, order.id).await?;
  Ok(HttpResponse::Ok().json(OrderWithItems::new(order, items)))
}

/// Cancels an owned order and puts its units back in stock, all in one transaction.
#[instrument(name = "handler::cancel_order", skip(app_state, user, path), fields(user_id = %user.user_id, order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;

  let mut order = db::orders::find_for_update(&mut *tx, order_id)
    .await?
    .ok_or_else(order_not_found)?;
  ensure_owner(&order, &user)?;
  if !order.can_be_cancelled() {
    return Err(AppError::Validation("Không thể hủy đơn hàng ở trạng thái hiện tại".to_string()));
  }

  let previous = order.status;
  order.apply_status(OrderStatus::Cancelled, Utc::now()).map_err(AppError::Validation)?;
  let order = db::orders::save_changes(&mut *tx, &order).await?;

  let items = common_steps::restore_order_stock(&mut tx, order.id).await?;
  tx.commit().await?;
  info!(restored_lines = items.len(), "Order cancelled by customer.");

  if let Err(e) = app_state
    .notifier
    .status_change(&order, previous, OrderStatus::Cancelled)
    .await
  {
    warn!(error = %e, "Cancellation email failed.");
  }

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Đã hủy đơn hàng thành công",
    "order": OrderWithItems::new(order, items),
  })))
}

/// Guest order lookup; the email must match the one given at checkout.
#[instrument(name = "handler::track_order", skip(app_state, path, query), fields(order_number = %path.as_ref()))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<TrackQuery>,
) -> Result<HttpResponse, AppError> {
  let order = db::orders::find_by_number(&app_state.db_pool, &path.into_inner())
    .await?
    .filter(|o| o.customer_email.eq_ignore_ascii_case(query.email.trim()))
    .ok_or_else(order_not_found)?;
  let items = db::orders::items_for(&app_state.db_pool, order.id).await?;
  Ok(HttpResponse::Ok().json(OrderWithItems::new(order, items)))
}
