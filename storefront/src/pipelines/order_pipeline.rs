//! Back-office order workflows: status changes and COD approval.

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderStatus, PaymentMethod};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{ApproveCodCtxData, OrderStatusCtxData};
use crate::services::validation;
use chrono::Utc;
use storeflow::{Control, Ctx, FlowResult, Registry, Workflow};
use tracing::{info, warn};

/// Preconditions for approving a cash-on-delivery order for shipping.
pub fn check_cod_approval(order: &Order, shipping_carrier: Option<&str>) -> AppResult<()> {
  if order.payment_method != PaymentMethod::Cod {
    return Err(AppError::Validation("Đây không phải đơn hàng COD".to_string()));
  }
  if !matches!(order.status, OrderStatus::Pending | OrderStatus::Processing) {
    return Err(AppError::Validation(
      "Đơn hàng không ở trạng thái có thể phê duyệt".to_string(),
    ));
  }
  if validation::is_blank(shipping_carrier) {
    return Err(AppError::Validation("Vui lòng chọn nhà vận chuyển".to_string()));
  }
  Ok(())
}

// --- Status change ---

async fn load_order_for_status(ctx: Ctx<OrderStatusCtxData>) -> AppResult<Control> {
  let (order_id, pool) = {
    let guard = ctx.read();
    (guard.order_id, guard.app_state.db_pool.clone())
  };
  let order = common_steps::load_order(&pool, order_id).await?;
  {
    let mut guard = ctx.write();
    guard.previous_status = Some(order.status);
    guard.order = Some(order);
  }
  Ok(Control::Continue)
}

async fn validate_transition(ctx: Ctx<OrderStatusCtxData>) -> AppResult<Control> {
  let mut guard = ctx.write();
  let new_status = guard.new_status;
  let notes = validation::non_blank(guard.notes.as_deref());
  let order = guard
    .order
    .as_mut()
    .ok_or_else(|| AppError::Internal("Order not loaded before transition".to_string()))?;
  let changed = order
    .apply_status(new_status, Utc::now())
    .map_err(AppError::Validation)?;
  if notes.is_some() {
    order.notes = notes;
  }
  guard.changed = changed;
  Ok(Control::Continue)
}

async fn persist_status(ctx: Ctx<OrderStatusCtxData>) -> AppResult<Control> {
  let (order, previous, changed, pool) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.previous_status, guard.changed, guard.app_state.db_pool.clone())
  };
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded before save".to_string()))?;

  let mut tx = pool.begin().await?;
  let current = db::orders::find_for_update(&mut *tx, order.id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Không tìm thấy đơn hàng {}", order.id)))?;
  if Some(current.status) != previous {
    return Err(AppError::Conflict(
      "Đơn hàng vừa được cập nhật bởi người khác, vui lòng tải lại".to_string(),
    ));
  }
  let saved = db::orders::save_changes(&mut *tx, &order).await?;
  let restocked = if changed && saved.status == OrderStatus::Cancelled {
    common_steps::restore_order_stock(&mut tx, saved.id).await?.len()
  } else {
    0
  };
  tx.commit().await?;

  info!(order_number = %saved.order_number, status = ?saved.status, restocked, "Order status saved.");
  ctx.write().order = Some(saved);
  Ok(Control::Continue)
}

async fn notify_status_change(ctx: Ctx<OrderStatusCtxData>) -> AppResult<Control> {
  let (order, previous, notifier) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.previous_status, guard.app_state.notifier.clone())
  };
  let (Some(order), Some(previous)) = (order, previous) else {
    return Ok(Control::Continue);
  };
  notifier.status_change(&order, previous, order.status).await?;
  ctx.write().notified = previous != order.status;
  Ok(Control::Continue)
}

pub fn build_order_status_workflow() -> FlowResult<Workflow<OrderStatusCtxData, AppError>> {
  let mut wf = Workflow::<OrderStatusCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("validate_transition", false, None),
    ("persist_status", false, None),
    ("notify_customer", true, None),
  ]);
  wf.on("load_order", load_order_for_status)?;
  wf.on("validate_transition", validate_transition)?;
  wf.on("persist_status", persist_status)?;
  wf.on("notify_customer", notify_status_change)?;
  Ok(wf)
}

// --- COD approval ---

async fn load_order_for_cod(ctx: Ctx<ApproveCodCtxData>) -> AppResult<Control> {
  let (order_id, pool) = {
    let guard = ctx.read();
    (guard.order_id, guard.app_state.db_pool.clone())
  };
  let order = common_steps::load_order(&pool, order_id).await?;
  ctx.write().order = Some(order);
  Ok(Control::Continue)
}

async fn check_cod_eligibility(ctx: Ctx<ApproveCodCtxData>) -> AppResult<Control> {
  let guard = ctx.read();
  let order = guard
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order not loaded before COD check".to_string()))?;
  if let Err(e) = check_cod_approval(order, guard.shipping_carrier.as_deref()) {
    warn!(order_number = %order.order_number, error = %e, "COD approval refused.");
    return Err(e);
  }
  Ok(Control::Continue)
}

async fn mark_shipped(ctx: Ctx<ApproveCodCtxData>) -> AppResult<Control> {
  let (order, pool) = {
    let guard = ctx.read();
    let mut order = guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Order not loaded before COD approval".to_string()))?;
    order
      .apply_status(OrderStatus::Shipped, Utc::now())
      .map_err(AppError::Validation)?;
    order.shipping_carrier = validation::non_blank(guard.shipping_carrier.as_deref());
    if let Some(tracking) = validation::non_blank(guard.tracking_number.as_deref()) {
      order.tracking_number = Some(tracking);
    }
    if let Some(notes) = validation::non_blank(guard.notes.as_deref()) {
      order.notes = Some(notes);
    }
    (order, guard.app_state.db_pool.clone())
  };
  let saved = db::orders::save_changes(&pool, &order).await?;
  info!(order_number = %saved.order_number, carrier = ?saved.shipping_carrier, "COD order approved.");
  ctx.write().order = Some(saved);
  Ok(Control::Continue)
}

async fn send_shipping_notification(ctx: Ctx<ApproveCodCtxData>) -> AppResult<Control> {
  let (order, notifier) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.app_state.notifier.clone())
  };
  if let Some(order) = order {
    notifier.shipping(&order).await?;
    ctx.write().notified = true;
  }
  Ok(Control::Continue)
}

pub fn build_approve_cod_workflow() -> FlowResult<Workflow<ApproveCodCtxData, AppError>> {
  let mut wf = Workflow::<ApproveCodCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("check_cod_eligibility", false, None),
    ("mark_shipped", false, None),
    ("send_shipping_notification", true, None),
  ]);
  wf.on("load_order", load_order_for_cod)?;
  wf.on("check_cod_eligibility", check_cod_eligibility)?;
  wf.on("mark_shipped", mark_shipped)?;
  wf.on("send_shipping_notification", send_shipping_notification)?;
  Ok(wf)
}

pub fn register_order_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_order_status_workflow()?);
  registry.register(build_approve_cod_workflow()?);
  Ok(())
}
