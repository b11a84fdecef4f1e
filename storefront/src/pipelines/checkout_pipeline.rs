use crate::db;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::errors::{AppError, Result as AppResult};
use crate::models::order::compute_total;
use crate::models::{PaymentMethod, Product};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutLine, CheckoutRequest, LineSource};
use crate::services::{shipping, validation};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use storeflow::{Control, Ctx, FlowResult, Registry, SkipIf, Workflow};
use tracing::{event, info, warn, Level};
use uuid::Uuid;

pub const MAX_NOTES_CHARS: usize = 1000;
const EMPTY_CART: &str = "Giỏ hàng trống";
const INVALID_PROMOTION: &str = "Mã giảm giá không hợp lệ hoặc không đủ điều kiện";

/// `ORD` + epoch millis + two random digits.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
  format!("ORD{}{:02}", now.timestamp_millis(), OsRng.next_u32() % 100)
}

/// Field checks on the checkout form. Returns the parsed payment method.
pub fn validate_checkout_request(request: &CheckoutRequest) -> AppResult<PaymentMethod> {
  if request.customer_name.trim().is_empty() {
    return Err(AppError::Validation("Vui lòng nhập họ tên".to_string()));
  }
  if !validation::is_valid_email(&request.customer_email) {
    return Err(AppError::Validation("Email không hợp lệ".to_string()));
  }
  if !validation::is_valid_phone(&request.customer_phone) {
    return Err(AppError::Validation("Số điện thoại phải có 10-11 chữ số".to_string()));
  }
  if request.shipping_address.trim().is_empty() {
    return Err(AppError::Validation("Vui lòng nhập địa chỉ giao hàng".to_string()));
  }
  if request.payment_method.trim().is_empty() {
    return Err(AppError::Validation("Vui lòng chọn phương thức thanh toán".to_string()));
  }
  let method = request
    .payment_method
    .parse::<PaymentMethod>()
    .map_err(AppError::Validation)?;
  if request.notes.as_deref().map_or(0, |n| n.chars().count()) > MAX_NOTES_CHARS {
    return Err(AppError::Validation(format!(
      "Ghi chú không được vượt quá {} ký tự",
      MAX_NOTES_CHARS
    )));
  }
  if let Some(items) = &request.items {
    if items.iter().any(|i| i.quantity <= 0) {
      return Err(AppError::Validation("Số lượng phải lớn hơn 0".to_string()));
    }
  }
  Ok(method)
}

/// Message shown to the customer once the order is placed.
pub fn success_message(method: PaymentMethod, order_number: &str) -> String {
  match method {
    PaymentMethod::Cod => format!(
      "Đặt hàng COD thành công! Mã đơn hàng: {}. Đơn hàng đang được xử lý và sẽ được giao đến bạn sớm nhất.",
      order_number
    ),
    _ => format!("Đặt hàng thành công! Mã đơn hàng: {}", order_number),
  }
}

/// Every line must be sellable in the requested quantity.
fn check_lines(lines: &[CheckoutLine]) -> AppResult<()> {
  if lines.is_empty() {
    return Err(AppError::Validation(EMPTY_CART.to_string()));
  }
  for line in lines {
    if !line.product.is_active {
      return Err(AppError::Validation(format!(
        "Sản phẩm {} không khả dụng",
        line.product.name
      )));
    }
    if line.quantity > line.product.stock_quantity {
      return Err(AppError::Validation(format!(
        "Không đủ hàng trong kho cho sản phẩm {}. Còn lại: {}",
        line.product.name, line.product.stock_quantity
      )));
    }
  }
  Ok(())
}

/// Pairs requested quantities with loaded products, keeping the request order.
fn pair_with_products(requested: &[(Uuid, i32)], products: Vec<Product>) -> AppResult<Vec<CheckoutLine>> {
  let mut by_id: HashMap<Uuid, Product> = products.into_iter().map(|p| (p.id, p)).collect();
  let mut quantities: Vec<(Uuid, i32)> = Vec::new();
  for (product_id, quantity) in requested {
    match quantities.iter_mut().find(|(id, _)| id == product_id) {
      Some((_, total)) => *total += quantity,
      None => quantities.push((*product_id, *quantity)),
    }
  }
  quantities
    .into_iter()
    .map(|(product_id, quantity)| {
      by_id
        .remove(&product_id)
        .map(|product| CheckoutLine { product, quantity })
        .ok_or_else(|| AppError::Validation("Sản phẩm không tồn tại".to_string()))
    })
    .collect()
}

async fn validate_order_request(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let method = {
    let guard = ctx.read();
    validate_checkout_request(&guard.request)?
  };
  event!(Level::DEBUG, payment_method = ?method, "Checkout request validated.");
  ctx.write().payment_method = Some(method);
  Ok(Control::Continue)
}

async fn resolve_cart_lines(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let (request_items, user_id, guest_key, app_state) = {
    let guard = ctx.read();
    (
      guard.request.items.clone().filter(|items| !items.is_empty()),
      guard.user_id,
      guard.guest_cart_key.clone(),
      guard.app_state.clone(),
    )
  };

  let (source, requested): (LineSource, Vec<(Uuid, i32)>) = if let Some(items) = request_items {
    (LineSource::Request, items.iter().map(|i| (i.product_id, i.quantity)).collect())
  } else if let Some(user_id) = user_id {
    let lines = common_steps::ensure_cart_available_for_checkout(&app_state.db_pool, Some(user_id)).await?;
    (LineSource::UserCart, lines.iter().map(|l| (l.product_id, l.quantity)).collect())
  } else if let Some(key) = guest_key {
    let cart = app_state.guest_carts.get(&key);
    (LineSource::GuestCart, cart.items().iter().map(|i| (i.product_id, i.quantity)).collect())
  } else {
    (LineSource::GuestCart, Vec::new())
  };

  if requested.is_empty() {
    return Err(AppError::Validation(EMPTY_CART.to_string()));
  }
  let ids: Vec<Uuid> = requested.iter().map(|(id, _)| *id).collect();
  let products = db::products::find_many(&app_state.db_pool, &ids).await?;
  let lines = pair_with_products(&requested, products)?;
  check_lines(&lines)?;

  let subtotal = lines.iter().map(CheckoutLine::line_total).sum();
  info!(?source, lines = lines.len(), subtotal, "Checkout lines resolved.");
  {
    let mut guard = ctx.write();
    guard.line_source = Some(source);
    guard.lines = lines;
    guard.subtotal = subtotal;
  }
  Ok(Control::Continue)
}

async fn apply_promotion(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let (code, subtotal, pool) = {
    let guard = ctx.read();
    (
      guard.request.promotion_code.clone().unwrap_or_default(),
      guard.subtotal,
      guard.app_state.db_pool.clone(),
    )
  };
  let now = Utc::now();
  let promotion = db::promotions::find_by_code(&pool, &code)
    .await?
    .filter(|p| p.can_apply(subtotal, now))
    .ok_or_else(|| {
      warn!(%code, subtotal, "Promotion rejected at checkout.");
      AppError::Validation(INVALID_PROMOTION.to_string())
    })?;
  let discount = promotion.calculate_discount(subtotal, now);
  info!(code = %promotion.code, discount, "Promotion applied.");
  {
    let mut guard = ctx.write();
    guard.discount_amount = discount;
    guard.promotion = Some(promotion);
  }
  Ok(Control::Continue)
}

async fn compute_shipping(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let mut guard = ctx.write();
  let weight = shipping::total_weight_grams(guard.lines.iter().map(|l| (l.product.weight_grams, l.quantity)));
  let rates = guard.app_state.config.shipping;
  guard.shipping_fee = shipping::shipping_fee(&rates, guard.subtotal, guard.discount_amount, weight);
  guard.tax_amount = shipping::tax_amount(guard.subtotal - guard.discount_amount);
  guard.total_amount = compute_total(guard.subtotal, guard.discount_amount, guard.shipping_fee, guard.tax_amount);
  event!(
    Level::DEBUG,
    weight,
    shipping_fee = guard.shipping_fee,
    total = guard.total_amount,
    "Totals computed."
  );
  Ok(Control::Continue)
}

async fn persist_order(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let (new_order, new_items, promotion_id, pool) = {
    let guard = ctx.read();
    let method = guard
      .payment_method
      .ok_or_else(|| AppError::Internal("Payment method not validated".to_string()))?;
    let request = &guard.request;
    let new_order = NewOrder {
      order_number: generate_order_number(Utc::now()),
      user_id: guard.user_id,
      subtotal: guard.subtotal,
      discount_amount: guard.discount_amount,
      shipping_fee: guard.shipping_fee,
      tax_amount: guard.tax_amount,
      total_amount: guard.total_amount,
      payment_method: method,
      promotion_code: guard.promotion.as_ref().map(|p| p.code.clone()),
      customer_name: request.customer_name.trim().to_string(),
      customer_email: request.customer_email.trim().to_string(),
      customer_phone: request.customer_phone.trim().to_string(),
      shipping_address_text: request.shipping_address.trim().to_string(),
      notes: validation::non_blank(request.notes.as_deref()),
    };
    let new_items: Vec<NewOrderItem> = guard
      .lines
      .iter()
      .map(|line| NewOrderItem {
        product_id: line.product.id,
        product_name: line.product.name.clone(),
        quantity: line.quantity,
        unit_price: line.product.price,
      })
      .collect();
    (new_order, new_items, guard.promotion.as_ref().map(|p| p.id), guard.app_state.db_pool.clone())
  };

  // Dropping the transaction on any early return rolls everything back.
  let mut tx = pool.begin().await?;
  let order = db::orders::insert(&mut *tx, &new_order).await?;
  let mut items = Vec::with_capacity(new_items.len());
  for item in &new_items {
    if !db::products::decrement_stock(&mut *tx, item.product_id, item.quantity).await? {
      warn!(product_id = %item.product_id, "Stock guard failed; rolling back order.");
      return Err(AppError::Validation("Không đủ hàng trong kho".to_string()));
    }
    items.push(db::orders::insert_item(&mut *tx, order.id, item).await?);
  }
  if let Some(promotion_id) = promotion_id {
    if !db::promotions::consume(&mut *tx, promotion_id).await? {
      return Err(AppError::Validation(INVALID_PROMOTION.to_string()));
    }
  }
  tx.commit().await?;

  info!(order_id = %order.id, order_number = %order.order_number, total = order.total_amount, "Order persisted.");
  {
    let mut guard = ctx.write();
    guard.order = Some(order);
    guard.items = items;
  }
  Ok(Control::Continue)
}

async fn clear_cart(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let (user_id, guest_key, app_state) = {
    let guard = ctx.read();
    (guard.user_id, guard.guest_cart_key.clone(), guard.app_state.clone())
  };
  match (user_id, guest_key) {
    (Some(user_id), _) => {
      let removed = db::cart::clear(&app_state.db_pool, user_id).await?;
      event!(Level::DEBUG, %user_id, removed, "User cart cleared.");
    }
    (None, Some(key)) => app_state.guest_carts.clear(&key),
    (None, None) => {}
  }
  ctx.write().cart_cleared = true;
  Ok(Control::Continue)
}

async fn send_order_confirmation(ctx: Ctx<CheckoutCtxData>) -> AppResult<Control> {
  let (order, items, notifier) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.items.clone(), guard.app_state.notifier.clone())
  };
  let Some(order) = order else {
    return Ok(Control::Continue);
  };
  notifier.order_confirmation(&order, &items).await?;
  ctx.write().confirmation_sent = true;
  Ok(Control::Continue)
}

pub fn build_checkout_workflow() -> FlowResult<Workflow<CheckoutCtxData, AppError>> {
  let no_code: SkipIf<CheckoutCtxData> =
    Arc::new(|ctx: Ctx<CheckoutCtxData>| validation::is_blank(ctx.read().request.promotion_code.as_deref()));
  let mut wf = Workflow::<CheckoutCtxData, AppError>::new(&[
    ("validate_order_request", false, None),
    ("resolve_cart_lines", false, None),
    ("apply_promotion", false, Some(no_code)),
    ("compute_shipping", false, None),
    ("persist_order", false, None),
    ("clear_cart", false, None),
    ("send_order_confirmation", true, None),
  ]);
  wf.on("validate_order_request", validate_order_request)?;
  wf.on("resolve_cart_lines", resolve_cart_lines)?;
  wf.on("apply_promotion", apply_promotion)?;
  wf.on("compute_shipping", compute_shipping)?;
  wf.on("persist_order", persist_order)?;
  wf.on("clear_cart", clear_cart)?;
  wf.on("send_order_confirmation", send_order_confirmation)?;
  Ok(wf)
}

pub fn register_checkout_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_checkout_workflow()?);
  Ok(())
}
