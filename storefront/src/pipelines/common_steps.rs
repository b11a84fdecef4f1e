//! Building blocks shared by several workflows.

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{CartItem, CartLine, Order, OrderItem, Product};
use crate::services::session_cart::SessionCart;
use sqlx::{PgConnection, PgPool};
use tracing::{instrument, warn};
use uuid::Uuid;

pub async fn load_order(pool: &PgPool, order_id: Uuid) -> AppResult<Order> {
  db::orders::find_by_id(pool, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Không tìm thấy đơn hàng {}", order_id)))
}

/// Puts the units of every line of a cancelled order back in stock. Runs on the caller's transaction.
pub async fn restore_order_stock(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
  let items = db::orders::items_for(&mut *conn, order_id).await?;
  for item in &items {
    if let Some(product_id) = item.product_id {
      db::products::restore_stock(&mut *conn, product_id, item.quantity).await?;
    }
  }
  Ok(items)
}

pub async fn load_active_product(pool: &PgPool, product_id: Uuid) -> AppResult<Product> {
  let product = db::products::find_by_id(pool, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Không tìm thấy sản phẩm".to_string()))?;
  if !product.is_active {
    return Err(AppError::Validation("Sản phẩm không khả dụng".to_string()));
  }
  Ok(product)
}

/// Adds to a signed-in user's cart after checking the combined quantity against stock.
#[instrument(name = "common_step::add_to_user_cart", skip(pool, product), fields(product_id = %product.id), err(Display))]
pub async fn add_to_user_cart(pool: &PgPool, user_id: Uuid, product: &Product, quantity: i32) -> AppResult<CartItem> {
  if quantity <= 0 {
    return Err(AppError::Validation("Số lượng phải lớn hơn 0".to_string()));
  }
  if !product.is_active {
    return Err(AppError::Validation("Sản phẩm không khả dụng".to_string()));
  }
  let already = db::cart::find_item(pool, user_id, product.id)
    .await?
    .map_or(0, |item| item.quantity);
  if quantity > product.stock_quantity || already + quantity > product.stock_quantity {
    return Err(AppError::Validation(format!(
      "Không đủ hàng trong kho. Còn lại: {}",
      product.stock_quantity
    )));
  }
  Ok(db::cart::add_quantity(pool, user_id, product.id, quantity, product.price).await?)
}

/// Folds a guest cart into the user's cart. Items that fail a check are logged and skipped.
///
/// Returns `(merged, skipped)`.
pub async fn merge_guest_cart(pool: &PgPool, user_id: Uuid, cart: &SessionCart) -> (usize, usize) {
  let mut merged = 0;
  let mut skipped = 0;
  for item in cart.items() {
    let outcome = match load_active_product(pool, item.product_id).await {
      Ok(product) => add_to_user_cart(pool, user_id, &product, item.quantity).await.map(|_| ()),
      Err(e) => Err(e),
    };
    match outcome {
      Ok(()) => merged += 1,
      Err(e) => {
        warn!(product_id = %item.product_id, error = %e, "Skipping guest cart item during merge.");
        skipped += 1;
      }
    }
  }
  (merged, skipped)
}

/// The signed-in user's cart lines, refusing a missing user or an empty cart.
pub async fn ensure_cart_available_for_checkout(pool: &PgPool, user_id: Option<Uuid>) -> AppResult<Vec<CartLine>> {
  let user_id = user_id.ok_or_else(|| AppError::Validation("Vui lòng đăng nhập để thanh toán".to_string()))?;
  let lines = db::cart::lines_for_user(pool, user_id).await?;
  if lines.is_empty() {
    return Err(AppError::Validation("Giỏ hàng trống".to_string()));
  }
  Ok(lines)
}
