//! Server-side carts for guests, keyed by the `DSV_CART` cookie.

use crate::errors::{AppError, Result};
use crate::models::Product;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const CART_COOKIE: &str = "DSV_CART";

/// Idle time after which a guest cart or session is forgotten.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Product snapshot kept in the guest cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCartItem {
  pub product_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price: i64,
  pub quantity: i32,
  pub image_url: Option<String>,
  pub stock: i32,
}

impl SessionCartItem {
  pub fn line_total(&self) -> i64 {
    self.price * i64::from(self.quantity)
  }
}

fn not_enough_stock(stock: i32) -> AppError {
  AppError::Validation(format!("Không đủ hàng trong kho. Còn lại: {}", stock))
}

/// Items in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCart {
  items: Vec<SessionCartItem>,
}

impl SessionCart {
  pub fn items(&self) -> &[SessionCartItem] {
    &self.items
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  fn position(&self, product_id: Uuid) -> Option<usize> {
    self.items.iter().position(|i| i.product_id == product_id)
  }

  /// Adds `quantity` of `product`, refreshing the stored snapshot.
  pub fn add(&mut self, product: &Product, quantity: i32) -> Result<()> {
    if quantity <= 0 {
      return Err(AppError::Validation("Số lượng phải lớn hơn 0".to_string()));
    }
    if !product.is_active {
      return Err(AppError::Validation("Sản phẩm không khả dụng".to_string()));
    }
    if quantity > product.stock_quantity {
      return Err(not_enough_stock(product.stock_quantity));
    }

    let existing = self.position(product.id).map_or(0, |idx| self.items[idx].quantity);
    let combined = existing + quantity;
    if combined > product.stock_quantity {
      return Err(not_enough_stock(product.stock_quantity));
    }

    let item = SessionCartItem {
      product_id: product.id,
      name: product.name.clone(),
      description: product.short_description.clone().or_else(|| product.description.clone()),
      price: product.price,
      quantity: combined,
      image_url: product.image_url.clone(),
      stock: product.stock_quantity,
    };
    match self.position(product.id) {
      Some(idx) => self.items[idx] = item,
      None => self.items.push(item),
    }
    Ok(())
  }

  /// Sets the quantity of an item; zero or less removes it.
  pub fn update(&mut self, product_id: Uuid, quantity: i32, available_stock: i32) -> Result<()> {
    let idx = self
      .position(product_id)
      .ok_or_else(|| AppError::Validation("Sản phẩm không có trong giỏ hàng".to_string()))?;
    if quantity <= 0 {
      self.items.remove(idx);
      return Ok(());
    }
    if quantity > available_stock {
      return Err(not_enough_stock(available_stock));
    }
    let item = &mut self.items[idx];
    item.quantity = quantity;
    item.stock = available_stock;
    Ok(())
  }

  pub fn remove(&mut self, product_id: Uuid) -> bool {
    match self.position(product_id) {
      Some(idx) => {
        self.items.remove(idx);
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn count(&self) -> i64 {
    self.items.iter().map(|i| i64::from(i.quantity)).sum()
  }

  pub fn total(&self) -> i64 {
    self.items.iter().map(SessionCartItem::line_total).sum()
  }
}

#[derive(Debug)]
struct StoredCart {
  cart: SessionCart,
  last_seen: Instant,
}

/// Guest carts with an idle timeout; every read or write counts as activity.
#[derive(Debug)]
pub struct GuestCartStore {
  carts: RwLock<HashMap<String, StoredCart>>,
  idle_ttl: Duration,
}

impl Default for GuestCartStore {
  fn default() -> Self {
    Self::with_ttl(DEFAULT_IDLE_TTL)
  }
}

impl GuestCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_ttl(idle_ttl: Duration) -> Self {
    Self {
      carts: RwLock::new(HashMap::new()),
      idle_ttl,
    }
  }

  fn is_expired(&self, stored: &StoredCart, now: Instant) -> bool {
    now.duration_since(stored.last_seen) >= self.idle_ttl
  }

  /// Live cart for `key`, dropping it first when it has been idle too long.
  fn live_entry<'a>(&self, carts: &'a mut HashMap<String, StoredCart>, key: &str, now: Instant) -> Option<&'a mut StoredCart> {
    if carts.get(key).is_some_and(|stored| self.is_expired(stored, now)) {
      carts.remove(key);
      tracing::debug!("Expired guest cart dropped.");
    }
    let stored = carts.get_mut(key)?;
    stored.last_seen = now;
    Some(stored)
  }

  /// Snapshot of a cart; unknown or expired keys give an empty cart.
  pub fn get(&self, key: &str) -> SessionCart {
    let mut carts = self.carts.write();
    self
      .live_entry(&mut carts, key, Instant::now())
      .map(|stored| stored.cart.clone())
      .unwrap_or_default()
  }

  /// Runs `f` against the cart under the write lock, creating it when missing.
  pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut SessionCart) -> R) -> R {
    let now = Instant::now();
    let mut carts = self.carts.write();
    if self.live_entry(&mut carts, key, now).is_none() {
      carts.insert(
        key.to_string(),
        StoredCart {
          cart: SessionCart::default(),
          last_seen: now,
        },
      );
    }
    let Some(stored) = carts.get_mut(key) else {
      return f(&mut SessionCart::default());
    };
    let out = f(&mut stored.cart);
    if stored.cart.is_empty() {
      carts.remove(key);
    }
    out
  }

  /// Removes the cart and hands back what it held.
  pub fn take(&self, key: &str) -> SessionCart {
    let now = Instant::now();
    let mut carts = self.carts.write();
    match carts.remove(key) {
      Some(stored) if !self.is_expired(&stored, now) => stored.cart,
      _ => SessionCart::default(),
    }
  }

  pub fn clear(&self, key: &str) {
    self.carts.write().remove(key);
  }

  /// Drops every idle cart; returns how many went.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut carts = self.carts.write();
    let before = carts.len();
    carts.retain(|_, stored| !self.is_expired(stored, now));
    before - carts.len()
  }

  pub fn len(&self) -> usize {
    self.carts.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.carts.read().is_empty()
  }
}
