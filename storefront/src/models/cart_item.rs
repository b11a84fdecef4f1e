use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  /// Price captured when the item was first added.
  pub unit_price: i64,
  pub added_at: DateTime<Utc>,
}

/// A database cart line joined with the product fields the cart views need.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  pub product_name: String,
  pub description: Option<String>,
  pub image_url: Option<String>,
  pub quantity: i32,
  pub unit_price: i64,
  pub current_price: i64,
  pub stock_quantity: i32,
  pub is_active: bool,
  pub weight_grams: Option<i32>,
  pub added_at: DateTime<Utc>,
}

impl CartLine {
  pub fn line_total(&self) -> i64 {
    self.unit_price * i64::from(self.quantity)
  }
}
