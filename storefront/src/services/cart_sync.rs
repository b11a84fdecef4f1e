//! Conversion of the database cart to the payload the browser keeps in local storage.

use crate::models::CartLine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorageItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub price: i64,
  pub quantity: i32,
  pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorageCart {
  pub items: Vec<LocalStorageItem>,
  pub total: i64,
  /// Epoch milliseconds.
  pub last_modified: i64,
}

pub fn to_local_storage(lines: &[CartLine]) -> LocalStorageCart {
  let items: Vec<LocalStorageItem> = lines
    .iter()
    .map(|line| LocalStorageItem {
      product_id: line.product_id,
      product_name: line.product_name.clone(),
      price: line.unit_price,
      quantity: line.quantity,
      image_url: line.image_url.clone(),
    })
    .collect();
  LocalStorageCart {
    total: lines.iter().map(CartLine::line_total).sum(),
    items,
    last_modified: Utc::now().timestamp_millis(),
  }
}

/// The client should pull the server cart whenever the user has one.
pub fn needs_sync(db_cart_count: i64) -> bool {
  db_cart_count > 0
}
