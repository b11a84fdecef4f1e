use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Grams assumed per unit when a product has no weight on record.
pub const DEFAULT_WEIGHT_GRAMS: i32 = 500;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub short_description: Option<String>,
  pub description: Option<String>,
  /// Whole đồng.
  pub price: i64,
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  pub is_active: bool,
  pub is_featured: bool,
  pub weight_grams: Option<i32>,
  pub origin: Option<String>,
  pub story: Option<String>,
  pub category_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Product row joined with its category name, as served by the catalog detail endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
  #[sqlx(flatten)]
  #[serde(flatten)]
  pub product: Product,
  pub category_name: Option<String>,
}
