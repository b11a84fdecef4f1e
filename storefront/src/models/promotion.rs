use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
  Percentage,
  Fixed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
  pub id: Uuid,
  /// Always stored upper-cased.
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub min_order_value: i64,
  pub max_discount: Option<i64>,
  pub usage_limit: Option<i32>,
  pub used_count: i32,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl Promotion {
  /// Largest order total the storefront accepts for discount checks, in đồng.
  pub const MAX_ORDER_TOTAL: i64 = 100_000_000_000;

  pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
  }

  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    self.is_active
      && self.start_date <= now
      && now <= self.end_date
      && self.usage_limit.map_or(true, |limit| self.used_count < limit)
  }

  pub fn can_apply(&self, order_total: i64, now: DateTime<Utc>) -> bool {
    self.is_valid(now) && order_total >= self.min_order_value
  }

  /// Discount in đồng for `order_total`, never more than the total itself.
  pub fn calculate_discount(&self, order_total: i64, now: DateTime<Utc>) -> i64 {
    if !self.can_apply(order_total, now) {
      return 0;
    }
    let raw = match self.discount_type {
      DiscountType::Percentage => {
        // Half-up rounding to a whole đồng; widened so huge totals cannot overflow.
        let pct = (i128::from(order_total) * i128::from(self.discount_value) + 50) / 100;
        let pct = i64::try_from(pct).unwrap_or(i64::MAX);
        match self.max_discount {
          Some(cap) => pct.min(cap),
          None => pct,
        }
      }
      DiscountType::Fixed => self.discount_value,
    };
    raw.clamp(0, order_total)
  }
}

/// Public view returned by the validation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSummary {
  pub id: Uuid,
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub min_order_value: i64,
}

impl From<&Promotion> for PromotionSummary {
  fn from(p: &Promotion) -> Self {
    Self {
      id: p.id,
      code: p.code.clone(),
      description: p.description.clone(),
      discount_type: p.discount_type,
      discount_value: p.discount_value,
      min_order_value: p.min_order_value,
    }
  }
}
