use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_COUNTRY: &str = "Vietnam";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub full_name: String,
  pub phone: String,
  pub address_line1: String,
  pub address_line2: Option<String>,
  pub city: String,
  pub province: Option<String>,
  pub postal_code: Option<String>,
  pub country: String,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Address {
  /// `line1, line2, city, province postal, country`, skipping empty parts.
  pub fn full_address(&self) -> String {
    let non_empty = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    let region = [self.province.as_deref(), self.postal_code.as_deref()]
      .into_iter()
      .filter_map(non_empty)
      .collect::<Vec<_>>()
      .join(" ");

    [
      non_empty(Some(self.address_line1.as_str())),
      non_empty(self.address_line2.as_deref()),
      non_empty(Some(self.city.as_str())),
      non_empty(Some(region.as_str())),
      non_empty(Some(self.country.as_str())),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
  }
}
