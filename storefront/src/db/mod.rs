//! Runtime-checked sqlx queries, one module per table.
//!
//! Functions that may run inside a checkout or admin transaction take a
//! generic `PgExecutor`, the rest borrow the pool.

pub mod addresses;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod password_resets;
pub mod products;
pub mod promotions;
pub mod qa;
pub mod users;

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;

/// Page request clamped to sane bounds; `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: i64,
  pub size: i64,
}

impl PageRequest {
  pub const MAX_SIZE: i64 = 100;

  pub fn new(page: Option<i64>, size: Option<i64>, default_size: i64) -> Self {
    Self {
      page: page.unwrap_or(0).max(0),
      size: size.unwrap_or(default_size).clamp(1, Self::MAX_SIZE),
    }
  }

  pub fn offset(&self) -> i64 {
    self.page * self.size
  }

  pub fn total_pages(&self, total_elements: i64) -> i64 {
    (total_elements + self.size - 1) / self.size
  }
}

/// Applies the SQL files under `storefront/migrations`.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
  let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
  let migrator = Migrator::new(dir).await?;
  migrator.run(pool).await?;
  Ok(())
}

/// `%term%` for ILIKE filters; blank terms disable the filter.
pub(crate) fn like_pattern(term: Option<&str>) -> Option<String> {
  term
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(|t| format!("%{}%", t.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}
