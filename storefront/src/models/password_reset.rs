use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Reset links stay valid for one hour.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
  pub id: Uuid,
  pub token: String,
  pub user_id: Uuid,
  pub expiry_date: DateTime<Utc>,
  pub used: bool,
  pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now > self.expiry_date
  }

  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    !self.used && !self.is_expired(now)
  }
}
