use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  User,
  Staff,
  Admin,
}

impl Role {
  pub fn display_name(self) -> &'static str {
    match self {
      Role::User => "Khách hàng",
      Role::Staff => "Nhân viên",
      Role::Admin => "Quản trị viên",
    }
  }

  /// Staff and admins may use the back-office.
  pub fn is_staff(self) -> bool {
    matches!(self, Role::Staff | Role::Admin)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
  pub role: Role,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  /// Name used to greet the user in emails.
  pub fn display_name(&self) -> &str {
    self
      .full_name
      .as_deref()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or(&self.username)
  }
}
