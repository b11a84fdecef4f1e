use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_QUESTION_CHARS: usize = 2000;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, FromRow)]
pub struct ProductQa {
  pub id: Uuid,
  pub parent_id: Option<Uuid>,
  pub product_id: Uuid,
  pub user_name: String,
  pub user_email: Option<String>,
  pub question: String,
  pub answer: Option<String>,
  pub answered_by: Option<String>,
  pub is_answered: bool,
  pub is_visible: bool,
  pub likes_count: i32,
  pub created_at: DateTime<Utc>,
  pub answered_at: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

/// A top-level entry together with the number of visible replies it has.
#[derive(Debug, Clone, FromRow)]
pub struct ProductQaWithReplies {
  #[sqlx(flatten)]
  pub qa: ProductQa,
  pub replies_count: i64,
}

/// Wire format shared by the REST listing and the broadcast topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaMessage {
  pub id: Option<Uuid>,
  pub parent_id: Option<Uuid>,
  pub product_id: Uuid,
  pub user_name: String,
  pub user_email: Option<String>,
  pub question: String,
  pub answer: Option<String>,
  pub timestamp: Option<String>,
  pub answer_timestamp: Option<String>,
  #[serde(default)]
  pub likes_count: i32,
  #[serde(default)]
  pub replies_count: i64,
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
  at.format(TIMESTAMP_FORMAT).to_string()
}

impl QaMessage {
  pub fn from_entry(qa: &ProductQa, replies_count: i64) -> Self {
    Self {
      id: Some(qa.id),
      parent_id: qa.parent_id,
      product_id: qa.product_id,
      user_name: qa.user_name.clone(),
      user_email: qa.user_email.clone(),
      question: qa.question.clone(),
      answer: qa.answer.clone(),
      timestamp: Some(format_timestamp(qa.created_at)),
      answer_timestamp: qa.answered_at.map(format_timestamp),
      likes_count: qa.likes_count,
      replies_count,
    }
  }

  /// Checks an incoming publish before it is stored.
  pub fn validate(&self) -> Result<(), String> {
    if self.user_name.trim().is_empty() {
      return Err("Vui lòng nhập tên của bạn".to_string());
    }
    if self.question.trim().is_empty() {
      return Err("Vui lòng nhập câu hỏi".to_string());
    }
    if self.question.chars().count() > MAX_QUESTION_CHARS {
      return Err(format!("Câu hỏi không được vượt quá {} ký tự", MAX_QUESTION_CHARS));
    }
    Ok(())
  }
}

/// Payload broadcast on the like topic after a toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaLikeUpdate {
  pub id: Uuid,
  pub product_id: Uuid,
  pub likes_count: i32,
}
