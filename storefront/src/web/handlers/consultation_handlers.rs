use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::errors::AppError;
use crate::services::email_templates::ConsultationDetails;
use crate::services::validation;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ConsultationPayload {
  pub name: String,
  pub phone: String,
  pub email: String,
  pub interest: Option<String>,
  pub message: Option<String>,
}

impl ConsultationPayload {
  pub fn validate(&self) -> Result<(), AppError> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("Vui lòng nhập họ tên".to_string()));
    }
    if !validation::is_valid_phone(&self.phone) {
      return Err(AppError::Validation("Số điện thoại không hợp lệ (10-11 chữ số)".to_string()));
    }
    if !validation::is_valid_email(&self.email) {
      return Err(AppError::Validation("Email không hợp lệ".to_string()));
    }
    Ok(())
  }
}

/// Forwards a consultation request to the shop inbox.
#[instrument(name = "handler::consultation", skip(app_state, payload), fields(interest = ?payload.interest))]
pub async fn consultation_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ConsultationPayload>,
) -> Result<HttpResponse, AppError> {
  payload.validate()?;
  let details = ConsultationDetails {
    name: payload.name.trim(),
    phone: payload.phone.trim(),
    email: payload.email.trim(),
    interest: payload.interest.as_deref(),
    message: payload.message.as_deref(),
  };
  match app_state.notifier.consultation(&details).await {
    Ok(()) => {
      info!("Consultation request forwarded.");
      Ok(HttpResponse::Ok().json(json!({
        "message": "Cảm ơn bạn! Chúng tôi sẽ liên hệ tư vấn trong vòng 24h.",
      })))
    }
    Err(e) => {
      error!(error = %e, "Consultation email failed.");
      Ok(HttpResponse::InternalServerError().json(json!({ "error": "Có lỗi xảy ra!" })))
    }
  }
}

pub async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}
