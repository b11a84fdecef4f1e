use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storeflow::{Ctx, Outcome};
use tracing::{info, instrument, warn};

use crate::db;
use crate::errors::AppError;
use crate::pipelines::contexts::{PasswordResetConfirmCtxData, PasswordResetRequestCtxData, SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::services::session_cart::CART_COOKIE;
use crate::state::AppState;
use crate::web::extractors::{self, AuthenticatedUser};

const FORGOT_PASSWORD_LEN: usize = 8;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequestPayload {
  pub username: String,
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequestPayload {
  /// Username or email.
  #[serde(alias = "username", alias = "email")]
  pub login: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct EmailQuery {
  pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetRequestPayload {
  pub email: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmPayload {
  pub token: String,
  pub new_password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = Ctx::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    username: payload.username,
    email: payload.email,
    password: payload.password,
    full_name: payload.full_name,
    phone_number: payload.phone_number,
    created_user: None,
    welcome_email_sent: false,
  });

  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => {
      let guard = ctx.read();
      let user = guard
        .created_user
        .clone()
        .ok_or_else(|| AppError::Internal("Signup completed without a user".to_string()))?;
      info!(user_id = %user.id, welcome_email_sent = guard.welcome_email_sent, "Signup successful.");
      Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Đăng ký thành công",
        "user": user,
        "welcomeEmailSent": guard.welcome_email_sent,
      })))
    }
    Outcome::Halted => Err(AppError::PipelineHalted("Đăng ký bị gián đoạn".to_string())),
  }
}

#[instrument(name = "handler::signin", skip(app_state, req, req_payload), fields(login = %req_payload.login))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let guest_cart_key = req.cookie(CART_COOKIE).map(|c| c.value().to_string());
  let ctx = Ctx::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    login: payload.login,
    password: payload.password,
    guest_cart_key,
    user: None,
    session_token: None,
    merged_items: 0,
    skipped_items: 0,
  });

  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => {
      let guard = ctx.read();
      let (Some(user), Some(token)) = (guard.user.clone(), guard.session_token.clone()) else {
        warn!("Signin completed without user or token.");
        return Err(AppError::Auth("Đăng nhập thất bại".to_string()));
      };
      Ok(HttpResponse::Ok().cookie(extractors::session_cookie(&token)).json(json!({
        "success": true,
        "message": "Đăng nhập thành công",
        "token": token,
        "user": user,
        "roleName": user.role.display_name(),
        "mergedCartItems": guard.merged_items,
      })))
    }
    Outcome::Halted => Err(AppError::Auth("Đăng nhập thất bại".to_string())),
  }
}

#[instrument(name = "handler::signout", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn signout_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  app_state.sessions.revoke(&user.token);
  Ok(HttpResponse::Ok().cookie(extractors::expired_session_cookie()).json(json!({
    "success": true,
    "message": "Đăng xuất thành công",
  })))
}

#[instrument(name = "handler::me", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn me_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let account = db::users::find_by_id(&app_state.db_pool, user.user_id)
    .await?
    .ok_or_else(|| AppError::Auth("Vui lòng đăng nhập".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "user": account,
    "roleName": account.role.display_name(),
  })))
}

/// Issues a random password and emails it.
#[instrument(name = "handler::forgot_password", skip(app_state, query))]
pub async fn forgot_password_handler(
  app_state: web::Data<AppState>,
  query: web::Query<EmailQuery>,
) -> Result<HttpResponse, AppError> {
  let Some(user) = db::users::find_by_login(&app_state.db_pool, query.email.trim()).await? else {
    return Ok(HttpResponse::Ok().json(json!({
      "success": false,
      "message": "Tài khoản hoặc Email không tồn tại!",
    })));
  };

  let new_password = auth_service::generate_random_password(FORGOT_PASSWORD_LEN);
  let hash = auth_service::hash_password(&new_password)?;
  db::users::update_password(&app_state.db_pool, user.id, &hash).await?;
  app_state.sessions.revoke_user(user.id);

  if let Err(e) = app_state
    .notifier
    .new_password(&user.email, user.display_name(), &new_password)
    .await
  {
    warn!(user_id = %user.id, error = %e, "Password was reset but the email failed.");
    return Ok(HttpResponse::Ok().json(json!({
      "success": false,
      "message": "Mật khẩu đã reset nhưng không thể gửi email. Hãy liên hệ hỗ trợ.",
    })));
  }
  info!(user_id = %user.id, "Forgot-password email sent.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Mật khẩu mới đã được gửi về email của bạn!",
  })))
}

/// Always answers 200 so the response does not reveal which emails are registered.
#[instrument(name = "handler::password_reset_request", skip(app_state, req_payload))]
pub async fn password_reset_request_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ResetRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = Ctx::new(PasswordResetRequestCtxData {
    app_state: app_state.get_ref().clone(),
    email: req_payload.into_inner().email,
    user: None,
    token: None,
    email_sent: false,
  });
  match app_state.flows.run(ctx).await {
    Ok(_) => {}
    Err(AppError::Validation(msg)) => return Err(AppError::Validation(msg)),
    Err(e) => warn!(error = %e, "Password reset request failed."),
  }
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Nếu email tồn tại trong hệ thống, bạn sẽ nhận được hướng dẫn đặt lại mật khẩu.",
  })))
}

#[instrument(name = "handler::password_reset_confirm", skip(app_state, req_payload))]
pub async fn password_reset_confirm_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ResetConfirmPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = Ctx::new(PasswordResetConfirmCtxData {
    app_state: app_state.get_ref().clone(),
    token: payload.token,
    new_password: payload.new_password,
    reset: None,
    user: None,
    confirmation_sent: false,
  });
  match app_state.flows.run(ctx).await? {
    Outcome::Completed => Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": "Mật khẩu đã được đặt lại thành công",
    }))),
    Outcome::Halted => Err(AppError::Validation(
      "Liên kết đặt lại mật khẩu không hợp lệ hoặc đã hết hạn".to_string(),
    )),
  }
}
