//! Token-based password reset: request a link, then confirm with a new password.

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::password_reset::RESET_TOKEN_TTL_MINUTES;
use crate::pipelines::contexts::{PasswordResetConfirmCtxData, PasswordResetRequestCtxData};
use crate::pipelines::signup_pipeline::MIN_PASSWORD_LEN;
use crate::services::auth_service;
use chrono::{Duration, Utc};
use storeflow::{Control, Ctx, FlowResult, Registry, Workflow};
use tracing::{info, warn};

const INVALID_TOKEN: &str = "Liên kết đặt lại mật khẩu không hợp lệ hoặc đã hết hạn";

// --- Request ---

/// Unknown emails halt quietly so the caller cannot tell which accounts exist.
async fn find_account(ctx: Ctx<PasswordResetRequestCtxData>) -> AppResult<Control> {
  let (email, pool) = {
    let guard = ctx.read();
    (guard.email.trim().to_string(), guard.app_state.db_pool.clone())
  };
  if email.is_empty() {
    return Err(AppError::Validation("Vui lòng nhập email".to_string()));
  }
  match db::users::find_by_email(&pool, &email).await? {
    Some(user) if user.is_active => {
      ctx.write().user = Some(user);
      Ok(Control::Continue)
    }
    _ => {
      warn!("Password reset requested for unknown or inactive account.");
      Ok(Control::Halt)
    }
  }
}

async fn create_reset_token(ctx: Ctx<PasswordResetRequestCtxData>) -> AppResult<Control> {
  let (user_id, pool) = {
    let guard = ctx.read();
    let user_id = guard
      .user
      .as_ref()
      .map(|u| u.id)
      .ok_or_else(|| AppError::Internal("User not loaded before token creation".to_string()))?;
    (user_id, guard.app_state.db_pool.clone())
  };
  let token = auth_service::generate_token();
  let expiry = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
  db::password_resets::insert(&pool, user_id, &token, expiry).await?;
  info!(%user_id, "Password reset token created.");
  ctx.write().token = Some(token);
  Ok(Control::Continue)
}

async fn send_reset_link(ctx: Ctx<PasswordResetRequestCtxData>) -> AppResult<Control> {
  let (email, token, notifier) = {
    let guard = ctx.read();
    (
      guard.user.as_ref().map(|u| u.email.clone()),
      guard.token.clone(),
      guard.app_state.notifier.clone(),
    )
  };
  if let (Some(email), Some(token)) = (email, token) {
    notifier.password_reset_link(&email, &token).await?;
    ctx.write().email_sent = true;
  }
  Ok(Control::Continue)
}

pub fn build_reset_request_workflow() -> FlowResult<Workflow<PasswordResetRequestCtxData, AppError>> {
  let mut wf = Workflow::<PasswordResetRequestCtxData, AppError>::new(&[
    ("find_account", false, None),
    ("create_reset_token", false, None),
    ("send_reset_link", true, None),
  ]);
  wf.on("find_account", find_account)?;
  wf.on("create_reset_token", create_reset_token)?;
  wf.on("send_reset_link", send_reset_link)?;
  Ok(wf)
}

// --- Confirm ---

async fn validate_reset_token(ctx: Ctx<PasswordResetConfirmCtxData>) -> AppResult<Control> {
  let (token, new_password, pool) = {
    let guard = ctx.read();
    (guard.token.trim().to_string(), guard.new_password.clone(), guard.app_state.db_pool.clone())
  };
  if new_password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Mật khẩu phải có ít nhất {} ký tự",
      MIN_PASSWORD_LEN
    )));
  }
  let reset = db::password_resets::find_by_token(&pool, &token)
    .await?
    .filter(|r| r.is_valid(Utc::now()))
    .ok_or_else(|| AppError::Validation(INVALID_TOKEN.to_string()))?;
  let user = db::users::find_by_id(&pool, reset.user_id)
    .await?
    .ok_or_else(|| AppError::Validation(INVALID_TOKEN.to_string()))?;
  {
    let mut guard = ctx.write();
    guard.reset = Some(reset);
    guard.user = Some(user);
  }
  Ok(Control::Continue)
}

async fn update_password(ctx: Ctx<PasswordResetConfirmCtxData>) -> AppResult<Control> {
  let (reset_id, user_id, password_hash, app_state) = {
    let guard = ctx.read();
    let (Some(reset), Some(user)) = (guard.reset.as_ref(), guard.user.as_ref()) else {
      return Err(AppError::Internal("Reset token not validated".to_string()));
    };
    (reset.id, user.id, auth_service::hash_password(&guard.new_password)?, guard.app_state.clone())
  };
  let mut tx = app_state.db_pool.begin().await?;
  if !db::password_resets::claim(&mut *tx, reset_id).await? {
    return Err(AppError::Validation(INVALID_TOKEN.to_string()));
  }
  db::users::update_password(&mut *tx, user_id, &password_hash).await?;
  tx.commit().await?;
  let revoked = app_state.sessions.revoke_user(user_id);
  info!(%user_id, revoked, "Password reset completed.");
  Ok(Control::Continue)
}

async fn send_reset_confirmation(ctx: Ctx<PasswordResetConfirmCtxData>) -> AppResult<Control> {
  let (email, notifier) = {
    let guard = ctx.read();
    (guard.user.as_ref().map(|u| u.email.clone()), guard.app_state.notifier.clone())
  };
  if let Some(email) = email {
    notifier.password_reset_confirmation(&email).await?;
    ctx.write().confirmation_sent = true;
  }
  Ok(Control::Continue)
}

pub fn build_reset_confirm_workflow() -> FlowResult<Workflow<PasswordResetConfirmCtxData, AppError>> {
  let mut wf = Workflow::<PasswordResetConfirmCtxData, AppError>::new(&[
    ("validate_reset_token", false, None),
    ("update_password", false, None),
    ("send_reset_confirmation", true, None),
  ]);
  wf.on("validate_reset_token", validate_reset_token)?;
  wf.on("update_password", update_password)?;
  wf.on("send_reset_confirmation", send_reset_confirmation)?;
  Ok(wf)
}

pub fn register_password_reset_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_reset_request_workflow()?);
  registry.register(build_reset_confirm_workflow()?);
  Ok(())
}
