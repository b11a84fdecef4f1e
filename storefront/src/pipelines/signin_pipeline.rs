use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use storeflow::{Control, Ctx, FlowResult, Registry, SkipIf, Workflow};
use std::sync::Arc;
use tracing::{info, warn};

const BAD_CREDENTIALS: &str = "Tên đăng nhập hoặc mật khẩu không đúng";

async fn lookup_user(ctx: Ctx<SigninCtxData>) -> AppResult<Control> {
  let (login, pool) = {
    let guard = ctx.read();
    (guard.login.trim().to_string(), guard.app_state.db_pool.clone())
  };
  if login.is_empty() {
    return Err(AppError::Validation("Vui lòng nhập tên đăng nhập hoặc email".to_string()));
  }
  let Some(user) = db::users::find_by_login(&pool, &login).await? else {
    warn!("Signin for unknown login.");
    return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
  };
  if !user.is_active {
    warn!(user_id = %user.id, "Signin for disabled account.");
    return Err(AppError::Auth("Tài khoản đã bị khóa".to_string()));
  }
  ctx.write().user = Some(user);
  Ok(Control::Continue)
}

async fn verify_credentials(ctx: Ctx<SigninCtxData>) -> AppResult<Control> {
  let verified = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("User not loaded before password check".to_string()))?;
    auth_service::verify_password(&user.password_hash, &guard.password)?
  };
  if !verified {
    warn!("Signin with wrong password.");
    return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
  }
  Ok(Control::Continue)
}

async fn issue_session(ctx: Ctx<SigninCtxData>) -> AppResult<Control> {
  let (user, sessions) = {
    let guard = ctx.read();
    (guard.user.clone(), guard.app_state.sessions.clone())
  };
  let user = user.ok_or_else(|| AppError::Internal("User not loaded before session issue".to_string()))?;
  let token = sessions.issue(user.id, &user.username, user.role);
  ctx.write().session_token = Some(token);
  info!(user_id = %user.id, "User signed in.");
  Ok(Control::Continue)
}

async fn merge_guest_cart(ctx: Ctx<SigninCtxData>) -> AppResult<Control> {
  let (key, user_id, app_state) = {
    let guard = ctx.read();
    (guard.guest_cart_key.clone(), guard.user.as_ref().map(|u| u.id), guard.app_state.clone())
  };
  let (Some(key), Some(user_id)) = (key, user_id) else {
    return Ok(Control::Continue);
  };
  let guest_cart = app_state.guest_carts.take(&key);
  let (merged, skipped) = common_steps::merge_guest_cart(&app_state.db_pool, user_id, &guest_cart).await;
  info!(%user_id, merged, skipped, "Guest cart merged.");
  {
    let mut guard = ctx.write();
    guard.merged_items = merged;
    guard.skipped_items = skipped;
  }
  Ok(Control::Continue)
}

pub fn build_signin_workflow() -> FlowResult<Workflow<SigninCtxData, AppError>> {
  let no_guest_cart: SkipIf<SigninCtxData> = Arc::new(|ctx: Ctx<SigninCtxData>| ctx.read().guest_cart_key.is_none());
  let mut wf = Workflow::<SigninCtxData, AppError>::new(&[
    ("lookup_user", false, None),
    ("verify_credentials", false, None),
    ("issue_session", false, None),
    ("merge_guest_cart", true, Some(no_guest_cart)),
  ]);
  wf.on("lookup_user", lookup_user)?;
  wf.on("verify_credentials", verify_credentials)?;
  wf.on("issue_session", issue_session)?;
  wf.on("merge_guest_cart", merge_guest_cart)?;
  Ok(wf)
}

pub fn register_signin_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_signin_workflow()?);
  Ok(())
}
