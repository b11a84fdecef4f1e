use crate::db;
use crate::db::users::NewUser;
use crate::errors::{AppError, Result as AppResult};
use crate::models::Role;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::{auth_service, validation};
use storeflow::{Control, Ctx, FlowResult, Registry, Workflow};
use tracing::{event, info, warn, Level};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Checks the sign-up form fields.
pub fn validate_signup_fields(username: &str, email: &str, password: &str) -> AppResult<()> {
  let username_len = username.trim().chars().count();
  if !(3..=50).contains(&username_len) {
    return Err(AppError::Validation("Tên đăng nhập phải từ 3 đến 50 ký tự".to_string()));
  }
  if !validation::is_valid_email(email) {
    return Err(AppError::Validation("Email không hợp lệ".to_string()));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Mật khẩu phải có ít nhất {} ký tự",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

async fn validate_signup_input(ctx: Ctx<SignupCtxData>) -> AppResult<Control> {
  let (username, email, password) = {
    let guard = ctx.read();
    (guard.username.clone(), guard.email.clone(), guard.password.clone())
  };
  validate_signup_fields(&username, &email, &password)?;
  event!(Level::DEBUG, %username, "Signup input validated.");
  Ok(Control::Continue)
}

async fn check_existing_user(ctx: Ctx<SignupCtxData>) -> AppResult<Control> {
  let (username, email, pool) = {
    let guard = ctx.read();
    (guard.username.trim().to_string(), guard.email.trim().to_string(), guard.app_state.db_pool.clone())
  };
  if db::users::username_exists(&pool, &username).await? {
    warn!(%username, "Signup with taken username.");
    return Err(AppError::Conflict("Tên đăng nhập đã tồn tại".to_string()));
  }
  if db::users::email_exists(&pool, &email).await? {
    warn!("Signup with taken email.");
    return Err(AppError::Conflict("Email đã tồn tại".to_string()));
  }
  Ok(Control::Continue)
}

async fn create_user(ctx: Ctx<SignupCtxData>) -> AppResult<Control> {
  let (new_user, pool) = {
    let guard = ctx.read();
    let new_user = NewUser {
      username: guard.username.trim().to_string(),
      email: guard.email.trim().to_string(),
      password_hash: auth_service::hash_password(&guard.password)?,
      full_name: validation::non_blank(guard.full_name.as_deref()),
      phone_number: validation::non_blank(guard.phone_number.as_deref()),
      role: Role::User,
    };
    (new_user, guard.app_state.db_pool.clone())
  };
  let user = db::users::insert(&pool, &new_user).await?;
  info!(user_id = %user.id, username = %user.username, "User created.");
  ctx.write().created_user = Some(user);
  Ok(Control::Continue)
}

async fn send_welcome_email(ctx: Ctx<SignupCtxData>) -> AppResult<Control> {
  let (user, notifier) = {
    let guard = ctx.read();
    (guard.created_user.clone(), guard.app_state.notifier.clone())
  };
  let Some(user) = user else {
    warn!("No user in context; welcome email skipped.");
    return Ok(Control::Continue);
  };
  notifier.welcome(&user.email, user.display_name()).await?;
  ctx.write().welcome_email_sent = true;
  Ok(Control::Continue)
}

pub fn build_signup_workflow() -> FlowResult<Workflow<SignupCtxData, AppError>> {
  let mut wf = Workflow::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
    ("send_welcome_email", true, None),
  ]);
  wf.on("validate_signup_input", validate_signup_input)?;
  wf.on("check_existing_user", check_existing_user)?;
  wf.on("create_user", create_user)?;
  wf.on("send_welcome_email", send_welcome_email)?;
  Ok(wf)
}

pub fn register_signup_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_signup_workflow()?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signup_field_rules() {
    assert!(validate_signup_fields("lan", "lan@example.com", "secret").is_ok());
    assert!(validate_signup_fields("la", "lan@example.com", "secret").is_err());
    assert!(validate_signup_fields(&"x".repeat(51), "lan@example.com", "secret").is_err());
    assert!(validate_signup_fields("lan", "lan@", "secret").is_err());
    assert!(validate_signup_fields("lan", "lan@example.com", "12345").is_err());
  }

  #[test]
  fn workflow_stages_in_order() {
    let wf = build_signup_workflow().unwrap();
    assert_eq!(
      wf.stage_names(),
      vec!["validate_signup_input", "check_existing_user", "create_user", "send_welcome_email"]
    );
    assert!(wf.stage("send_welcome_email").unwrap().optional);
  }
}
