//! Request extractors for sessions, roles and the guest cart cookie.

use crate::errors::AppError;
use crate::models::Role;
use crate::services::auth_service;
use crate::services::session_cart::CART_COOKIE;
use crate::services::sessions::SESSION_COOKIE;
use crate::state::AppState;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

const LOGIN_REQUIRED: &str = "Vui lòng đăng nhập";

/// Session token from `Authorization: Bearer …`, falling back to the session cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty());
  bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
  let mut cookie = session_cookie("");
  cookie.make_removal();
  cookie
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub username: String,
  pub role: Role,
  pub token: String,
}

fn resolve_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state missing".to_string()))?;
  let token = session_token(req).ok_or_else(|| AppError::Auth(LOGIN_REQUIRED.to_string()))?;
  let session = state.sessions.resolve(&token).ok_or_else(|| {
    warn!("Request with unknown or revoked session token.");
    AppError::Auth(LOGIN_REQUIRED.to_string())
  })?;
  Ok(AuthenticatedUser {
    user_id: session.user_id,
    username: session.username,
    role: session.role,
    token,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve_user(req))
  }
}

/// The signed-in user when there is one; never rejects the request.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl FromRequest for OptionalUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(OptionalUser(resolve_user(req).ok())))
  }
}

/// STAFF or ADMIN.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthenticatedUser);

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve_user(req).and_then(|user| {
      if user.role.is_staff() {
        Ok(StaffUser(user))
      } else {
        warn!(user_id = %user.user_id, "Back-office access denied.");
        Err(AppError::Forbidden("Bạn không có quyền truy cập".to_string()))
      }
    }))
  }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve_user(req).and_then(|user| {
      if user.role == Role::Admin {
        Ok(AdminUser(user))
      } else {
        warn!(user_id = %user.user_id, "Admin-only action denied.");
        Err(AppError::Forbidden("Chỉ quản trị viên mới được thực hiện thao tác này".to_string()))
      }
    }))
  }
}

/// Key of the guest cart. A fresh key is minted when the browser has none yet.
#[derive(Debug, Clone)]
pub struct GuestCartKey {
  pub key: String,
  pub is_new: bool,
}

impl GuestCartKey {
  /// Cookie to attach to the response when the key was just minted.
  pub fn cookie(&self) -> Option<Cookie<'static>> {
    self.is_new.then(|| {
      Cookie::build(CART_COOKIE, self.key.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
    })
  }
}

impl FromRequest for GuestCartKey {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let key = match req.cookie(CART_COOKIE).map(|c| c.value().to_string()).filter(|v| !v.is_empty()) {
      Some(key) => GuestCartKey { key, is_new: false },
      None => GuestCartKey {
        key: auth_service::generate_token(),
        is_new: true,
      },
    };
    ready(Ok(key))
  }
}
