//! In-memory store of signed-in sessions keyed by opaque token.

use crate::models::Role;
use crate::services::auth_service;
use crate::services::session_cart::DEFAULT_IDLE_TTL;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "DSV_SESSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub user_id: Uuid,
  pub username: String,
  pub role: Role,
}

#[derive(Debug)]
struct StoredSession {
  session: Session,
  last_seen: Instant,
}

/// Sessions expire after `idle_ttl` without a request; resolving one counts as activity.
#[derive(Debug)]
pub struct SessionStore {
  sessions: RwLock<HashMap<String, StoredSession>>,
  idle_ttl: Duration,
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::with_ttl(DEFAULT_IDLE_TTL)
  }
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_ttl(idle_ttl: Duration) -> Self {
    Self {
      sessions: RwLock::new(HashMap::new()),
      idle_ttl,
    }
  }

  /// Creates a session and returns its token.
  pub fn issue(&self, user_id: Uuid, username: &str, role: Role) -> String {
    let token = auth_service::generate_token();
    let stored = StoredSession {
      session: Session {
        user_id,
        username: username.to_string(),
        role,
      },
      last_seen: Instant::now(),
    };
    self.sessions.write().insert(token.clone(), stored);
    tracing::debug!(%user_id, "Session issued.");
    token
  }

  pub fn resolve(&self, token: &str) -> Option<Session> {
    let now = Instant::now();
    let mut sessions = self.sessions.write();
    if now.duration_since(sessions.get(token)?.last_seen) >= self.idle_ttl {
      sessions.remove(token);
      tracing::debug!("Expired session dropped.");
      return None;
    }
    let stored = sessions.get_mut(token)?;
    stored.last_seen = now;
    Some(stored.session.clone())
  }

  pub fn revoke(&self, token: &str) -> bool {
    self.sessions.write().remove(token).is_some()
  }

  /// Drops every session of a user, e.g. after their account is deleted.
  pub fn revoke_user(&self, user_id: Uuid) -> usize {
    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, s| s.session.user_id != user_id);
    before - sessions.len()
  }

  /// Drops every idle session; returns how many went.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, s| now.duration_since(s.last_seen) < self.idle_ttl);
    before - sessions.len()
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }
}
