use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::mailer::Mailer;
use crate::services::notifications::Notifier;
use crate::services::qa_hub::QaHub;
use crate::services::session_cart::GuestCartStore;
use crate::services::sessions::SessionStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use storeflow::Registry;

/// Everything a request handler or workflow stage needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub notifier: Notifier,
  pub sessions: Arc<SessionStore>,
  pub guest_carts: Arc<GuestCartStore>,
  pub qa_hub: QaHub,
}

impl AppState {
  /// Builds the shared state and registers every workflow.
  pub fn new(db_pool: PgPool, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Result<Self> {
    let notifier = Notifier::new(mailer, config.frontend_url.clone(), config.mail_to.clone());
    let flows = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&flows)?;
    let idle_ttl = config.session_idle_ttl;
    Ok(Self {
      db_pool,
      flows,
      config,
      notifier,
      sessions: Arc::new(SessionStore::with_ttl(idle_ttl)),
      guest_carts: Arc::new(GuestCartStore::with_ttl(idle_ttl)),
      qa_hub: QaHub::default(),
    })
  }

  /// Periodically drops idle sessions and guest carts. Must be called inside the actix runtime.
  pub fn spawn_expiry_sweep(&self, every: Duration) {
    let sessions = self.sessions.clone();
    let guest_carts = self.guest_carts.clone();
    actix_rt::spawn(async move {
      let mut ticker = actix_rt::time::interval(every);
      loop {
        ticker.tick().await;
        let expired_sessions = sessions.purge_expired();
        let expired_carts = guest_carts.purge_expired();
        if expired_sessions + expired_carts > 0 {
          tracing::debug!(expired_sessions, expired_carts, "Idle sessions and carts swept.");
        }
      }
    });
  }
}
