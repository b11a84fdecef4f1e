use dacsanviet::config::{AppConfig, LogFormat};
use dacsanviet::services::mailer::{Mailer, OutboxMailer, SmtpMailer};
use dacsanviet::state::AppState;
use dacsanviet::{db, seed, web::configure_app_routes};

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env().context("loading configuration")?);
  init_tracing(app_config.log_format);
  tracing::info!("Starting Đặc Sản Việt storefront...");

  let db_pool = PgPoolOptions::new()
    .max_connections(app_config.database_max_connections)
    .connect(&app_config.database_url)
    .await
    .context("connecting to the database")?;
  tracing::info!("Connected to the database.");

  if app_config.run_migrations {
    db::run_migrations(&db_pool).await.context("running migrations")?;
    tracing::info!("Migrations applied.");
  }

  if app_config.seed_db {
    if db::users::count(&db_pool).await? == 0 {
      seed::seed_database(&db_pool).await?;
    } else {
      tracing::info!("Database already has users; skipping seed.");
    }
  }

  let mailer: Arc<dyn Mailer> = match &app_config.smtp {
    Some(settings) => Arc::new(SmtpMailer::new(settings, &app_config.mail_from)?),
    None => {
      tracing::warn!("SMTP_HOST is not set; emails go to the in-memory outbox.");
      Arc::new(OutboxMailer::new())
    }
  };

  let app_state = AppState::new(db_pool, app_config.clone(), mailer)?;
  tracing::info!(workflows = app_state.flows.len(), "Workflows registered.");
  app_state.spawn_expiry_sweep(Duration::from_secs(60));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!(%server_address, "Binding HTTP server.");

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;
  Ok(())
}
