use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
  pub host: String,
  pub port: u16,
  pub username: Option<String>,
  pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingRates {
  pub base_fee: i64,
  pub per_kg_fee: i64,
  pub free_shipping_threshold: i64,
}

impl Default for ShippingRates {
  fn default() -> Self {
    Self {
      base_fee: 30_000,
      per_kg_fee: 10_000,
      free_shipping_threshold: 500_000,
    }
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub app_base_url: String,
  pub frontend_url: String,

  pub mail_from: String,
  /// Shop inbox receiving consultation requests.
  pub mail_to: String,
  pub smtp: Option<SmtpSettings>,

  pub shipping: ShippingRates,

  /// Idle timeout for sign-in sessions and guest carts.
  pub session_idle_ttl: Duration,

  pub run_migrations: bool,
  pub seed_db: bool,
  pub log_format: LogFormat,
}

// Hand-written so the database URL and SMTP password never reach the logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("database_max_connections", &self.database_max_connections)
      .field("app_base_url", &self.app_base_url)
      .field("frontend_url", &self.frontend_url)
      .field("mail_from", &self.mail_from)
      .field("mail_to", &self.mail_to)
      .field("smtp_host", &self.smtp.as_ref().map(|s| s.host.as_str()))
      .field("shipping", &self.shipping)
      .field("session_idle_ttl", &self.session_idle_ttl)
      .field("run_migrations", &self.run_migrations)
      .field("seed_db", &self.seed_db)
      .field("log_format", &self.log_format)
      .finish()
  }
}

fn parse_var<T>(name: &str, raw: String) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_or = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", get_or("SERVER_PORT", "8080"))?;
    let database_url = get_env("DATABASE_URL")?;
    let database_max_connections = parse_var::<u32>("DATABASE_MAX_CONNECTIONS", get_or("DATABASE_MAX_CONNECTIONS", "10"))?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let frontend_url = get_env("FRONTEND_URL").unwrap_or_else(|_| app_base_url.clone());

    let mail_from = get_or("MAIL_FROM", "noreply@dacsanviet.com");
    let mail_to = get_or("MAIL_TO", "lienhe@dacsanviet.com");
    let smtp = match get_env("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()) {
      Some(host) => Some(SmtpSettings {
        host,
        port: parse_var::<u16>("SMTP_PORT", get_or("SMTP_PORT", "587"))?,
        username: get_env("SMTP_USERNAME").ok(),
        password: get_env("SMTP_PASSWORD").ok(),
      }),
      None => None,
    };

    let defaults = ShippingRates::default();
    let shipping = ShippingRates {
      base_fee: parse_var("SHIPPING_BASE_FEE", get_or("SHIPPING_BASE_FEE", &defaults.base_fee.to_string()))?,
      per_kg_fee: parse_var("SHIPPING_PER_KG_FEE", get_or("SHIPPING_PER_KG_FEE", &defaults.per_kg_fee.to_string()))?,
      free_shipping_threshold: parse_var(
        "FREE_SHIPPING_THRESHOLD",
        get_or("FREE_SHIPPING_THRESHOLD", &defaults.free_shipping_threshold.to_string()),
      )?,
    };

    let session_minutes = parse_var::<u64>("SESSION_TTL_MINUTES", get_or("SESSION_TTL_MINUTES", "30"))?;
    if session_minutes == 0 {
      return Err(AppError::Config("SESSION_TTL_MINUTES must be at least 1".to_string()));
    }
    let session_idle_ttl = Duration::from_secs(session_minutes * 60);

    let run_migrations = parse_var::<bool>("RUN_MIGRATIONS", get_or("RUN_MIGRATIONS", "true"))?;
    let seed_db = parse_var::<bool>("SEED_DB", get_or("SEED_DB", "false"))?;
    let log_format = match get_or("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "pretty" | "" => LogFormat::Pretty,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    let config = Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      app_base_url,
      frontend_url,
      mail_from,
      mail_to,
      smtp,
      shipping,
      session_idle_ttl,
      run_migrations,
      seed_db,
      log_format,
    };
    tracing::info!(config = ?config, "Application configuration loaded.");
    Ok(config)
  }

  /// Configuration for tests and local tooling; nothing is read from the environment.
  pub fn for_tests(database_url: &str) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: database_url.to_string(),
      database_max_connections: 1,
      app_base_url: "http://127.0.0.1:8080".to_string(),
      frontend_url: "http://127.0.0.1:8080".to_string(),
      mail_from: "noreply@dacsanviet.com".to_string(),
      mail_to: "lienhe@dacsanviet.com".to_string(),
      smtp: None,
      shipping: ShippingRates::default(),
      session_idle_ttl: Duration::from_secs(30 * 60),
      run_migrations: false,
      seed_db: false,
      log_format: LogFormat::Pretty,
    }
  }
}
