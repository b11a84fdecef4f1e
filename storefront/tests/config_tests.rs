use dacsanviet::config::{AppConfig, LogFormat};
use dacsanviet::errors::AppError;
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: [&str; 10] = [
  "DATABASE_URL",
  "SERVER_PORT",
  "APP_BASE_URL",
  "SMTP_HOST",
  "SMTP_PORT",
  "SHIPPING_BASE_FEE",
  "FREE_SHIPPING_THRESHOLD",
  "SEED_DB",
  "SESSION_TTL_MINUTES",
  "LOG_FORMAT",
];

fn reset_env() {
  for var in VARS {
    env::remove_var(var);
  }
}

#[test]
#[serial]
fn database_url_is_required() {
  reset_env();
  let err = AppConfig::from_env().unwrap_err();
  assert!(matches!(err, AppError::Config(ref m) if m.contains("DATABASE_URL")));
}

#[test]
#[serial]
fn defaults_fill_everything_else() {
  reset_env();
  env::set_var("DATABASE_URL", "postgres://localhost/dacsanviet");

  let config = AppConfig::from_env().unwrap();
  assert_eq!(config.server_port, 8080);
  assert_eq!(config.app_base_url, "http://127.0.0.1:8080");
  assert_eq!(config.mail_to, "lienhe@dacsanviet.com");
  assert!(config.smtp.is_none());
  assert_eq!(config.shipping.free_shipping_threshold, 500_000);
  assert!(!config.seed_db);
  assert_eq!(config.session_idle_ttl, Duration::from_secs(30 * 60));
  assert_eq!(config.log_format, LogFormat::Pretty);
  assert!(!format!("{:?}", config).contains("postgres://"));
  reset_env();
}

#[test]
#[serial]
fn overrides_are_parsed() {
  reset_env();
  env::set_var("DATABASE_URL", "postgres://localhost/dacsanviet");
  env::set_var("SERVER_PORT", "9000");
  env::set_var("SMTP_HOST", "smtp.example.com");
  env::set_var("SHIPPING_BASE_FEE", "25000");
  env::set_var("SEED_DB", "true");
  env::set_var("LOG_FORMAT", "JSON");
  env::set_var("SESSION_TTL_MINUTES", "90");

  let config = AppConfig::from_env().unwrap();
  assert_eq!(config.app_base_url, "http://127.0.0.1:9000");
  let smtp = config.smtp.expect("smtp settings");
  assert_eq!(smtp.host, "smtp.example.com");
  assert_eq!(smtp.port, 587);
  assert_eq!(config.shipping.base_fee, 25_000);
  assert_eq!(config.shipping.per_kg_fee, 10_000);
  assert!(config.seed_db);
  assert_eq!(config.log_format, LogFormat::Json);
  assert_eq!(config.session_idle_ttl, Duration::from_secs(90 * 60));
  reset_env();
}

#[test]
#[serial]
fn malformed_values_are_config_errors() {
  reset_env();
  env::set_var("DATABASE_URL", "postgres://localhost/dacsanviet");
  env::set_var("SERVER_PORT", "eighty");
  assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));

  env::remove_var("SERVER_PORT");
  env::set_var("LOG_FORMAT", "xml");
  assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));

  env::remove_var("LOG_FORMAT");
  env::set_var("SESSION_TTL_MINUTES", "0");
  assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
  reset_env();
}
