//! Multi-step business operations, expressed as `storeflow` workflows.
//!
//! Each workflow owns a context type from [`contexts`]; handlers build the
//! context, hand it to `AppState::flows` and read the results back out.

use crate::errors::AppError;
use storeflow::{FlowResult, Registry};

pub mod common_steps;
pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod order_pipeline;
pub mod password_reset_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every workflow with `registry`. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  tracing::info!("Registering workflows...");

  signup_pipeline::register_signup_pipeline(registry)?;
  signin_pipeline::register_signin_pipeline(registry)?;
  cart_pipeline::register_add_to_cart_pipeline(registry)?;
  checkout_pipeline::register_checkout_pipeline(registry)?;
  order_pipeline::register_order_pipelines(registry)?;
  password_reset_pipeline::register_password_reset_pipelines(registry)?;

  tracing::info!(workflows = registry.len(), "All workflows registered.");
  Ok(())
}
