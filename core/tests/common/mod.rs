// Shared fixtures for the storeflow integration tests.
#![allow(dead_code)]

use once_cell::sync::Lazy;
use storeflow::{Control, Ctx, FlowError, Handler};
use tracing::Level;

/// Loosely modelled on a checkout: a running total plus a trail of visited handlers.
#[derive(Clone, Debug, Default)]
pub struct OrderDraft {
  pub total: i64,
  pub trail: Vec<String>,
  pub halt_at: Option<String>,
  pub email_sent: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow: {0}")]
  Flow(String),

  #[error("handler: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Adds `amount` to the draft total and records `name`; halts if `halt_at` matches.
pub fn add_amount(name: &'static str, amount: i64) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Ctx<OrderDraft>| {
    Box::pin(async move {
      let mut draft = ctx.write();
      draft.total += amount;
      draft.trail.push(name.to_string());
      tracing::debug!(target: "test_handlers", handler = name, total = draft.total);
      if draft.halt_at.as_deref() == Some(name) {
        return Ok(Control::Halt);
      }
      Ok(Control::Continue)
    })
  })
}

pub fn fail_with(name: &'static str, message: &'static str) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Ctx<OrderDraft>| {
    Box::pin(async move {
      ctx.write().trail.push(name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}
