use crate::context::{Ctx, Handler};
use crate::control::Control;
use crate::error::{FlowError, FlowResult};
use crate::workflow::definition::Workflow;
use std::future::Future;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<T, E> Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn attach<F, HErr>(
    &mut self,
    phase: Phase,
    stage: &str,
    handler_fn: impl Fn(Ctx<T>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.position(stage)?;
    let handler: Handler<T, E> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let slot = self.handlers.entry(stage.to_string()).or_default();
    match phase {
      Phase::Before => slot.before.push(handler),
      Phase::On => slot.on.push(handler),
      Phase::After => slot.after.push(handler),
    }
    event!(Level::TRACE, %stage, ?phase, "Handler attached.");
    Ok(())
  }

  /// Runs ahead of the stage's main handlers (guards, preloading).
  pub fn before<F, HErr>(
    &mut self,
    stage: &str,
    handler_fn: impl Fn(Ctx<T>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.attach(Phase::Before, stage, handler_fn)
  }

  pub fn on<F, HErr>(&mut self, stage: &str, handler_fn: impl Fn(Ctx<T>) -> F + Send + Sync + 'static) -> FlowResult<()>
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.attach(Phase::On, stage, handler_fn)
  }

  pub fn after<F, HErr>(
    &mut self,
    stage: &str,
    handler_fn: impl Fn(Ctx<T>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.attach(Phase::After, stage, handler_fn)
  }

  /// Number of handlers attached to `stage` across all phases.
  pub fn handler_count(&self, stage: &str) -> usize {
    self.handlers.get(stage).map_or(0, |h| h.len())
  }
}
