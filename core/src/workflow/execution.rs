use crate::context::{Ctx, Handler};
use crate::control::{Control, Outcome};
use crate::error::FlowError;
use crate::stage::Stage;
use crate::workflow::definition::Workflow;
use tracing::{event, instrument, span, Instrument, Level};

/// What a single phase asked the run loop to do next.
enum PhaseResult<E> {
  Proceed,
  Halt,
  Failed(E),
}

async fn run_phase<T, E>(phase: &'static str, handlers: &[Handler<T, E>], ctx: &Ctx<T>) -> PhaseResult<E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  for (idx, handler) in handlers.iter().enumerate() {
    let outcome = handler(ctx.clone())
      .instrument(span!(Level::DEBUG, "workflow.handler", phase, handler_index = idx))
      .await;
    match outcome {
      Ok(Control::Continue) => {}
      Ok(Control::Halt) => {
        event!(Level::INFO, phase, handler_index = idx, "Workflow halted by handler.");
        return PhaseResult::Halt;
      }
      Err(e) => return PhaseResult::Failed(e),
    }
  }
  PhaseResult::Proceed
}

impl<T, E> Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every stage in order against `ctx`.
  ///
  /// Errors from optional stages are logged and the run moves on to the
  /// next stage; errors from required stages abort the run.
  #[instrument(
    name = "workflow.run",
    skip_all,
    fields(context = %std::any::type_name::<T>(), stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: Ctx<T>) -> Result<Outcome, E> {
    for (idx, stage) in self.stages.iter().enumerate() {
      let stage_span = span!(
        Level::INFO,
        "workflow.stage",
        stage = stage.name.as_str(),
        index = idx,
        optional = stage.optional
      );
      match self.run_stage(stage, &ctx).instrument(stage_span).await? {
        Outcome::Completed => {}
        Outcome::Halted => return Ok(Outcome::Halted),
      }
    }
    event!(Level::DEBUG, "Workflow completed.");
    Ok(Outcome::Completed)
  }

  async fn run_stage(&self, stage: &Stage<T>, ctx: &Ctx<T>) -> Result<Outcome, E> {
    if stage.should_skip(ctx) {
      event!(Level::DEBUG, "Stage skipped by predicate.");
      return Ok(Outcome::Completed);
    }

    let handlers = match self.handlers.get(&stage.name) {
      Some(h) if !h.is_empty() => h,
      _ if stage.optional => {
        event!(Level::DEBUG, "Optional stage has no handlers.");
        return Ok(Outcome::Completed);
      }
      _ => {
        event!(Level::ERROR, "Required stage has no handlers.");
        return Err(E::from(FlowError::HandlerMissing {
          stage: stage.name.clone(),
        }));
      }
    };

    for (phase, list) in [
      ("before", &handlers.before),
      ("on", &handlers.on),
      ("after", &handlers.after),
    ] {
      match run_phase(phase, list, ctx).await {
        PhaseResult::Proceed => {}
        PhaseResult::Halt => return Ok(Outcome::Halted),
        PhaseResult::Failed(e) if stage.optional => {
          event!(Level::WARN, phase, error = %e, "Optional stage failed; continuing.");
          return Ok(Outcome::Completed);
        }
        PhaseResult::Failed(e) => {
          event!(Level::ERROR, phase, error = %e, "Stage failed.");
          return Err(e);
        }
      }
    }
    Ok(Outcome::Completed)
  }
}
