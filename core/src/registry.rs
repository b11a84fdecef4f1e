//! Type-keyed workflow registry.

use crate::context::Ctx;
use crate::control::Outcome;
use crate::error::FlowError;
use crate::workflow::Workflow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync {
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, AppErr>;
}

struct TypedRunner<T, E, AppErr>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  workflow: Workflow<T, E>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, E, AppErr> ErasedRunner<AppErr> for TypedRunner<T, E, AppErr>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<E> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, AppErr> {
    let ctx = match ctx.downcast::<Ctx<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        return Err(AppErr::from(FlowError::TypeMismatch {
          expected: std::any::type_name::<Ctx<T>>().to_string(),
        }))
      }
    };
    self.workflow.run(ctx).await.map_err(AppErr::from)
  }
}

/// Holds one workflow per context type and dispatches runs to it.
pub struct Registry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `workflow` for its context type, replacing any previous one.
  pub fn register<T, E>(&self, workflow: Workflow<T, E>)
  where
    T: Send + Sync + 'static,
    E: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<E>,
  {
    event!(
      Level::DEBUG,
      context = %std::any::type_name::<T>(),
      stages = ?workflow.stage_names(),
      "Registering workflow."
    );
    let runner = TypedRunner::<T, E, AppErr> {
      workflow,
      _app_err: PhantomData,
    };
    self.runners.write().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.runners.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.runners.read().is_empty()
  }

  /// Runs the workflow registered for `T`.
  #[instrument(name = "registry.run", skip_all, fields(context = %std::any::type_name::<T>()))]
  pub async fn run<T: Send + Sync + 'static>(&self, ctx: Ctx<T>) -> Result<Outcome, AppErr> {
    let runner = self.runners.read().get(&TypeId::of::<T>()).cloned();
    let Some(runner) = runner else {
      event!(Level::ERROR, "No workflow registered.");
      return Err(AppErr::from(FlowError::Unregistered {
        context_type: std::any::type_name::<T>().to_string(),
      }));
    };
    runner.run_erased(Box::new(ctx)).await
  }
}
