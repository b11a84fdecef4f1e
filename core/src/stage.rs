use crate::context::Ctx;
use std::sync::Arc;

/// Predicate evaluated right before a stage runs; `true` skips the stage.
pub type SkipIf<T> = Arc<dyn Fn(Ctx<T>) -> bool + Send + Sync + 'static>;

/// A named stage of a [`crate::Workflow`].
///
/// Optional stages are best effort: a missing handler set is tolerated and a
/// handler error is logged instead of aborting the run.
#[derive(Clone)]
pub struct Stage<T: Send + Sync + 'static> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: Send + Sync + 'static> Stage<T> {
  pub fn new(name: impl Into<String>, optional: bool, skip_if: Option<SkipIf<T>>) -> Self {
    Self {
      name: name.into(),
      optional,
      skip_if,
    }
  }

  pub(crate) fn should_skip(&self, ctx: &Ctx<T>) -> bool {
    self.skip_if.as_ref().is_some_and(|pred| pred(ctx.clone()))
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Stage<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Stage")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
