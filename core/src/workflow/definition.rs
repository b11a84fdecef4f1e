use crate::context::Handler;
use crate::error::{FlowError, FlowResult};
use crate::stage::{SkipIf, Stage};
use std::collections::HashMap;

/// Handlers attached to one stage, grouped by phase.
pub(crate) struct StageHandlers<T: Send + Sync + 'static, E> {
  pub(crate) before: Vec<Handler<T, E>>,
  pub(crate) on: Vec<Handler<T, E>>,
  pub(crate) after: Vec<Handler<T, E>>,
}

impl<T: Send + Sync + 'static, E> Default for StageHandlers<T, E> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<T: Send + Sync + 'static, E> StageHandlers<T, E> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }

  pub(crate) fn len(&self) -> usize {
    self.before.len() + self.on.len() + self.after.len()
  }
}

/// An ordered set of stages over the context type `T`, whose handlers fail with `E`.
pub struct Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) stages: Vec<Stage<T>>,
  pub(crate) handlers: HashMap<String, StageHandlers<T, E>>,
}

impl<T, E> Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a workflow from `(name, optional, skip_if)` tuples, in execution order.
  pub fn new(stages: &[(&str, bool, Option<SkipIf<T>>)]) -> Self {
    Self {
      stages: stages
        .iter()
        .map(|(name, optional, skip_if)| Stage::new(*name, *optional, skip_if.clone()))
        .collect(),
      handlers: HashMap::new(),
    }
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn stage(&self, name: &str) -> Option<&Stage<T>> {
    self.stages.iter().find(|s| s.name == name)
  }

  pub(crate) fn position(&self, name: &str) -> FlowResult<usize> {
    self
      .stages
      .iter()
      .position(|s| s.name == name)
      .ok_or_else(|| FlowError::UnknownStage { stage: name.to_string() })
  }

  fn ensure_absent(&self, name: &str) -> FlowResult<()> {
    if self.stages.iter().any(|s| s.name == name) {
      return Err(FlowError::DuplicateStage { stage: name.to_string() });
    }
    Ok(())
  }

  pub fn insert_before(
    &mut self,
    anchor: &str,
    name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipIf<T>>,
  ) -> FlowResult<()> {
    let idx = self.position(anchor)?;
    let name = name.into();
    self.ensure_absent(&name)?;
    self.stages.insert(idx, Stage::new(name, optional, skip_if));
    Ok(())
  }

  pub fn insert_after(
    &mut self,
    anchor: &str,
    name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipIf<T>>,
  ) -> FlowResult<()> {
    let idx = self.position(anchor)?;
    let name = name.into();
    self.ensure_absent(&name)?;
    self.stages.insert(idx + 1, Stage::new(name, optional, skip_if));
    Ok(())
  }

  /// Drops a stage together with its handlers.
  pub fn remove_stage(&mut self, name: &str) -> FlowResult<()> {
    let idx = self.position(name)?;
    self.stages.remove(idx);
    self.handlers.remove(name);
    Ok(())
  }

  pub fn set_optional(&mut self, name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position(name)?;
    self.stages[idx].optional = optional;
    Ok(())
  }

  /// Replaces the skip predicate of a stage; `None` makes it always run.
  pub fn set_skip_if(&mut self, name: &str, skip_if: Option<SkipIf<T>>) -> FlowResult<()> {
    let idx = self.position(name)?;
    self.stages[idx].skip_if = skip_if;
    Ok(())
  }
}
