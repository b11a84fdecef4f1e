//! storeflow: a small async workflow engine.
//!
//! A [`Workflow`] is an ordered list of named stages. Each stage can carry
//! `before`, `on` and `after` handlers that operate on a shared [`Ctx`].
//! Handlers decide whether the run continues or halts, and stages can be
//! marked optional (best effort) or skipped through a predicate.
//!
//! Workflows are registered in a [`Registry`] keyed by their context type, so
//! callers only need to build a context and hand it to [`Registry::run`].

pub mod context;
pub mod control;
pub mod error;
pub mod registry;
pub mod stage;
pub mod workflow;

pub use crate::context::{Ctx, Handler};
pub use crate::control::{Control, Outcome};
pub use crate::error::{FlowError, FlowResult};
pub use crate::registry::Registry;
pub use crate::stage::{SkipIf, Stage};
pub use crate::workflow::Workflow;
