//! Flow signals returned by handlers and the outcome of a full run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  /// Keep going with the remaining handlers and stages.
  Continue,
  /// End the run now. Nothing after this handler executes.
  Halt,
}

/// How a run ended when no error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Every stage was either executed or legitimately skipped.
  Completed,
  /// A handler returned [`Control::Halt`].
  Halted,
}

impl Outcome {
  pub fn is_completed(self) -> bool {
    matches!(self, Outcome::Completed)
  }
}
