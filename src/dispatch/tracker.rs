use crate::foundation::error::{QuakereelError, QuakereelResult};

/// Progress of one kind of prerequisite work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum GateState {
    NotStarted,
    Dispatched,
    Completed,
}

/// Counts outstanding prerequisite jobs and decides when gated work may run.
///
/// The prep gate covers the single prep job. The step gate covers the prep steps it spawns: the
/// counter rises by the number spawned and falls by one per completion, and the after-prep batch
/// unlocks when it returns to zero. Every counter value is kept in [`DependencyTracker::history`].
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyTracker {
    prep: GateState,
    steps: GateState,
    counter: u64,
    history: Vec<u64>,
    ceiling: Option<f64>,
}

impl DependencyTracker {
    /// Tracker for a run with (`has_prep`) or without overlay preparation.
    pub fn new(has_prep: bool) -> Self {
        let initial = if has_prep {
            GateState::NotStarted
        } else {
            GateState::Completed
        };
        Self {
            prep: initial,
            steps: initial,
            counter: 0,
            history: vec![0],
            ceiling: None,
        }
    }

    pub fn prep_state(&self) -> GateState {
        self.prep
    }

    pub fn step_state(&self) -> GateState {
        self.steps
    }

    /// Outstanding prep steps.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Every value the counter has taken, starting at 0.
    pub fn history(&self) -> &[u64] {
        &self.history
    }

    /// Colour-scale ceiling reported by the prep job.
    pub fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    /// Whether some gated work may still be released.
    pub fn has_pending(&self) -> bool {
        self.prep != GateState::Completed || self.counter > 0
    }

    pub fn prep_dispatched(&mut self) {
        if self.prep == GateState::NotStarted {
            self.prep = GateState::Dispatched;
            tracing::info!("prep gate dispatched");
        }
    }

    /// Record the prep result.
    pub fn prep_completed(&mut self, ceiling: f64) -> QuakereelResult<()> {
        if self.prep != GateState::Dispatched {
            return Err(QuakereelError::dispatch(format!(
                "prep completed while its gate is {:?}",
                self.prep
            )));
        }
        self.prep = GateState::Completed;
        self.ceiling = Some(ceiling);
        tracing::info!(ceiling, "prep gate completed");
        Ok(())
    }

    /// Close the prep gate without a result; nothing behind it will be released.
    pub fn prep_failed(&mut self) {
        self.prep = GateState::Completed;
        self.steps = GateState::Completed;
        tracing::warn!("prep gate closed after failure");
    }

    /// Account for `n` newly spawned prep steps.
    pub fn steps_spawned(&mut self, n: u64) {
        self.counter += n;
        self.history.push(self.counter);
        tracing::info!(spawned = n, counter = self.counter, "prep steps spawned");
    }

    pub fn step_dispatched(&mut self) {
        if self.steps == GateState::NotStarted {
            self.steps = GateState::Dispatched;
        }
    }

    /// Record one prep step completion; returns `true` when the counter reaches zero.
    pub fn step_completed(&mut self) -> QuakereelResult<bool> {
        if self.counter == 0 {
            return Err(QuakereelError::dispatch(
                "prep step completed with no steps outstanding",
            ));
        }
        self.counter -= 1;
        self.history.push(self.counter);
        if self.counter == 0 {
            self.steps = GateState::Completed;
            tracing::info!("prep steps completed, releasing after-prep batch");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/tracker.rs"]
mod tests;
