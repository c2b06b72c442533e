//! Capped rejection sampling.
//!
//! Goal and initial-state placement draw candidates until one satisfies the
//! task's constraint. An unlucky configuration (e.g. an initial-state range
//! that can never be far enough from the goal) would otherwise loop forever,
//! so every loop runs under an attempt cap and reports
//! [`Error::InfeasibleConfiguration`] when the cap is exhausted.

use crate::error::{Error, Result};

/// Default number of draws before a placement is declared infeasible.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Runs resample-until-valid loops with an optional attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionSampler {
    max_attempts: Option<usize>,
}

impl Default for RejectionSampler {
    fn default() -> Self {
        Self::capped(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RejectionSampler {
    /// Creates a sampler with the given cap; `None` retries forever.
    pub fn new(max_attempts: Option<usize>) -> Self {
        Self { max_attempts }
    }

    /// Creates a sampler that gives up after `max_attempts` draws.
    pub fn capped(max_attempts: usize) -> Self {
        Self::new(Some(max_attempts))
    }

    /// Creates a sampler that never gives up.
    ///
    /// A configuration whose constraint cannot be met makes [`sample`](Self::sample)
    /// block forever.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// The configured cap.
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Calls `draw` until it yields `Some`.
    ///
    /// `draw` returns `Ok(None)` to reject a candidate. Errors from `draw`
    /// are propagated immediately.
    pub fn sample<T, F>(&self, what: &str, mut draw: F) -> Result<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let mut attempts = 0usize;
        loop {
            if let Some(cap) = self.max_attempts {
                if attempts >= cap {
                    return Err(Error::InfeasibleConfiguration {
                        what: what.to_string(),
                        attempts,
                    });
                }
            }
            attempts += 1;
            if let Some(accepted) = draw()? {
                if attempts > 100 {
                    log::warn!("{} accepted only after {} attempts", what, attempts);
                } else {
                    log::trace!("{} accepted after {} attempts", what, attempts);
                }
                return Ok(accepted);
            }
        }
    }
}
