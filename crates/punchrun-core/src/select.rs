//! Narrowing the planned day set to the user-requested count.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::date::RocDate;
use crate::error::RunError;

/// User intent for how many of the planned days to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayChoice {
    /// Every planned day, unmodified and in order.
    All,
    /// Exactly this many days, sampled uniformly without replacement.
    Count(usize),
}

impl DayChoice {
    /// Parse the user-facing form: `"all"` or a positive integer.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(DayChoice::All);
        }
        match trimmed.parse::<usize>() {
            Ok(0) => Err("day count must be at least 1".to_string()),
            Ok(count) => Ok(DayChoice::Count(count)),
            Err(_) => Err(format!(
                "invalid day choice '{trimmed}': expected a number or 'all'"
            )),
        }
    }
}

/// Select the subset of candidate days to submit.
///
/// `All` is the identity; `Count(n)` draws a uniform sample of n distinct
/// days, failing when fewer than n are available. The rng is injected so the
/// production path stays non-deterministic while tests seed it.
pub fn select_days<R: Rng + ?Sized>(
    candidates: &[RocDate],
    choice: DayChoice,
    rng: &mut R,
) -> Result<Vec<RocDate>, RunError> {
    match choice {
        DayChoice::All => Ok(candidates.to_vec()),
        DayChoice::Count(requested) => {
            if requested > candidates.len() {
                return Err(RunError::InsufficientCandidates {
                    available: candidates.len(),
                    requested,
                });
            }
            Ok(candidates
                .choose_multiple(rng, requested)
                .copied()
                .collect())
        }
    }
}
