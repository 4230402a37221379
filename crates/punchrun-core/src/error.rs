use thiserror::Error;

/// Run-fatal failures. Each halts the submission run immediately and becomes
/// the terminal summary's failure reason; none is retried. Per-entry
/// `Rejected` outcomes are counted in the summary and are not errors.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("login failed: check the account and password")]
    AuthenticationFailed,
    #[error("no usable business days in the current month")]
    NoEligibleDays,
    #[error("not enough candidate days ({available} available, {requested} requested)")]
    InsufficientCandidates { available: usize, requested: usize },
    #[error("begin time, end time, and hours are all required in with-time mode")]
    MissingTimeFields,
    #[error("the schno selection control or its first option is missing")]
    FormTokenMissing,
    #[error("at least one work content label must be selected")]
    NoContentLabels,
    #[error("the calendar page never became ready within the wait budget")]
    CalendarUnavailable,
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}
