//! The submission coordinator: one background unit of work that walks the
//! linear pipeline (validate, fetch holidays, plan, select, authenticate,
//! resolve token, submit) and reports progress through a fire-and-forget
//! event sink. The pipeline is strictly sequential; the portal session and
//! the per-run token are shared mutable state with no concurrent-use
//! protocol.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::info;

use crate::calendar::{
    DEFAULT_CALENDAR_URL, DEFAULT_WEBDRIVER_URL, HolidaySource, WebCalendarSource,
};
use crate::date::RocDate;
use crate::error::RunError;
use crate::plan::plan_business_days;
use crate::portal::{
    ADMIN_WORK_LABEL, AttendancePortal, DEFAULT_PORTAL_BASE_URL, PortalClient, RunMode,
    SubmissionOutcome, WorkEntry, WorkHours,
};
use crate::select::{DayChoice, select_days};

/// Fire-and-forget event sink. The core never blocks on delivery.
pub type ProgressCallback = Arc<dyn Fn(RunEvent) + Send + Sync + 'static>;

/// The two notification kinds a run emits. `Finished` is sent exactly once
/// and is always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Progress { message: String },
    Finished { summary: String },
}

/// Aggregate per-entry counts reported when the submission loop is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accepted: usize,
    pub rejected: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done: {} accepted, {} rejected.",
            self.accepted, self.rejected
        )
    }
}

/// Full configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub username: String,
    pub password: String,
    pub mode: RunMode,
    pub day_choice: DayChoice,
    pub begin_time: String,
    pub end_time: String,
    pub hours: String,
    /// Checked label set for simple mode; with-time mode fixes the label to
    /// the administrative category.
    pub content_labels: Vec<String>,
    pub calendar_url: String,
    pub webdriver_url: String,
    pub portal_base_url: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            mode: RunMode::WithTime,
            day_choice: DayChoice::Count(1),
            begin_time: "0830".to_string(),
            end_time: "1730".to_string(),
            hours: "8".to_string(),
            content_labels: vec![ADMIN_WORK_LABEL.to_string()],
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
        }
    }
}

impl RunConfig {
    /// Labels that survive the blank filter, as checked on the input form.
    fn checked_labels(&self) -> Vec<String> {
        self.content_labels
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Upfront validation, before any network call. A with-time run missing any
/// time field fails here so no partial submissions can ever happen; a simple
/// run needs at least one usable label.
fn validate(config: &RunConfig) -> Result<(), RunError> {
    match config.mode {
        RunMode::WithTime => {
            if config.begin_time.trim().is_empty()
                || config.end_time.trim().is_empty()
                || config.hours.trim().is_empty()
            {
                return Err(RunError::MissingTimeFields);
            }
        }
        RunMode::Simple => {
            if config.checked_labels().is_empty() {
                return Err(RunError::NoContentLabels);
            }
        }
    }
    Ok(())
}

struct EventSink<'a> {
    callback: Option<&'a ProgressCallback>,
}

impl EventSink<'_> {
    fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        if let Some(callback) = self.callback {
            callback(RunEvent::Progress { message });
        }
    }

    fn finished(&self, summary: impl Into<String>) {
        let summary = summary.into();
        info!("{summary}");
        if let Some(callback) = self.callback {
            callback(RunEvent::Finished { summary });
        }
    }
}

fn pick_label<R: Rng + ?Sized>(labels: &[String], rng: &mut R) -> Result<String, RunError> {
    labels
        .choose(rng)
        .cloned()
        .ok_or(RunError::NoContentLabels)
}

fn build_entry<R: Rng + ?Sized>(
    config: &RunConfig,
    labels: &[String],
    date: RocDate,
    rng: &mut R,
) -> Result<WorkEntry, RunError> {
    match config.mode {
        RunMode::WithTime => Ok(WorkEntry {
            date,
            work: ADMIN_WORK_LABEL.to_string(),
            times: Some(WorkHours {
                begin: config.begin_time.trim().to_string(),
                end: config.end_time.trim().to_string(),
                hours: config.hours.trim().to_string(),
            }),
        }),
        RunMode::Simple => Ok(WorkEntry {
            date,
            // Drawn independently per entry, so a run may submit a different
            // label each day.
            work: pick_label(labels, rng)?,
            times: None,
        }),
    }
}

/// Run the full pipeline against injected collaborators.
///
/// Emits progress events in causal order and the terminal `Finished` event
/// exactly once, on both success and failure. `today` is injected so the
/// planning properties are testable against fixed dates.
pub async fn run_pipeline<S, P, R>(
    config: &RunConfig,
    today: NaiveDate,
    calendar: &S,
    portal: &P,
    rng: &mut R,
    callback: Option<&ProgressCallback>,
) -> Result<RunSummary, RunError>
where
    S: HolidaySource + ?Sized,
    P: AttendancePortal + ?Sized,
    R: Rng + ?Sized,
{
    let sink = EventSink { callback };
    let result = execute(config, today, calendar, portal, rng, &sink).await;
    match &result {
        Ok(summary) => sink.finished(summary.to_string()),
        Err(err) => sink.finished(format!("Run failed: {err}")),
    }
    result
}

async fn execute<S, P, R>(
    config: &RunConfig,
    today: NaiveDate,
    calendar: &S,
    portal: &P,
    rng: &mut R,
    sink: &EventSink<'_>,
) -> Result<RunSummary, RunError>
where
    S: HolidaySource + ?Sized,
    P: AttendancePortal + ?Sized,
    R: Rng + ?Sized,
{
    validate(config)?;

    sink.progress("Fetching holiday dates from the calendar...");
    let holidays = calendar.fetch_holidays().await?;
    sink.progress(format!("Holiday dates found: {}", holidays.len()));

    let candidates = plan_business_days(today, &holidays);
    if candidates.is_empty() {
        return Err(RunError::NoEligibleDays);
    }

    let mut selected = select_days(&candidates, config.day_choice, rng)?;
    selected.sort();
    sink.progress(format!(
        "Planned {} business days, submitting {}",
        candidates.len(),
        selected.len()
    ));

    portal
        .authenticate(&config.username, &config.password)
        .await?;
    sink.progress(format!("Logged in as {}", config.username));

    let token = portal.resolve_form_token(config.mode).await?;
    sink.progress("Resolved the submission form token");

    let labels = config.checked_labels();
    let mut summary = RunSummary::default();
    for date in selected {
        let entry = build_entry(config, &labels, date, rng)?;
        sink.progress(format!("Submitting: {} ({})", entry.date, entry.work));
        // A rejected entry never aborts the loop; submission is best-effort
        // per day.
        match portal.submit(config.mode, &entry, &token).await? {
            SubmissionOutcome::Accepted => summary.accepted += 1,
            SubmissionOutcome::Rejected => summary.rejected += 1,
        }
    }

    Ok(summary)
}

/// Run against the production collaborators without progress reporting.
pub async fn run_with_config(config: RunConfig) -> Result<RunSummary, RunError> {
    run(config, None).await
}

/// Run against the production collaborators, reporting progress through the
/// callback.
pub async fn run_with_config_with_progress(
    config: RunConfig,
    callback: ProgressCallback,
) -> Result<RunSummary, RunError> {
    run(config, Some(callback)).await
}

async fn run(
    config: RunConfig,
    callback: Option<ProgressCallback>,
) -> Result<RunSummary, RunError> {
    let parts = WebCalendarSource::new(&config.webdriver_url, &config.calendar_url)
        .and_then(|calendar| Ok((calendar, PortalClient::new(&config.portal_base_url)?)));
    let (calendar, portal) = match parts {
        Ok(parts) => parts,
        Err(err) => {
            // Client construction failed before the pipeline could own the
            // terminal event; still end with exactly one Finished.
            if let Some(callback) = &callback {
                callback(RunEvent::Finished {
                    summary: format!("Run failed: {err}"),
                });
            }
            return Err(err);
        }
    };

    let mut rng = StdRng::from_os_rng();
    let today = Local::now().date_naive();
    run_pipeline(
        &config,
        today,
        &calendar,
        &portal,
        &mut rng,
        callback.as_ref(),
    )
    .await
}

/// Spawn a run as one background unit of work, keeping the caller-facing
/// surface responsive. There is no cancellation: once started the run
/// proceeds to completion or to the first fatal precondition, and the caller
/// only observes events.
pub fn spawn_run(
    config: RunConfig,
    callback: ProgressCallback,
) -> JoinHandle<Result<RunSummary, RunError>> {
    tokio::spawn(run_with_config_with_progress(config, callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_time_mode_requires_every_time_field() {
        let mut config = RunConfig {
            mode: RunMode::WithTime,
            ..RunConfig::default()
        };
        assert!(validate(&config).is_ok());

        config.begin_time = String::new();
        assert!(matches!(validate(&config), Err(RunError::MissingTimeFields)));

        config.begin_time = "0830".to_string();
        config.hours = "  ".to_string();
        assert!(matches!(validate(&config), Err(RunError::MissingTimeFields)));
    }

    #[test]
    fn simple_mode_requires_a_usable_label() {
        let mut config = RunConfig {
            mode: RunMode::Simple,
            content_labels: vec!["閱讀文獻".to_string()],
            ..RunConfig::default()
        };
        assert!(validate(&config).is_ok());

        config.content_labels = vec![String::new(), "  ".to_string()];
        assert!(matches!(validate(&config), Err(RunError::NoContentLabels)));
    }

    #[test]
    fn simple_mode_tolerates_empty_time_fields() {
        let config = RunConfig {
            mode: RunMode::Simple,
            begin_time: String::new(),
            end_time: String::new(),
            hours: String::new(),
            content_labels: vec!["閱讀文獻".to_string()],
            ..RunConfig::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn summary_display_reports_both_counters() {
        let summary = RunSummary {
            accepted: 3,
            rejected: 1,
        };
        assert_eq!(summary.to_string(), "Done: 3 accepted, 1 rejected.");
    }
}
