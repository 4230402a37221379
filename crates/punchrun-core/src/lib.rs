//! Core library crate for the punchrun attendance submission engine.

pub mod calendar;
pub mod config;
pub mod date;
pub mod error;
pub mod logging;
pub mod plan;
pub mod portal;
pub mod runtime;
pub mod select;

pub use calendar::{
    DEFAULT_CALENDAR_URL, DEFAULT_WEBDRIVER_URL, HolidaySource, WebCalendarSource,
    extract_holidays, parse_year_month,
};
pub use config::{
    ConfigError, ConfigLoadResult, ConfigSource, FileConfig, Overrides, RunPreferences,
    SIMPLE_WORK_LABELS, apply_overrides, config_directory, config_path, load_config,
    run_config_from_preferences, save_config,
};
pub use date::{ROC_ERA_OFFSET, RocDate};
pub use error::RunError;
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};
pub use plan::plan_business_days;
pub use portal::{
    ADMIN_WORK_LABEL, AttendancePortal, DEFAULT_PORTAL_BASE_URL, PortalClient, RunMode,
    SubmissionOutcome, WorkEntry, WorkHours,
};
pub use runtime::{
    ProgressCallback, RunConfig, RunEvent, RunSummary, run_pipeline, run_with_config,
    run_with_config_with_progress, spawn_run,
};
pub use select::{DayChoice, select_days};
