use clap::{ArgAction, Args, Parser};
use punchrun_core::{DayChoice, Overrides};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "punchrun", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    /// Persist the effective preferences back to config.toml before running.
    #[arg(long, action = ArgAction::SetTrue)]
    pub save: bool,
}

/// Per-run overrides over the stored preferences.
#[derive(Debug, Clone, Args, Default)]
pub struct RunArgs {
    /// Portal login ID.
    #[arg(short, long, value_name = "ID")]
    pub user: Option<String>,

    /// Use the attendance sheet with explicit begin/end times.
    #[arg(long = "with-time", action = ArgAction::SetTrue, conflicts_with = "simple")]
    pub with_time: bool,

    /// Use the plain study-log form without time fields.
    #[arg(long, action = ArgAction::SetTrue)]
    pub simple: bool,

    /// How many business days to submit: a count from 1 to 10, or 'all'.
    #[arg(short, long, value_name = "N|all")]
    pub days: Option<String>,

    /// Begin time as HHMM.
    #[arg(long = "begin", value_name = "HHMM")]
    pub begin_time: Option<String>,

    /// End time as HHMM.
    #[arg(long = "end", value_name = "HHMM")]
    pub end_time: Option<String>,

    /// Hours worked per entry.
    #[arg(long, value_name = "HOURS")]
    pub hours: Option<String>,

    /// Work label for simple mode; repeat to offer several.
    #[arg(short, long = "label", value_name = "LABEL", action = ArgAction::Append)]
    pub labels: Vec<String>,

    /// Holiday calendar page URL.
    #[arg(long = "calendar-url", value_name = "URL")]
    pub calendar_url: Option<String>,

    /// WebDriver endpoint used to render the calendar.
    #[arg(long = "webdriver-url", value_name = "URL")]
    pub webdriver_url: Option<String>,

    /// Attendance portal base URL.
    #[arg(long = "portal-url", value_name = "URL")]
    pub portal_base_url: Option<String>,
}

const MAX_DAY_COUNT: usize = 10;

impl RunArgs {
    /// Convert CLI flags into preference overrides plus any advisory
    /// warnings.
    pub fn to_overrides(&self) -> Result<(Overrides, Vec<String>), String> {
        let warnings = Vec::new();

        if let Some(days) = &self.days {
            match DayChoice::parse(days)? {
                DayChoice::Count(count) if count > MAX_DAY_COUNT => {
                    return Err(format!(
                        "day count {count} exceeds the maximum of {MAX_DAY_COUNT}"
                    ));
                }
                _ => {}
            }
        }

        let with_time = if self.with_time {
            Some(true)
        } else if self.simple {
            Some(false)
        } else {
            None
        };

        let overrides = Overrides {
            username: self.user.clone(),
            with_time,
            days: self.days.clone(),
            begin_time: self.begin_time.clone(),
            end_time: self.end_time.clone(),
            hours: self.hours.clone(),
            content_labels: if self.labels.is_empty() {
                None
            } else {
                Some(self.labels.clone())
            },
            calendar_url: self.calendar_url.clone(),
            webdriver_url: self.webdriver_url.clone(),
            portal_base_url: self.portal_base_url.clone(),
        };

        Ok((overrides, warnings))
    }
}
