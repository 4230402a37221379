//! Institutional holiday discovery.
//!
//! The public calendar page only materializes its table through scripting, so
//! the production source drives a WebDriver endpoint (the rendering
//! collaborator) and owns nothing but the semantic extraction of holiday
//! dates from the rendered markup.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::date::{ROC_ERA_OFFSET, RocDate};
use crate::error::RunError;

pub const DEFAULT_CALENDAR_URL: &str = "https://www.nchu.edu.tw/calendar/";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://127.0.0.1:9515";

/// Bounded wait for the calendar table to appear in the rendered page.
const READY_TIMEOUT: Duration = Duration::from_secs(12);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Fixed settle delay after the table shows up, before the final snapshot.
const SETTLE_DELAY: Duration = Duration::from_millis(1200);
const WEBDRIVER_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Month/year header cells are identified structurally by this id prefix.
const HEADER_ID_PREFIX: &str = "rowspan";

/// Equivalent encodings of the dark-red holiday background. Deliberately
/// redundant to tolerate markup variance across calendar revisions.
const HOLIDAY_STYLE_MARKERS: &[&str] = &["#800000", "#8b0000", "background-color:maroon"];

/// Source of the institutional holiday set.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch_holidays(&self) -> Result<BTreeSet<RocDate>, RunError>;
}

/// Parse a header cell's text into (Gregorian year, month).
///
/// Recognizes three forms: `"<y>年<m>月"` sets both, `"<y>年"` sets the year
/// only, `"<m>月"` sets the month only and inherits `last_year` when no year
/// accompanies it. Header years are Minguo and are converted on the way out.
pub fn parse_year_month(text: &str, last_year: Option<i32>) -> (Option<i32>, Option<u32>) {
    let whitespace = Regex::new(r"\s+").unwrap();
    let text = whitespace.replace_all(text, "");

    let both = Regex::new(r"(\d+)年(\d+)月").unwrap();
    if let Some(caps) = both.captures(&text) {
        let year = caps[1].parse::<i32>().ok().map(|y| y + ROC_ERA_OFFSET);
        let month = caps[2].parse::<u32>().ok();
        return (year, month);
    }

    let mut year = None;
    let year_only = Regex::new(r"(\d+)年").unwrap();
    if let Some(caps) = year_only.captures(&text) {
        year = caps[1].parse::<i32>().ok().map(|y| y + ROC_ERA_OFFSET);
    }

    let mut month = None;
    let month_only = Regex::new(r"(\d+)月").unwrap();
    if let Some(caps) = month_only.captures(&text) {
        month = caps[1].parse::<u32>().ok();
        if year.is_none() {
            year = last_year;
        }
    }

    (year, month)
}

fn is_holiday_style(style: &str) -> bool {
    let style = style.to_ascii_lowercase();
    HOLIDAY_STYLE_MARKERS
        .iter()
        .any(|marker| style.contains(marker))
}

/// Walk every `td` of the rendered calendar in document order and collect the
/// holiday dates.
///
/// Header cells advance the (year, month) cursor; day cells count only when
/// styled as holidays and only once both cursor halves are established, so
/// day cells preceding any header are ignored.
pub fn extract_holidays(html: &str) -> BTreeSet<RocDate> {
    let document = Html::parse_document(html);
    let cells = Selector::parse("td").unwrap();

    let mut last_year: Option<i32> = None;
    let mut current_month: Option<u32> = None;
    let mut holidays = BTreeSet::new();

    for cell in document.select(&cells) {
        let id = cell.value().attr("id").unwrap_or("");
        if id.starts_with(HEADER_ID_PREFIX) {
            let text: String = cell.text().collect();
            let (year, month) = parse_year_month(&text, last_year);
            if year.is_some() {
                last_year = year;
            }
            if month.is_some() {
                current_month = month;
            }
            continue;
        }

        let style = cell.value().attr("style").unwrap_or("");
        if !is_holiday_style(style) {
            continue;
        }
        let (Some(year), Some(month)) = (last_year, current_month) else {
            continue;
        };

        let text: String = cell.text().collect();
        if let Ok(day) = text.trim().parse::<u32>() {
            holidays.insert(RocDate::new(
                (year - ROC_ERA_OFFSET).max(0) as u16,
                month as u8,
                day as u8,
            ));
        }
    }

    holidays
}

/// Production holiday source: a headless browser session reached over the
/// W3C WebDriver wire protocol.
pub struct WebCalendarSource {
    http: Client,
    webdriver_url: String,
    calendar_url: String,
}

#[derive(Debug, Deserialize)]
struct NewSessionResponse {
    value: NewSessionValue,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct PageSourceResponse {
    value: String,
}

impl WebCalendarSource {
    pub fn new(
        webdriver_url: impl Into<String>,
        calendar_url: impl Into<String>,
    ) -> Result<Self, RunError> {
        let http = Client::builder().timeout(WEBDRIVER_CALL_TIMEOUT).build()?;
        Ok(Self {
            http,
            webdriver_url: webdriver_url.into().trim_end_matches('/').to_string(),
            calendar_url: calendar_url.into(),
        })
    }

    async fn start_session(&self) -> Result<String, RunError> {
        let capabilities = serde_json::json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--no-sandbox", "--disable-gpu"]
                    }
                }
            }
        });
        let response: NewSessionResponse = self
            .http
            .post(format!("{}/session", self.webdriver_url))
            .json(&capabilities)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.value.session_id)
    }

    async fn navigate(&self, session: &str) -> Result<(), RunError> {
        self.http
            .post(format!("{}/session/{}/url", self.webdriver_url, session))
            .json(&serde_json::json!({ "url": self.calendar_url }))
            .send()
            .await?;
        Ok(())
    }

    async fn page_source(&self, session: &str) -> Result<String, RunError> {
        let response: PageSourceResponse = self
            .http
            .get(format!("{}/session/{}/source", self.webdriver_url, session))
            .send()
            .await?
            .json()
            .await?;
        Ok(response.value)
    }

    async fn end_session(&self, session: &str) {
        // Session teardown runs on every exit path; a failure here must not
        // mask the crawl result.
        let _ = self
            .http
            .delete(format!("{}/session/{}", self.webdriver_url, session))
            .send()
            .await;
    }

    async fn await_rendered_table(&self, session: &str) -> Result<String, RunError> {
        let deadline = Instant::now() + READY_TIMEOUT;
        loop {
            let source = self.page_source(session).await?;
            if source.contains("<table") {
                sleep(SETTLE_DELAY).await;
                return self.page_source(session).await;
            }
            if Instant::now() >= deadline {
                return Err(RunError::CalendarUnavailable);
            }
            sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn crawl(&self, session: &str) -> Result<BTreeSet<RocDate>, RunError> {
        self.navigate(session).await?;
        let source = self.await_rendered_table(session).await?;
        let holidays = extract_holidays(&source);
        debug!(count = holidays.len(), "extracted holiday dates");
        Ok(holidays)
    }
}

#[async_trait]
impl HolidaySource for WebCalendarSource {
    async fn fetch_holidays(&self) -> Result<BTreeSet<RocDate>, RunError> {
        let session = self.start_session().await?;
        let result = self.crawl(&session).await;
        self.end_session(&session).await;
        result
    }
}
