//! Attendance portal client.
//!
//! The portal has no structured API: login success, the submission token, and
//! per-entry outcomes are all read out of HTML bodies. The substring checks
//! here reproduce the portal's observable behavior exactly and never consult
//! HTTP status codes, which stay 2xx even for logical failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::date::RocDate;
use crate::error::RunError;

pub const DEFAULT_PORTAL_BASE_URL: &str = "https://psf.nchu.edu.tw/punch";

const LOGIN_PATH: &str = "login_chk.jsp";
const TIMED_LIST_PATH: &str = "PunchList.jsp";
const TIMED_SUBMIT_PATH: &str = "PunchListS.jsp";
const SIMPLE_LIST_PATH: &str = "PunchList_A.jsp";
const SIMPLE_SUBMIT_PATH: &str = "PunchListS_A.jsp";

/// The only observable login success signal: the post-login page links to the
/// menu.
const LOGIN_OK_FRAGMENT: &str = "/Menu.jsp";

/// The submission response embeds its error slot in the body; this literal
/// means the slot is empty and the entry was accepted.
const NO_ERROR_FRAGMENT: &str = "ERROR:null";

/// Fixed work label used for every entry in with-time mode.
pub const ADMIN_WORK_LABEL: &str = "行政事務";

const PORTAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Which pair of portal endpoints a run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Attendance sheet with explicit begin/end times and an hour count.
    WithTime,
    /// Plain study-log entries keyed by date and label only.
    Simple,
}

/// Explicit time fields carried by with-time entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkHours {
    pub begin: String,
    pub end: String,
    pub hours: String,
}

/// One submission unit: a selected day plus its work label, and the time
/// fields when the run carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkEntry {
    pub date: RocDate,
    pub work: String,
    pub times: Option<WorkHours>,
}

/// Per-entry result, never partially known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected,
}

/// Classify a submission response body. The empty error slot means accepted;
/// anything else carries a real error marker.
pub fn classify_submission(body: &str) -> SubmissionOutcome {
    if body.contains(NO_ERROR_FRAGMENT) {
        SubmissionOutcome::Accepted
    } else {
        SubmissionOutcome::Rejected
    }
}

/// Substring check against the returned page content, the portal's only
/// observable login signal.
pub fn login_succeeded(body: &str) -> bool {
    body.contains(LOGIN_OK_FRAGMENT)
}

/// Pull the first option value of the `schno` selection control out of a list
/// page.
pub fn extract_form_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let options = Selector::parse(r#"select[name="schno"] option"#).unwrap();
    document
        .select(&options)
        .next()
        .and_then(|option| option.value().attr("value"))
        .map(str::to_string)
}

/// The portal operations the coordinator depends on. Production uses
/// [`PortalClient`]; tests substitute stubs.
#[async_trait]
pub trait AttendancePortal: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), RunError>;
    async fn resolve_form_token(&self, mode: RunMode) -> Result<String, RunError>;
    async fn submit(
        &self,
        mode: RunMode,
        entry: &WorkEntry,
        token: &str,
    ) -> Result<SubmissionOutcome, RunError>;
}

/// Session-bearing HTTP client for the portal. The cookie store carries the
/// login session across the token fetch and every submission.
pub struct PortalClient {
    http: Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RunError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(PORTAL_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn list_path(mode: RunMode) -> &'static str {
        match mode {
            RunMode::WithTime => TIMED_LIST_PATH,
            RunMode::Simple => SIMPLE_LIST_PATH,
        }
    }

    fn submit_path(mode: RunMode) -> &'static str {
        match mode {
            RunMode::WithTime => TIMED_SUBMIT_PATH,
            RunMode::Simple => SIMPLE_SUBMIT_PATH,
        }
    }
}

#[async_trait]
impl AttendancePortal for PortalClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), RunError> {
        let body = self
            .http
            .post(self.endpoint(LOGIN_PATH))
            .form(&[("txtLoginID", username), ("txtLoginPWD", password)])
            .send()
            .await?
            .text()
            .await?;
        if login_succeeded(&body) {
            Ok(())
        } else {
            Err(RunError::AuthenticationFailed)
        }
    }

    async fn resolve_form_token(&self, mode: RunMode) -> Result<String, RunError> {
        let body = self
            .http
            .get(self.endpoint(Self::list_path(mode)))
            .send()
            .await?
            .text()
            .await?;
        extract_form_token(&body).ok_or(RunError::FormTokenMissing)
    }

    async fn submit(
        &self,
        mode: RunMode,
        entry: &WorkEntry,
        token: &str,
    ) -> Result<SubmissionOutcome, RunError> {
        let mut form: Vec<(&str, String)> = vec![("date", entry.date.compact())];
        if let Some(times) = &entry.times {
            form.push(("begtime", times.begin.clone()));
            form.push(("endtime", times.end.clone()));
            form.push(("hours", times.hours.clone()));
        }
        form.push(("work", entry.work.clone()));
        form.push(("schno", token.to_string()));
        form.push(("hidACT", "add".to_string()));

        let body = self
            .http
            .post(self.endpoint(Self::submit_path(mode)))
            .form(&form)
            .send()
            .await?
            .text()
            .await?;
        let outcome = classify_submission(&body);
        debug!(date = %entry.date, ?outcome, "submitted entry");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_error_slot_means_accepted() {
        assert_eq!(
            classify_submission("<html>ERROR:null</html>"),
            SubmissionOutcome::Accepted
        );
    }

    #[test]
    fn any_other_body_is_rejected_regardless_of_shape() {
        assert_eq!(
            classify_submission("<html>ERROR:duplicate entry</html>"),
            SubmissionOutcome::Rejected
        );
        assert_eq!(classify_submission(""), SubmissionOutcome::Rejected);
        assert_eq!(
            classify_submission("<html>OK</html>"),
            SubmissionOutcome::Rejected
        );
    }

    #[test]
    fn login_check_is_substring_based() {
        assert!(login_succeeded(
            "<script>location.href='/punch/Menu.jsp'</script>"
        ));
        assert!(!login_succeeded("<html>帳號或密碼錯誤</html>"));
    }

    #[test]
    fn form_token_takes_the_first_option_value() {
        let html = r#"<form><select name="schno">
            <option value="114-2">spring</option>
            <option value="115-1">fall</option>
        </select></form>"#;
        assert_eq!(extract_form_token(html), Some("114-2".to_string()));
    }

    #[test]
    fn missing_control_or_option_yields_no_token() {
        assert_eq!(extract_form_token("<form></form>"), None);
        assert_eq!(
            extract_form_token(r#"<select name="schno"></select>"#),
            None
        );
        assert_eq!(
            extract_form_token(r#"<select name="other"><option value="x"/></select>"#),
            None
        );
    }

    #[test]
    fn option_without_a_value_attribute_is_missing() {
        let html = r#"<select name="schno"><option>114-2</option></select>"#;
        assert_eq!(extract_form_token(html), None);
    }

    #[test]
    fn each_mode_uses_its_own_endpoint_pair() {
        assert_eq!(PortalClient::list_path(RunMode::WithTime), "PunchList.jsp");
        assert_eq!(
            PortalClient::submit_path(RunMode::WithTime),
            "PunchListS.jsp"
        );
        assert_eq!(PortalClient::list_path(RunMode::Simple), "PunchList_A.jsp");
        assert_eq!(
            PortalClient::submit_path(RunMode::Simple),
            "PunchListS_A.jsp"
        );
    }
}
