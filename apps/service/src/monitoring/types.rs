use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A predicate bundle a response has to satisfy.
///
/// Every populated field must hold for the check to pass. A status code of `0`
/// and empty strings count as "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Check {
    /// Exact status code the response must carry
    #[serde(alias = "StatusCode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Case-sensitive substring the (capped) body must contain
    #[serde(alias = "BodyContains", skip_serializing_if = "Option::is_none")]
    pub body_contains: Option<String>,

    /// Regular expression the (capped) body must match
    #[serde(alias = "BodyRegEx", alias = "BodyRegex", skip_serializing_if = "Option::is_none")]
    pub body_regex: Option<String>,
}

impl Check {
    pub fn status(code: u16) -> Self {
        Self { status_code: Some(code), ..Self::default() }
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self { body_contains: Some(needle.into()), ..Self::default() }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self { body_regex: Some(pattern.into()), ..Self::default() }
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.body_contains = Some(needle.into());
        self
    }

    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.body_regex = Some(pattern.into());
        self
    }

    /// Explicit status requirement, if any
    pub fn required_status(&self) -> Option<u16> {
        self.status_code.filter(|code| *code != 0)
    }

    pub fn required_substring(&self) -> Option<&str> {
        self.body_contains.as_deref().filter(|s| !s.is_empty())
    }

    pub fn required_pattern(&self) -> Option<&str> {
        self.body_regex.as_deref().filter(|s| !s.is_empty())
    }
}

/// One endpoint to poll repeatedly.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub url: String,
    /// Upper bound for a single attempt, body read included
    pub timeout: Duration,
    /// Poll cadence
    pub interval: Duration,
    pub checks: Vec<Check>,
}

impl Target {
    pub fn new(url: impl Into<String>, timeout: Duration, interval: Duration) -> Self {
        Self { url: url.into(), timeout, interval, checks: Vec::new() }
    }

    pub fn with_checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<GET '{}' every {:?} timeout={:?} ({} checks)>",
            self.url,
            self.interval,
            self.timeout,
            self.checks.len()
        )
    }
}

/// Transport-level failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    Request,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Connect => write!(f, "connect"),
            FetchErrorKind::Request => write!(f, "request"),
        }
    }
}

/// Why a tick did not produce a clean verdict.
///
/// A failing check is not an error: it shows up as `passed == false` with no
/// `ProbeError` attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProbeError {
    /// No response was obtained
    #[error("fetch failed ({kind}): {message}")]
    Fetch { kind: FetchErrorKind, message: String },

    /// A response arrived but could not be judged
    #[error("evaluation failed: {message}")]
    Evaluation { message: String },
}

/// Coarse classification of a result, used by the log outputs and the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Error,
    Unreachable,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail => write!(f, "fail"),
            Outcome::Error => write!(f, "error"),
            Outcome::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Result of one tick against one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// URL that was fetched
    pub url: String,

    /// When the attempt started
    pub checked_at: DateTime<Utc>,

    /// Time from issuing the request until evaluation finished (or the fetch failed)
    pub elapsed: Duration,

    /// All checks passed
    pub passed: bool,

    /// Status code of the response, `None` when no response arrived
    pub status_code: Option<u16>,

    pub error: Option<ProbeError>,
}

impl ProbeResult {
    /// Result for an attempt that never obtained a response
    pub fn unreachable(
        url: String,
        checked_at: DateTime<Utc>,
        elapsed: Duration,
        kind: FetchErrorKind,
        message: String,
    ) -> Self {
        Self {
            url,
            checked_at,
            elapsed,
            passed: false,
            status_code: None,
            error: Some(ProbeError::Fetch { kind, message }),
        }
    }

    /// Result for an attempt that received a response and ran the checks on it
    pub fn evaluated(
        url: String,
        checked_at: DateTime<Utc>,
        elapsed: Duration,
        status_code: u16,
        verdict: Result<bool, String>,
    ) -> Self {
        let (passed, error) = match verdict {
            Ok(passed) => (passed, None),
            Err(message) => (false, Some(ProbeError::Evaluation { message })),
        };

        Self { url, checked_at, elapsed, passed, status_code: Some(status_code), error }
    }

    pub fn outcome(&self) -> Outcome {
        match &self.error {
            Some(ProbeError::Fetch { .. }) => Outcome::Unreachable,
            Some(ProbeError::Evaluation { .. }) => Outcome::Error,
            None if self.passed => Outcome::Pass,
            None => Outcome::Fail,
        }
    }

    /// Status code with `0` standing in for "no response"
    pub fn status_code_or_zero(&self) -> u16 {
        self.status_code.unwrap_or(0)
    }

    pub fn is_fetch_error(&self) -> bool {
        matches!(self.error, Some(ProbeError::Fetch { .. }))
    }
}
