//! Target validation, run once when the configuration is loaded.
//!
//! Everything that would otherwise surface on every tick (bad URL, zero
//! interval, broken pattern) is rejected here instead.

use std::time::Duration;

use url::Url;

use super::checker::CheckSet;
use super::types::{Check, Target};

const MAX_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes
const MAX_INTERVAL: Duration = Duration::from_secs(86400); // 24 hours

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{field} must be a positive number of seconds, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} too long: {value:?} (maximum: {max:?})")]
    TooLong { field: &'static str, value: Duration, max: Duration },

    #[error("check #{index}: {message}")]
    InvalidCheck { index: usize, message: String },
}

/// Validate HTTP/HTTPS target URL
pub fn validate_http_target(target: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl { url: target.to_string(), reason };

    let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    if url.port() == Some(0) {
        return Err(invalid("port 0 is not valid".to_string()));
    }

    Ok(())
}

/// Convert a seconds value from configuration into a bounded duration
pub fn seconds_to_duration(field: &'static str, seconds: f64) -> Result<Duration, ValidationError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ValidationError::NonPositive { field, value: seconds });
    }

    let max = match field {
        "timeout" => MAX_TIMEOUT,
        _ => MAX_INTERVAL,
    };

    let value = Duration::try_from_secs_f64(seconds)
        .map_err(|_| ValidationError::TooLong { field, value: Duration::MAX, max })?;

    if value.is_zero() {
        return Err(ValidationError::NonPositive { field, value: seconds });
    }
    if value > max {
        return Err(ValidationError::TooLong { field, value, max });
    }

    Ok(value)
}

/// Make sure every check can be evaluated
pub fn validate_checks(checks: &[Check]) -> Result<(), ValidationError> {
    for (index, check) in checks.iter().enumerate() {
        CheckSet::compile(std::slice::from_ref(check))
            .map_err(|e| ValidationError::InvalidCheck { index, message: e.to_string() })?;
    }
    Ok(())
}

/// Validate a fully built target
pub fn validate_target(target: &Target) -> Result<(), ValidationError> {
    validate_http_target(&target.url)?;

    if target.timeout.is_zero() {
        return Err(ValidationError::NonPositive { field: "timeout", value: 0.0 });
    }
    if target.interval.is_zero() {
        return Err(ValidationError::NonPositive { field: "interval", value: 0.0 });
    }

    validate_checks(&target.checks)
}
