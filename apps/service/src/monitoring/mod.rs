/// Monitoring engine module - polls targets and judges their responses
///
/// This module is responsible for:
/// - Evaluating status and body checks against capped response bodies
/// - Executing single bounded-time HTTP fetches
/// - Running one independent loop per target and merging their results
/// - Validating target definitions before anything is scheduled
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{CheckSet, EvaluationError, MAX_BODY_BYTES, evaluate};
pub use executor::{FetchError, HttpProbe, fetch_once};
pub use scheduler::{MonitorHandle, MonitoringScheduler, ResultSink, ResultStream, SinkClosed, run};
pub use types::{Check, FetchErrorKind, Outcome, ProbeError, ProbeResult, Target};
