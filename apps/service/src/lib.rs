//! Periodic HTTP endpoint monitor.
//!
//! The [`monitoring`] engine polls every target on its own schedule and merges
//! the results into a single stream; the remaining modules load configuration
//! and consume that stream.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod monitoring;
pub mod report;
pub mod status;
