//! Tracing setup shared by the httpmonitor binaries.

mod subscriber;

pub use subscriber::{LogFormat, init_tracing, init_tracing_with};
