use std::io::Error as IoError;

use thiserror::Error;

use crate::config::ConfigError;
use crate::monitoring::FetchError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to write result log: {0}")]
    ResultLog(#[source] IoError),
}
