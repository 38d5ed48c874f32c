use std::io;

use bytes::{Bytes, BytesMut};
use regex::bytes::Regex;

use super::types::Check;

/// Ceiling on how much of a response body is ever buffered for checks
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Without an explicit status check, responses at or above this code fail
pub const DEFAULT_FAILURE_STATUS: u16 = 400;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("invalid body pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] io::Error),
}

/// The parts of an HTTP response the checks look at
#[async_trait::async_trait]
pub trait ResponseSource: Send {
    fn status_code(&self) -> u16;

    /// Read at most `limit` bytes of the body. Anything past the limit stays unread.
    async fn read_body(&mut self, limit: usize) -> io::Result<Bytes>;
}

#[async_trait::async_trait]
impl ResponseSource for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    async fn read_body(&mut self, limit: usize) -> io::Result<Bytes> {
        let mut buf = BytesMut::with_capacity(limit.min(8 * 1024));

        while buf.len() < limit {
            let Some(chunk) = self.chunk().await.map_err(io::Error::other)? else {
                break;
            };
            let take = chunk.len().min(limit - buf.len());
            buf.extend_from_slice(&chunk[..take]);
        }

        Ok(buf.freeze())
    }
}

#[derive(Debug)]
struct CompiledCheck {
    status: Option<u16>,
    substring: Option<Vec<u8>>,
    pattern: Option<Regex>,
}

/// A target's checks with their patterns compiled, ready to judge responses.
#[derive(Debug)]
pub struct CheckSet {
    checks: Vec<CompiledCheck>,
    explicit_status: bool,
    body_limit: usize,
}

impl CheckSet {
    pub fn compile(checks: &[Check]) -> Result<Self, EvaluationError> {
        let checks = checks
            .iter()
            .map(|check| {
                let pattern = check
                    .required_pattern()
                    .map(|pattern| {
                        Regex::new(pattern).map_err(|source| EvaluationError::InvalidPattern {
                            pattern: pattern.to_string(),
                            source,
                        })
                    })
                    .transpose()?;

                Ok(CompiledCheck {
                    status: check.required_status(),
                    substring: check.required_substring().map(|s| s.as_bytes().to_vec()),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        let explicit_status = checks.iter().any(|check| check.status.is_some());

        Ok(Self { checks, explicit_status, body_limit: MAX_BODY_BYTES })
    }

    /// Override the body cap (mostly useful in tests)
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Judge a response.
    ///
    /// `Ok(false)` means a check did not hold. The body is read once, and only
    /// when the first body predicate is reached.
    pub async fn evaluate<R>(&self, response: &mut R) -> Result<bool, EvaluationError>
    where
        R: ResponseSource + ?Sized,
    {
        let status = response.status_code();

        if !self.explicit_status && status >= DEFAULT_FAILURE_STATUS {
            return Ok(false);
        }

        let mut body = LazyBody { response, limit: self.body_limit, bytes: None };

        for check in &self.checks {
            if check.status.is_some_and(|expected| expected != status) {
                return Ok(false);
            }

            if let Some(needle) = &check.substring {
                if !contains_bytes(body.get().await?, needle) {
                    return Ok(false);
                }
            }

            if let Some(pattern) = &check.pattern {
                if !pattern.is_match(body.get().await?) {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

/// Compile `checks` and judge `response` against them in one go
pub async fn evaluate<R>(response: &mut R, checks: &[Check]) -> Result<bool, EvaluationError>
where
    R: ResponseSource + ?Sized,
{
    CheckSet::compile(checks)?.evaluate(response).await
}

struct LazyBody<'a, R: ?Sized> {
    response: &'a mut R,
    limit: usize,
    bytes: Option<Bytes>,
}

impl<R: ResponseSource + ?Sized> LazyBody<'_, R> {
    async fn get(&mut self) -> Result<&[u8], EvaluationError> {
        if self.bytes.is_none() {
            let bytes =
                self.response.read_body(self.limit).await.map_err(EvaluationError::BodyRead)?;
            self.bytes = Some(bytes);
        }
        Ok(self.bytes.as_deref().unwrap_or_default())
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
