use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use super::checker::CheckSet;
use super::types::{FetchErrorKind, ProbeResult, Target};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client for {url}: {source}")]
    Client {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("target {url} needs a non-zero {field}")]
    ZeroDuration { url: String, field: &'static str },
}

/// Executes single fetch-and-check attempts against one target.
///
/// Each probe owns its own client so the client-level timeout matches the
/// target's timeout, and so targets never share connection state.
pub struct HttpProbe {
    target: Target,
    client: reqwest::Client,
    checks: Result<CheckSet, String>,
}

impl HttpProbe {
    pub fn new(target: Target) -> Result<Self, FetchError> {
        for (field, value) in [("timeout", target.timeout), ("interval", target.interval)] {
            if value.is_zero() {
                return Err(FetchError::ZeroDuration { url: target.url, field });
            }
        }

        let client = reqwest::Client::builder()
            .timeout(target.timeout)
            .user_agent(concat!("httpmonitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Client { url: target.url.clone(), source })?;

        // Broken patterns are reported on every tick instead of stopping the loop
        let checks = CheckSet::compile(&target.checks).map_err(|e| e.to_string());

        Ok(Self { target, client, checks })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Perform exactly one GET and judge the response
    pub async fn fetch_once(&self) -> ProbeResult {
        let url = self.target.url.clone();
        let checked_at = Utc::now();
        let start = Instant::now();

        let mut response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let kind = classify(&e);
                debug!(url = %url, %kind, error = %e, "Request failed");
                return ProbeResult::unreachable(url, checked_at, start.elapsed(), kind, e.to_string());
            }
        };

        let status_code = response.status().as_u16();

        let verdict = match &self.checks {
            Ok(checks) => checks.evaluate(&mut response).await.map_err(|e| {
                debug!(url = %url, error = %e, "Check evaluation failed");
                e.to_string()
            }),
            Err(message) => Err(message.clone()),
        };

        // Release the connection before the clock stops, whatever the verdict
        drop(response);

        ProbeResult::evaluated(url, checked_at, start.elapsed(), status_code, verdict)
    }
}

fn classify(error: &reqwest::Error) -> FetchErrorKind {
    if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() {
        FetchErrorKind::Connect
    } else {
        FetchErrorKind::Request
    }
}

/// One-shot fetch for callers that do not keep a probe around
pub async fn fetch_once(target: &Target) -> Result<ProbeResult, FetchError> {
    Ok(HttpProbe::new(target.clone())?.fetch_once().await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::monitoring::types::{Check, Outcome, ProbeError};

    const SUCCESS_BODY: &str = "Hello, client\n";

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn target(url: &str, checks: Vec<Check>) -> Target {
        Target::new(url, Duration::from_secs(2), Duration::from_millis(10)).with_checks(checks)
    }

    async fn passed(server: &MockServer, checks: Vec<Check>) -> bool {
        fetch_once(&target(&server.uri(), checks)).await.unwrap().passed
    }

    #[tokio::test]
    async fn test_fetch_checks_on_success() {
        let server = serve(200, SUCCESS_BODY).await;

        let cases = vec![
            (vec![], true),
            (vec![Check::contains("Hello")], true),
            (vec![Check::regex(".ello")], true),
            (vec![Check::regex("H.{3}o")], true),
            (vec![Check::regex(".allo")], false),
            (vec![Check::contains("client")], true),
            (vec![Check::contains("Client")], false),
            (vec![Check::status(200)], true),
            (vec![Check::status(201)], false),
            (vec![Check::contains("Hello").with_status(200)], true),
            (vec![Check::contains("hello").with_status(200)], false),
            (vec![Check::contains("Hello").with_status(201)], false),
            (vec![Check::contains("hello").with_status(201)], false),
            (vec![Check::contains("Hello").with_status(200).with_regex("H.{3}o")], true),
            (vec![Check::contains("hello").with_status(200).with_regex("H.{3}o")], false),
            (vec![Check::contains("Hello").with_status(200).with_regex("H.{4}o")], false),
        ];

        for (checks, want) in cases {
            let got = passed(&server, checks.clone()).await;
            assert_eq!(got, want, "checks {checks:?} against body {SUCCESS_BODY:?}");
        }
    }

    #[tokio::test]
    async fn test_fetch_checks_on_forbidden() {
        let server = serve(403, "Forbidden").await;

        let cases = vec![
            (vec![], false),
            (vec![Check::contains("Hello")], false),
            (vec![Check::contains("Forbidden")], false),
            (vec![Check::status(200)], false),
            (vec![Check::status(403)], true),
            (vec![Check::status(403).with_contains("Forbidden")], true),
            (vec![Check::status(403).with_contains("Allowed")], false),
        ];

        for (checks, want) in cases {
            let got = passed(&server, checks.clone()).await;
            assert_eq!(got, want, "checks {checks:?} against 403 Forbidden");
        }
    }

    #[tokio::test]
    async fn test_result_fields_on_response() {
        let server = serve(403, "Forbidden").await;
        let res = fetch_once(&target(&server.uri(), vec![])).await.unwrap();

        assert_eq!(res.url, server.uri());
        assert_eq!(res.status_code, Some(403));
        assert!(res.error.is_none());
        assert_eq!(res.outcome(), Outcome::Fail);
    }

    #[tokio::test]
    async fn test_unreachable_target() {
        // Grab a free port and close it again so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{port}/");
        for checks in [vec![], vec![Check::status(200)], vec![Check::contains("x")]] {
            let res = fetch_once(&target(&url, checks)).await.unwrap();
            assert!(!res.passed);
            assert_eq!(res.status_code_or_zero(), 0);
            assert!(res.is_fetch_error());
            assert_eq!(res.outcome(), Outcome::Unreachable);
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let slow = Target::new(server.uri(), Duration::from_millis(100), Duration::from_secs(1));
        let res = fetch_once(&slow).await.unwrap();

        assert!(!res.passed);
        assert_eq!(res.status_code, None);
        assert!(matches!(res.error, Some(ProbeError::Fetch { kind: FetchErrorKind::Timeout, .. })));
        assert!(res.elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let zero_timeout = Target::new("http://example.com", Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            HttpProbe::new(zero_timeout),
            Err(FetchError::ZeroDuration { field: "timeout", .. })
        ));

        let zero_interval = Target::new("http://example.com", Duration::from_secs(1), Duration::ZERO);
        assert!(matches!(
            HttpProbe::new(zero_interval),
            Err(FetchError::ZeroDuration { field: "interval", .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_pattern_reported_per_tick() {
        let server = serve(200, SUCCESS_BODY).await;
        let probe = HttpProbe::new(target(&server.uri(), vec![Check::regex("(")])).unwrap();

        for _ in 0..2 {
            let res = probe.fetch_once().await;
            assert!(!res.passed);
            assert_eq!(res.status_code, Some(200));
            assert!(matches!(res.error, Some(ProbeError::Evaluation { .. })));
        }
    }

    #[tokio::test]
    async fn test_large_body_is_capped() {
        use crate::monitoring::checker::MAX_BODY_BYTES;

        let mut body = "x".repeat(MAX_BODY_BYTES);
        body.push_str("needle");
        let server = serve(200, &body).await;

        assert!(!passed(&server, vec![Check::contains("needle")]).await);
        assert!(passed(&server, vec![Check::regex("^x+$")]).await);
    }
}
