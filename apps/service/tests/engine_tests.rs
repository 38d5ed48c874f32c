//! End-to-end tests for the polling engine
//!
//! Every scenario runs through the scheduler and the merged result stream,
//! against local mock servers.

use std::collections::HashMap;
use std::net::TcpListener;
use std::time::Duration;

use httpmonitor::dashboard;
use httpmonitor::monitoring::{self, Check, Outcome, ProbeResult, Target};
use httpmonitor::status::StatusBoard;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello, client"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;
    server
}

fn target(url: String, checks: Vec<Check>) -> Target {
    Target::new(url, Duration::from_secs(2), Duration::from_millis(20)).with_checks(checks)
}

fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}

/// Run the targets until each has reported once and return the first result per target index
async fn first_results(targets: Vec<Target>) -> Vec<ProbeResult> {
    // Make every URL unique so results can be matched back to their target
    let targets: Vec<Target> = targets
        .into_iter()
        .enumerate()
        .map(|(i, mut t)| {
            let sep = if t.url.contains('?') { '&' } else { '?' };
            t.url = format!("{}{sep}case={i}", t.url);
            t
        })
        .collect();
    let urls: Vec<String> = targets.iter().map(|t| t.url.clone()).collect();

    let (mut stream, handle) = monitoring::run(targets, 8).unwrap();

    let mut seen: HashMap<String, ProbeResult> = HashMap::new();
    while seen.len() < urls.len() {
        let result = tokio::time::timeout(Duration::from_secs(5), stream.recv())
            .await
            .expect("timed out waiting for results")
            .expect("stream ended early");
        seen.entry(result.url.clone()).or_insert(result);
    }
    handle.shutdown().await;

    urls.iter().map(|url| seen.remove(url).unwrap()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scenarios() {
    let server = mock_server().await;
    let hello = format!("{}/hello", server.uri());
    let forbidden = format!("{}/forbidden", server.uri());
    let unreachable = unreachable_url();

    let cases = vec![
        // 1, 2: substring, case-sensitive
        (target(hello.clone(), vec![Check::contains("Hello")]), true),
        (target(hello.clone(), vec![Check::contains("Client")]), false),
        // 3: default status policy
        (target(forbidden.clone(), vec![]), false),
        // 4: explicit status replaces the default
        (target(forbidden.clone(), vec![Check::status(403)]), true),
        // 5: combined predicates
        (target(forbidden.clone(), vec![Check::status(403).with_contains("Forbidden")]), true),
        (target(forbidden.clone(), vec![Check::status(403).with_contains("Allowed")]), false),
        // 6: unreachable, whatever the checks
        (target(unreachable.clone(), vec![]), false),
        (target(unreachable, vec![Check::status(200).with_contains("x")]), false),
    ];

    let (targets, expected): (Vec<_>, Vec<_>) = cases.into_iter().unzip();
    let results = first_results(targets).await;

    for (i, (result, want)) in results.iter().zip(expected).enumerate() {
        assert_eq!(result.passed, want, "case {i}: {result:?}");
    }

    for unreachable in &results[6..] {
        assert_eq!(unreachable.status_code_or_zero(), 0);
        assert!(unreachable.is_fetch_error());
        assert_eq!(unreachable.outcome(), Outcome::Unreachable);
    }

    // Check failures are not errors
    assert_eq!(results[1].outcome(), Outcome::Fail);
    assert!(results[1].error.is_none());
    assert_eq!(results[2].status_code, Some(403));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_independent_cadences() {
    let server = mock_server().await;
    let fast = target(format!("{}/hello?fast", server.uri()), vec![]);
    let mut slow = target(format!("{}/hello?slow", server.uri()), vec![]);
    slow.interval = Duration::from_millis(400);

    let (mut stream, handle) = monitoring::run(vec![fast, slow], 4).unwrap();

    let mut counts: HashMap<String, usize> = HashMap::new();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(900);
    while let Ok(Some(result)) = tokio::time::timeout_at(deadline, stream.recv()).await {
        *counts.entry(result.url).or_default() += 1;
    }
    handle.shutdown().await;

    let fast_count = counts.iter().find(|(url, _)| url.ends_with("fast")).map_or(0, |(_, n)| *n);
    let slow_count = counts.iter().find(|(url, _)| url.ends_with("slow")).map_or(0, |(_, n)| *n);

    assert!(fast_count >= 10, "fast target only reported {fast_count} times");
    assert!((1..=3).contains(&slow_count), "slow target reported {slow_count} times");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dashboard_serves_latest_results() {
    let server = mock_server().await;
    let hello = format!("{}/hello", server.uri());

    let board = StatusBoard::new();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let dashboard = dashboard::start(listener, board.clone()).unwrap();
    let dashboard_handle = dashboard.handle();
    let _ = tokio::spawn(dashboard);

    // Feed the board straight from the engine
    let monitors = monitoring::MonitoringScheduler::new(board.clone())
        .start(vec![target(hello.clone(), vec![Check::contains("Hello")])])
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while board.get(&hello).await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("board never received a result");
    monitors.shutdown().await;

    let rows: serde_json::Value = reqwest::get(format!("{address}/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows[0]["url"], hello.as_str());
    assert_eq!(rows[0]["status"], "pass");

    let page = reqwest::get(&address).await.unwrap().text().await.unwrap();
    assert!(page.contains("<td>pass</td>"));

    dashboard_handle.stop(true).await;
}
