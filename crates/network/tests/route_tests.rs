// crates/network/tests/route_tests.rs
//! Route selection against scripted servers

mod common;

use common::{Reply, ScriptedTransport};
use std::sync::Arc;
use std::time::Duration;
use sublink_network::{
    ConnectionCategory, Credentials, EndpointCandidates, FixedNetworkProbe, RoutePolicy,
    RouteSelectionResult, RouteSelector, ALL_ROUTES_FAILED, CONNECTION_TIMEOUT,
    NO_URLS_CONFIGURED, PING_FAILED, SELECTION_CANCELLED,
};
use sublink_resilience::CancelSignal;
use tokio::time::Instant;

const LAN: &str = "http://192.168.1.10:4040";
const DDNS: &str = "https://music.example.org";

fn selector(transport: &Arc<ScriptedTransport>, category: ConnectionCategory) -> RouteSelector {
    RouteSelector::new(transport.clone(), Arc::new(FixedNetworkProbe(category)))
}

fn both() -> EndpointCandidates {
    EndpointCandidates::new(Some(LAN.to_string()), Some(DDNS.to_string()))
}

fn creds() -> Credentials {
    Credentials::new("alice", "secret")
}

#[tokio::test]
async fn test_no_candidates_fails_without_probing() {
    let transport = Arc::new(ScriptedTransport::new());
    let candidates = EndpointCandidates::new(None, Some("  ".to_string()));

    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&candidates, &creds())
        .await;

    assert_eq!(result.failure_reason(), Some(NO_URLS_CONFIGURED));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_single_reachable_candidate_is_selected() {
    let transport = Arc::new(ScriptedTransport::new().on(LAN, vec![Reply::ok("pong")]));
    let candidates = EndpointCandidates::new(Some(format!("{}/", LAN)), None);

    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&candidates, &creds())
        .await;

    assert_eq!(result.selected_url(), Some(format!("{}/", LAN).as_str()));
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("http://192.168.1.10:4040/rest/ping.view?"));
    assert!(calls[0].contains("u=alice"));
    assert!(calls[0].contains("p=enc%3A736563726574"));
}

#[tokio::test]
async fn test_single_candidate_rejecting_ping() {
    let transport = Arc::new(ScriptedTransport::new().on(DDNS, vec![Reply::status(401)]));
    let candidates = EndpointCandidates::new(None, Some(DDNS.to_string()));

    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&candidates, &creds())
        .await;

    assert_eq!(
        result,
        RouteSelectionResult::Failed {
            reason: PING_FAILED.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_candidate_timeout() {
    let transport = Arc::new(ScriptedTransport::new().on(LAN, vec![Reply::Hang]));
    let candidates = EndpointCandidates::new(Some(LAN.to_string()), None);

    let start = Instant::now();
    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&candidates, &creds())
        .await;

    assert_eq!(result.failure_reason(), Some(CONNECTION_TIMEOUT));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2100));
}

#[tokio::test(start_paused = true)]
async fn test_race_faster_candidate_wins() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_after(LAN, Duration::from_millis(1500), vec![Reply::ok("pong")])
            .on_after(DDNS, Duration::from_millis(100), vec![Reply::ok("pong")]),
    );

    let start = Instant::now();
    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.selected_url(), Some(DDNS));
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(transport.calls_matching(LAN), 1);
    assert_eq!(transport.calls_matching(DDNS), 1);
}

#[tokio::test(start_paused = true)]
async fn test_race_failed_probe_does_not_win() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::Error("connection refused".to_string())])
            .on_after(DDNS, Duration::from_millis(500), vec![Reply::ok("pong")]),
    );

    let result = selector(&transport, ConnectionCategory::Ethernet)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.selected_url(), Some(DDNS));
}

#[tokio::test(start_paused = true)]
async fn test_race_both_fail() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::status(500)])
            .on(DDNS, vec![Reply::Error("dns".to_string())]),
    );

    let result = selector(&transport, ConnectionCategory::WiFi)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.failure_reason(), Some(ALL_ROUTES_FAILED));
}

#[tokio::test(start_paused = true)]
async fn test_race_shared_deadline() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::Hang])
            .on_after(DDNS, Duration::from_secs(3), vec![Reply::ok("pong")]),
    );

    let start = Instant::now();
    let result = selector(&transport, ConnectionCategory::Unknown)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.failure_reason(), Some(ALL_ROUTES_FAILED));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2100));
}

#[tokio::test]
async fn test_cellular_probes_secondary_only() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::ok("pong")])
            .on(DDNS, vec![Reply::ok("pong")]),
    );

    let result = selector(&transport, ConnectionCategory::Cellular)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.selected_url(), Some(DDNS));
    assert_eq!(transport.calls_matching(LAN), 0);
    assert_eq!(transport.calls_matching(DDNS), 1);
}

#[tokio::test]
async fn test_cellular_secondary_failure_is_single_probe_reason() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::ok("pong")])
            .on(DDNS, vec![Reply::status(503)]),
    );

    let result = selector(&transport, ConnectionCategory::Cellular)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.failure_reason(), Some(PING_FAILED));
    assert_eq!(transport.calls_matching(LAN), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cellular_race_when_policy_disabled() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_after(LAN, Duration::from_millis(50), vec![Reply::ok("pong")])
            .on_after(DDNS, Duration::from_millis(900), vec![Reply::ok("pong")]),
    );
    let policy = RoutePolicy {
        secondary_only_on_cellular: false,
        ..RoutePolicy::default()
    };

    let result = selector(&transport, ConnectionCategory::Cellular)
        .with_policy(policy)
        .select(&both(), &creds())
        .await;

    assert_eq!(result.selected_url(), Some(LAN));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_selection() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(LAN, vec![Reply::Hang])
            .on(DDNS, vec![Reply::Hang]),
    );
    let selector = selector(&transport, ConnectionCategory::WiFi);
    let signal = CancelSignal::new();

    let canceller = {
        let signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            signal.cancel();
        })
    };

    let start = Instant::now();
    let result = selector.select_with_cancel(&both(), &creds(), &signal).await;
    assert!(canceller.await.is_ok());

    assert_eq!(result.failure_reason(), Some(SELECTION_CANCELLED));
    assert!(start.elapsed() < Duration::from_secs(2));
}
