//! Tests for connection management: backoff maths, endpoint handling,
//! and connect/close behaviour against local listeners

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::*;

// =============================================================================
// Backoff
// =============================================================================

#[test]
fn test_backoff_first_attempt_is_immediate() {
    assert_eq!(backoff_delay(0), Duration::ZERO);
    assert_eq!(backoff_delay(1), Duration::ZERO);
}

#[test]
fn test_backoff_second_attempt_near_base() {
    for _ in 0..100 {
        let delay = backoff_delay(2).as_secs_f64();
        assert!((0.8..=1.2).contains(&delay), "delay {delay} out of range");
    }
}

#[test]
fn test_backoff_grows_with_attempts() {
    // Nominal 1.5^2 = 2.25s at attempt 4, jittered ±20%
    for _ in 0..100 {
        let delay = backoff_delay(4).as_secs_f64();
        assert!((1.8..=2.7).contains(&delay), "delay {delay} out of range");
    }
}

#[test]
fn test_backoff_caps_at_maximum() {
    // Far beyond the cap the nominal pins to 30s, jittered ±20%
    for _ in 0..100 {
        let delay = backoff_delay(60).as_secs_f64();
        assert!((24.0..=36.0).contains(&delay), "delay {delay} out of range");
    }
}

// =============================================================================
// Endpoint parsing
// =============================================================================

#[test]
fn test_split_endpoint_host_and_port() {
    assert_eq!(
        split_endpoint("collect.usercanal.com:50000"),
        ("collect.usercanal.com".to_string(), 50000)
    );
    assert_eq!(
        split_endpoint("127.0.0.1:7070"),
        ("127.0.0.1".to_string(), 7070)
    );
}

#[test]
fn test_split_endpoint_defaults_port() {
    assert_eq!(
        split_endpoint("collect.usercanal.com"),
        ("collect.usercanal.com".to_string(), DEFAULT_PORT)
    );
}

#[test]
fn test_split_endpoint_bad_port_falls_back() {
    // Unparseable port: the whole string is treated as a host
    assert_eq!(
        split_endpoint("host:notaport"),
        ("host:notaport".to_string(), DEFAULT_PORT)
    );
}

// =============================================================================
// Connect / close
// =============================================================================

#[tokio::test]
async fn test_connect_to_live_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let manager = ConnManager::new(addr.to_string());
    let ctx = CancellationToken::new();

    manager.connect(&ctx).await.unwrap();
    assert_eq!(manager.state_name(), "connected");
    assert_eq!(manager.attempts(), 1);
    assert!(manager.writer().await.is_some());
}

#[tokio::test]
async fn test_connect_failure_sets_failed_state() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let manager = ConnManager::new(addr.to_string());
    let ctx = CancellationToken::new();

    let err = manager.connect(&ctx).await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(manager.state_name(), "failed");
}

#[tokio::test]
async fn test_connect_after_close_is_rejected() {
    let manager = ConnManager::new("127.0.0.1:1");
    manager.close().await;

    let err = manager.connect(&CancellationToken::new()).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let manager = ConnManager::new("127.0.0.1:1");
    manager.start();
    manager.close().await;
    manager.close().await;
    assert_eq!(manager.state_name(), "idle");
}

#[tokio::test]
async fn test_retry_task_reconnects_on_signal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let manager = ConnManager::new(addr.to_string());
    manager.start();

    manager.signal_retry();

    // The retry task should connect on the first attempt (no backoff)
    let mut connected = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if manager.reconnect_count() == 1 {
            connected = true;
            break;
        }
    }
    assert!(connected, "retry task never reconnected");
    assert_eq!(manager.state_name(), "connected");

    manager.close().await;
}

#[tokio::test]
async fn test_state_change_notifications() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let manager = ConnManager::new(addr.to_string());
    let mut state_rx = manager.take_state_changes().unwrap();
    // Single consumer: a second take yields nothing
    assert!(manager.take_state_changes().is_none());

    manager.connect(&CancellationToken::new()).await.unwrap();

    // Bounded channel of 1: at least one transition is observable
    let change = state_rx.recv().await.unwrap();
    assert!(matches!(
        change.state,
        ConnState::Connecting | ConnState::Connected
    ));
}

#[tokio::test]
async fn test_dns_stats_after_resolution() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let manager = ConnManager::new(format!("localhost:{}", addr.port()));
    manager.connect(&CancellationToken::new()).await.unwrap();

    let (resolved, last_resolution, _failures) = manager.dns_stats();
    assert!(resolved >= 1);
    assert!(last_resolution.is_some());
}
