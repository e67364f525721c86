//! Connection manager lifecycle tests: bind fallback, backoff,
//! budget exhaustion and deterministic detach.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use application::{ConnectionSettings, ServiceConnectionManager};
use domain::ConnectionState;
use domain::event::{ConnectionEvent, EventPublisher};
use domain::service::ServiceIdentity;
use infrastructure::service::MockServiceBinder;

/// Publisher that forwards every event into a channel for assertions.
struct ChannelEventPublisher {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelEventPublisher {
    fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(
        &self,
        event: ConnectionEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = self.tx.send(event);
        Ok(())
    }
}

fn vendor_identity() -> ServiceIdentity {
    ServiceIdentity::new("com.aurora.printservice", "/run/aurora-print/service.sock")
}

fn legacy_identity() -> ServiceIdentity {
    ServiceIdentity::new("com.horizon.printservice", "/run/horizon-print/service.sock")
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn scheduled_delays(events: &[ConnectionEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::ReconnectScheduled { delay_ms, .. } => Some(*delay_ms),
            _ => None,
        })
        .collect()
}

fn scheduled_attempts(events: &[ConnectionEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::ReconnectScheduled { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_initial_bind_retries_with_doubling_backoff() {
    let binder = Arc::new(MockServiceBinder::new());
    binder.fail_first_binds(3);
    let (publisher, mut events_rx) = ChannelEventPublisher::new();

    let manager = ServiceConnectionManager::attach(
        binder.clone(),
        Arc::new(publisher),
        ConnectionSettings::new(vec![vendor_identity()]),
    );

    let mut state_rx = manager.subscribe_state();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    let events = drain(&mut events_rx);
    assert_eq!(scheduled_delays(&events), vec![1000, 2000, 4000]);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ConnectionEvent::ServiceBound { .. }))
    );
    assert_eq!(binder.bind_count(), 4);

    manager.detach().await;
}

#[tokio::test(start_paused = true)]
async fn test_falls_back_to_second_candidate() {
    let binder = Arc::new(MockServiceBinder::new());
    binder.reject_identity("com.aurora.printservice").await;
    let (publisher, _events_rx) = ChannelEventPublisher::new();

    let manager = ServiceConnectionManager::attach(
        binder.clone(),
        Arc::new(publisher),
        ConnectionSettings::new(vec![vendor_identity(), legacy_identity()]),
    );

    let mut state_rx = manager.subscribe_state();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    // The vendor identity was tried first, the legacy one won
    assert_eq!(binder.bind_count(), 2);
    assert_eq!(
        binder.bound_identities().await,
        vec!["com.horizon.printservice".to_string()]
    );

    manager.detach().await;
}

#[tokio::test(start_paused = true)]
async fn test_lost_binding_rebinds_and_resets_backoff() {
    let binder = Arc::new(MockServiceBinder::new());
    let (publisher, mut events_rx) = ChannelEventPublisher::new();

    let manager = ServiceConnectionManager::attach(
        binder.clone(),
        Arc::new(publisher),
        ConnectionSettings::new(vec![vendor_identity()]),
    );

    let mut state_rx = manager.subscribe_state();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    // First loss and recovery
    binder.latest().await.unwrap().drop_binding();
    state_rx.wait_for(|s| !s.is_bound()).await.unwrap();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    // Second loss, the attempt counter must start at one again
    binder.latest().await.unwrap().drop_binding();
    state_rx.wait_for(|s| !s.is_bound()).await.unwrap();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    let events = drain(&mut events_rx);
    assert_eq!(scheduled_attempts(&events), vec![1, 1]);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ConnectionEvent::ServiceLost { .. }))
            .count(),
        2
    );
    assert_eq!(binder.bind_count(), 3);

    manager.detach().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_budget_exhaustion_parks_in_failed() {
    let binder = Arc::new(MockServiceBinder::new());
    binder.reject_identity("com.aurora.printservice").await;
    let (publisher, mut events_rx) = ChannelEventPublisher::new();

    let mut settings = ConnectionSettings::new(vec![vendor_identity()]);
    settings.max_reconnect_attempts = 2;

    let manager = ServiceConnectionManager::attach(binder.clone(), Arc::new(publisher), settings);

    let mut state_rx = manager.subscribe_state();
    state_rx
        .wait_for(|s| *s == ConnectionState::Failed)
        .await
        .unwrap();

    let events = drain(&mut events_rx);
    assert_eq!(scheduled_attempts(&events), vec![1, 2]);
    let exhausted = events.iter().find_map(|e| match e {
        ConnectionEvent::ReconnectExhausted { attempts, .. } => Some(*attempts),
        _ => None,
    });
    assert_eq!(exhausted, Some(2));
    // Initial bind plus the two budgeted rebinds
    assert_eq!(binder.bind_count(), 3);
    assert!(!manager.is_connected());

    manager.detach().await;
}

#[tokio::test(start_paused = true)]
async fn test_detach_cancels_pending_reconnect() {
    let binder = Arc::new(MockServiceBinder::new());
    binder.reject_identity("com.aurora.printservice").await;
    let (publisher, mut events_rx) = ChannelEventPublisher::new();

    let manager = ServiceConnectionManager::attach(
        binder,
        Arc::new(publisher),
        ConnectionSettings::new(vec![vendor_identity()]),
    );

    let mut state_rx = manager.subscribe_state();
    state_rx
        .wait_for(|s| matches!(s, ConnectionState::Reconnecting))
        .await
        .unwrap();

    manager.detach().await;

    assert_eq!(*state_rx.borrow(), ConnectionState::Unbound);
    let events = drain(&mut events_rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ConnectionEvent::Detached { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_detach_from_bound_releases_cleanly() {
    let binder = Arc::new(MockServiceBinder::new());
    let (publisher, mut events_rx) = ChannelEventPublisher::new();

    let manager = ServiceConnectionManager::attach(
        binder,
        Arc::new(publisher),
        ConnectionSettings::new(vec![vendor_identity()]),
    );

    let mut state_rx = manager.subscribe_state();
    state_rx.wait_for(|s| s.is_bound()).await.unwrap();

    manager.detach().await;

    assert_eq!(*state_rx.borrow(), ConnectionState::Unbound);
    let events = drain(&mut events_rx);
    assert_eq!(
        events.last().map(|e| e.event_type().to_string()),
        Some("Detached".to_string())
    );
}
