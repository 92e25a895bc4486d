//! Facade behavior: send paths, explicit disconnect, manual reconnect,
//! inbound delivery, and the degraded no-op client.

mod support;

use std::time::Duration;

use liveline_client::{
    DisconnectReason, EventKind, IdentityStore, LifecycleEvent, Operation, RealtimeClient,
    SendOutcome, SessionState,
};
use serde_json::Value;
use support::{eventually, run_local, test_config, ConnectOutcome, EventLog, ScriptedNetwork,
    TestProviders};

const A: &str = "primary:5000";
const B: &str = "secondary:3000";

/// While connected, send delivers immediately with no queueing.
#[test]
fn send_while_connected_delivers_immediately() {
    run_local(async {
        let network = ScriptedNetwork::new();
        network.script(A, vec![ConnectOutcome::Accept]);

        let client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[A]),
            IdentityStore::new(),
        );
        assert!(
            eventually(|| client.is_connected(), Duration::from_secs(2)).await,
            "client should connect"
        );

        let op = Operation::new("sendMessage", vec![Value::from("live")]);
        assert_eq!(client.send(op), SendOutcome::Sent);
        assert_eq!(client.queue_size(), 0);

        let mut server = network.next_accepted().await;
        let received = server.read_op().await.expect("operation should arrive");
        assert_eq!(received.args[0], Value::from("live"));
        assert_eq!(client.metrics().messages_sent, 1);
    });
}

/// An explicit disconnect is terminal: the state stays `Disconnected` and
/// no automatic retry happens.
#[test]
fn explicit_disconnect_does_not_auto_retry() {
    run_local(async {
        let network = ScriptedNetwork::new();
        network.script(A, vec![ConnectOutcome::Accept]);

        let client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[A]),
            IdentityStore::new(),
        );
        let log = EventLog::attach(&client);
        assert!(
            eventually(|| client.is_connected(), Duration::from_secs(2)).await,
            "client should connect"
        );
        let attempts_before = network.attempts().len();

        client.disconnect();
        assert!(
            eventually(
                || log.contains(&LifecycleEvent::Disconnected(DisconnectReason::LocalClose)),
                Duration::from_secs(2)
            )
            .await,
            "local close event should be emitted"
        );

        // Long enough for any redial delay or backoff to have fired.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(client.state(), SessionState::Disconnected);
        assert_eq!(network.attempts().len(), attempts_before);
        assert_eq!(log.count(EventKind::Disconnected), 1);
    });
}

/// Manual reconnect tears the session down and dials the first endpoint
/// again immediately.
#[test]
fn manual_reconnect_restarts_from_first_endpoint() {
    run_local(async {
        let network = ScriptedNetwork::new();
        network.script(A, vec![ConnectOutcome::Refuse, ConnectOutcome::Refuse]);
        network.script(B, vec![ConnectOutcome::Accept]);

        let client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[A, B]),
            IdentityStore::new(),
        );
        let log = EventLog::attach(&client);
        assert!(
            eventually(|| client.is_connected(), Duration::from_secs(2)).await,
            "client should connect to the secondary endpoint"
        );
        assert_eq!(network.attempts(), vec![A, A, B]);

        client.manual_reconnect();
        assert!(
            eventually(
                || log.count(EventKind::Reconnected) == 1,
                Duration::from_secs(2)
            )
            .await,
            "client should reconnect after the manual request"
        );
        // The fresh dial starts from the first endpoint, which accepts now
        // that its script is exhausted.
        assert_eq!(network.attempts(), vec![A, A, B, A]);
        assert!(client.is_connected());
    });
}

/// Inbound frames from the server surface as decoded operations.
#[test]
fn inbound_operations_reach_the_receiver() {
    run_local(async {
        let network = ScriptedNetwork::new();
        network.script(A, vec![ConnectOutcome::Accept]);

        let mut client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[A]),
            IdentityStore::new(),
        );
        let mut inbound = client.take_receiver().expect("receiver not yet taken");
        assert!(client.take_receiver().is_none());

        assert!(
            eventually(|| client.is_connected(), Duration::from_secs(2)).await,
            "client should connect"
        );

        let mut server = network.next_accepted().await;
        let pushed = Operation::new("newMessage", vec![Value::from("hi")]);
        server.write_op(&pushed).await;

        let received = tokio::time::timeout(Duration::from_secs(2), inbound.recv())
            .await
            .expect("inbound operation should arrive in time")
            .expect("channel should be open");
        assert_eq!(received, pushed);
    });
}

/// A client that cannot start degrades to a no-op: every method is safe
/// and nothing panics.
#[test]
fn degraded_client_is_a_safe_noop() {
    run_local(async {
        let network = ScriptedNetwork::new();
        let mut client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[]),
            IdentityStore::new(),
        );

        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(
            client.send(Operation::new("sendMessage", vec![])),
            SendOutcome::Dropped
        );

        client.connect();
        client.manual_reconnect();
        client.disconnect();

        let id = client.on(EventKind::Connected, |_| {});
        assert!(client.off(id));
        assert!(client.take_receiver().is_none());
        client.close().await;

        // Nothing was ever dialed.
        assert!(network.attempts().is_empty());
        assert_eq!(client.queue_size(), 0);
    });
}

/// Closing the client stops its background tasks.
#[test]
fn close_stops_the_driver() {
    run_local(async {
        let network = ScriptedNetwork::new();
        network.script(A, vec![ConnectOutcome::Accept]);

        let mut client = RealtimeClient::new(
            TestProviders::new(network.clone()),
            test_config(&[A]),
            IdentityStore::new(),
        );
        assert!(
            eventually(|| client.is_connected(), Duration::from_secs(2)).await,
            "client should connect"
        );

        client.close().await;
        assert_eq!(client.state(), SessionState::Disconnected);
    });
}
