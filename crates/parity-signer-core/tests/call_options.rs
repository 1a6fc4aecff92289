mod common;

use std::future::pending;
use std::time::Duration;

use futures::future::AbortHandle;
use serde::Deserialize;
use serde_json::{json, Value};

use parity_signer_core::{execute_typed, CallOptions, Transport, TransportError};

use common::ScriptedTransport;

#[tokio::test(start_paused = true)]
async fn timeout_bounds_a_stalled_call() {
    let options = CallOptions::with_timeout(Duration::from_millis(250));
    let err = options
        .run(pending::<Result<Value, TransportError>>())
        .await
        .expect_err("stalled call");
    assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_millis(250)));
}

#[tokio::test]
async fn abort_handle_cancels_the_call() {
    let (handle, registration) = AbortHandle::new_pair();
    let options = CallOptions::default().abortable(registration);
    handle.abort();
    let err = options
        .run(pending::<Result<Value, TransportError>>())
        .await
        .expect_err("aborted call");
    assert!(matches!(err, TransportError::Cancelled));
}

#[tokio::test]
async fn explicit_timeout_wins_over_default() {
    let options = CallOptions::with_timeout(Duration::from_secs(1))
        .or_default_timeout(Some(Duration::from_secs(30)));
    assert_eq!(options.timeout, Some(Duration::from_secs(1)));

    let options = CallOptions::default().or_default_timeout(Some(Duration::from_secs(30)));
    assert_eq!(options.timeout, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn completed_call_passes_through() {
    let value = CallOptions::with_timeout(Duration::from_secs(5))
        .run(async { Ok::<_, TransportError>(json!("0x1")) })
        .await
        .expect("result");
    assert_eq!(value, json!("0x1"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Peers {
    active: u64,
    connected: u64,
    max: u64,
}

#[tokio::test]
async fn execute_typed_decodes_result() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({"active": 3, "connected": 5, "max": 25}));
    let peers: Peers = execute_typed(&transport, "parity_netPeers", Vec::new())
        .await
        .expect("peers");
    assert_eq!(
        peers,
        Peers {
            active: 3,
            connected: 5,
            max: 25
        }
    );
}

#[tokio::test]
async fn execute_typed_reports_shape_mismatch() {
    let transport = ScriptedTransport::new();
    transport.reply(json!("not peers"));
    let err = execute_typed::<Peers, _>(&transport, "parity_netPeers", Vec::new())
        .await
        .expect_err("mismatch");
    assert!(matches!(err, TransportError::Decode(ref msg) if msg.starts_with("parity_netPeers")));
}

#[tokio::test]
async fn execute_uses_fresh_ids() {
    let transport = ScriptedTransport::new();
    transport.reply(json!(1)).reply(json!(2));
    transport.execute("eth_blockNumber", Vec::new()).await.expect("first");
    transport.execute("eth_blockNumber", Vec::new()).await.expect("second");
    assert_eq!(transport.encoder().last_id(), Some(2));
}
