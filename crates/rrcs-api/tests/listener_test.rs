#![allow(clippy::unwrap_used)]
// Integration tests for `NotificationListener` over real loopback HTTP.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use rrcs_api::xmlrpc::{decode_response, encode_call};
use rrcs_api::{Error, NotificationListener, Value};

async fn post(addr: SocketAddr, path: &str, body: String) -> String {
    reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .header("content-type", "text/xml")
        .body(body)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_forwards_notifications_in_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = NotificationListener::bind("127.0.0.1:0".parse().unwrap(), "pri", tx)
        .await
        .unwrap();
    let addr = listener.local_addr();
    assert_ne!(addr.port(), 0);

    let reply = post(
        addr,
        "/",
        encode_call(
            "LogicSourceChange",
            &[Value::from("N0001"), Value::Int(5), Value::Bool(true)],
        ),
    )
    .await;
    assert_eq!(
        decode_response(&reply).unwrap(),
        Value::Array(vec![Value::from("N0001"), Value::Int(0)])
    );

    post(
        addr,
        "/RPC2",
        encode_call("ConfigurationChange", &[Value::from("N0002")]),
    )
    .await;

    let first = rx.recv().await.unwrap();
    assert_eq!(first.origin, "pri");
    assert_eq!(first.method, "LogicSourceChange");
    assert_eq!(first.params[1], Value::Int(5));

    let second = rx.recv().await.unwrap();
    assert_eq!(second.method, "ConfigurationChange");

    listener.shutdown().await;
}

#[tokio::test]
async fn test_malformed_call_gets_fault_and_is_not_forwarded() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = NotificationListener::bind("127.0.0.1:0".parse().unwrap(), "sec", tx)
        .await
        .unwrap();

    let reply = post(listener.local_addr(), "/", "<nonsense/>".into()).await;
    assert!(matches!(
        decode_response(&reply),
        Err(Error::Fault { code: -32700, .. })
    ));
    assert!(rx.try_recv().is_err());

    listener.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let listener = NotificationListener::bind("127.0.0.1:0".parse().unwrap(), "pri", tx)
        .await
        .unwrap();
    let addr = listener.local_addr();
    listener.shutdown().await;

    let result = reqwest::Client::new()
        .post(format!("http://{addr}/"))
        .body("<methodCall/>")
        .send()
        .await;
    assert!(result.is_err());
}
