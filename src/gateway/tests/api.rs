mod common;

use std::time::Duration;

use amqp::{mock::Behaviour, PERSISTENT};
use axum::{body::Body, http::Request};
use common::{send, TestContext, MOCK_EXCHANGE, MOCK_ROUTING_KEY};
use order_gateway::lifecycle::{wait_for_shutdown, Shutdown};
use serde_json::json;

#[tokio::test]
async fn order_is_published_and_echoed() {
    let ctx = TestContext::new(Behaviour::Ack);
    let order = r#"{"id":"42","item":"widget"}"#;

    let (status, body) = ctx.post_order(order).await;

    assert_eq!(status, 201);
    assert_eq!(body, order.as_bytes());

    let received = ctx.broker.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].exchange, MOCK_EXCHANGE);
    assert_eq!(received[0].routing_key, MOCK_ROUTING_KEY);
    assert_eq!(received[0].body, order.as_bytes());
    assert_eq!(received[0].properties.delivery_mode(), &Some(PERSISTENT));
    assert_eq!(
        received[0]
            .properties
            .content_type()
            .as_ref()
            .map(|c| c.as_str()),
        Some("application/json")
    );
}

#[tokio::test]
async fn raw_bytes_are_forwarded_not_the_reencoded_document() {
    let ctx = TestContext::new(Behaviour::Ack);
    let order = "{\n  \"item\" : \"widget\",\n  \"id\": \"42\",\n  \"qty\": 1.50\n}";

    let (status, body) = ctx.post_order(order).await;
    assert_eq!(status, 201);

    // The echo is the decoded document and decodes to the same value.
    let echoed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let sent: serde_json::Value = serde_json::from_str(order).unwrap();
    assert_eq!(echoed, sent);
    assert!(body.starts_with(br#"{"item":"widget","id":"42""#));

    assert_eq!(ctx.broker.received()[0].body, order.as_bytes());
}

#[tokio::test]
async fn malformed_bodies_are_rejected_without_publishing() {
    let ctx = TestContext::new(Behaviour::Ack);

    let bodies = [
        "",
        "{",
        r#"{"id":"42","item":}"#,
        "not json",
        "[1,2]",
        "\"42\"",
        r#"{"id":"42"} trailing"#,
    ];

    for body in bodies {
        let (status, response) = ctx.post_order(body).await;

        assert_eq!(status, 400, "body {body:?}");
        let response: serde_json::Value = serde_json::from_slice(&response).unwrap();
        assert_eq!(response, json!({ "error": "Invalid request payload" }));
    }

    assert!(ctx.broker.received().is_empty());
}

#[tokio::test]
async fn empty_body_is_a_client_error() {
    let ctx = TestContext::new(Behaviour::Ack);

    let (status, _) = ctx.post_order(Body::empty()).await;

    assert_eq!(status, 400);
    assert!(ctx.broker.received().is_empty());
}

#[tokio::test]
async fn unreadable_body_is_a_server_error() {
    let ctx = TestContext::new(Behaviour::Ack);
    let chunks = futures::stream::iter([
        Ok::<_, std::io::Error>(bytes_of(r#"{"id":"#)),
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "client went away",
        )),
    ]);

    let (status, body) = ctx.post_order(Body::from_stream(chunks)).await;

    assert_eq!(status, 500);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "Error reading request body" }));
    assert!(ctx.broker.received().is_empty());
}

#[tokio::test]
async fn oversized_body_is_a_server_error() {
    let ctx = TestContext::new(Behaviour::Ack);
    let order = format!(r#"{{"id":"42","pad":"{}"}}"#, "x".repeat(128 * 1024));

    let (status, _) = ctx.post_order(order).await;

    assert_eq!(status, 500);
    assert!(ctx.broker.received().is_empty());
}

#[tokio::test]
async fn broker_rejection_is_a_server_error() {
    let ctx = TestContext::new(Behaviour::Nack);

    let (status, body) = ctx.post_order(r#"{"id":"42"}"#).await;

    assert_eq!(status, 500);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "Failed to produce order" }));
}

#[tokio::test]
async fn transport_failure_is_a_server_error_and_serving_continues() {
    let ctx = TestContext::new(Behaviour::Fail);

    let (status, _) = ctx.post_order(r#"{"id":"1"}"#).await;
    assert_eq!(status, 500);

    ctx.broker.set_behaviour(Behaviour::Ack);
    let (status, _) = ctx.post_order(r#"{"id":"2"}"#).await;
    assert_eq!(status, 201);
    assert_eq!(ctx.broker.received().len(), 1);
}

#[tokio::test]
async fn closed_channel_fails_the_request_and_stops_serving() {
    let ctx = TestContext::new(Behaviour::ChannelClosed);

    let (status, _) = ctx.post_order(r#"{"id":"42","item":"widget"}"#).await;
    assert_eq!(status, 500);
    assert!(ctx.lost.is_tripped());

    let reason = tokio::time::timeout(
        Duration::from_secs(1),
        wait_for_shutdown(std::future::pending(), ctx.lost.tripped()),
    )
    .await
    .unwrap();
    assert_eq!(reason, Shutdown::BrokerLost);
    assert!(reason.into_result().is_err());
}

#[tokio::test]
async fn transient_failures_keep_serving() {
    let ctx = TestContext::new(Behaviour::Nack);

    let (status, _) = ctx.post_order(r#"{"id":"42"}"#).await;
    assert_eq!(status, 500);
    assert!(!ctx.lost.is_tripped());
}

#[tokio::test]
async fn unconfirmed_publish_fails_once_the_budget_is_spent() {
    let ctx = TestContext::with_budget(Behaviour::Stall, Duration::from_millis(50));

    let (status, _) = ctx.post_order(r#"{"id":"42","item":"widget"}"#).await;

    assert_eq!(status, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_reach_the_broker_intact() {
    let n = 100;
    let ctx = TestContext::new(Behaviour::Ack);

    let requests = (0..n).map(|i| {
        let body = format!(r#"{{"id":"{i}","item":"widget"}}"#);
        let request = Request::post("/produce/order")
            .body(Body::from(body))
            .unwrap();
        tokio::spawn(send(ctx.app.clone(), request))
    });

    for result in futures::future::join_all(requests).await {
        assert_eq!(result.unwrap().0, 201);
    }

    assert_eq!(ctx.broker.overlapping_publishes(), 0);
    let received = ctx.broker.received();
    assert_eq!(received.len(), n);

    let mut ids = received
        .iter()
        .map(|m| {
            let doc: serde_json::Value = serde_json::from_slice(&m.body).unwrap();
            assert_eq!(doc["item"], "widget");
            assert_eq!(m.properties.delivery_mode(), &Some(PERSISTENT));
            doc["id"].as_str().unwrap().parse::<usize>().unwrap()
        })
        .collect::<Vec<_>>();
    ids.sort_unstable();
    assert_eq!(ids, (0..n).collect::<Vec<_>>());
}

#[tokio::test]
async fn readiness_is_ok_with_empty_body_even_when_broker_fails() {
    let ctx = TestContext::new(Behaviour::Fail);

    let request = Request::get("/readiness").body(Body::empty()).unwrap();
    let (status, body) = send(ctx.app.clone(), request).await;

    assert_eq!(status, 200);
    assert!(body.is_empty());
}

#[tokio::test]
async fn wrong_method_is_not_allowed() {
    let ctx = TestContext::new(Behaviour::Ack);

    let request = Request::get("/produce/order").body(Body::empty()).unwrap();
    let (status, _) = send(ctx.app.clone(), request).await;

    assert_eq!(status, 405);
    assert!(ctx.broker.received().is_empty());
}

fn bytes_of(s: &'static str) -> Vec<u8> {
    s.as_bytes().to_vec()
}
