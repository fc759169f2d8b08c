use std::{sync::Arc, time::Duration};

use amqp::{
    mock::{Behaviour, MockChannel},
    AmqpPublisher, LossSignal,
};
use axum::{body::Body, http::Request, Router};
use order_gateway::{api, FailurePolicy};
use tower::ServiceExt;

pub const MOCK_EXCHANGE: &str = "order-service-exchange";
pub const MOCK_ROUTING_KEY: &str = "provisioning";

pub struct TestContext {
    pub broker: MockChannel,
    pub lost: LossSignal,
    pub app: Router,
}

impl TestContext {
    pub fn new(behaviour: Behaviour) -> Self {
        Self::with_budget(behaviour, Duration::from_secs(5))
    }

    pub fn with_budget(behaviour: Behaviour, publish_budget: Duration) -> Self {
        let broker = MockChannel::new(behaviour);
        let lost = LossSignal::new();
        let state = api::AppState {
            publisher: Arc::new(AmqpPublisher::with_loss_signal(broker.clone(), lost.clone())),
            exchange: MOCK_EXCHANGE.into(),
            routing_key: MOCK_ROUTING_KEY.into(),
            publish_budget,
            failure_policy: FailurePolicy::Respond,
            max_body_bytes: 64 * 1024,
        };

        Self {
            broker,
            lost,
            app: api::create_router(Arc::new(state)),
        }
    }

    pub async fn post_order(&self, body: impl Into<Body>) -> (u16, Vec<u8>) {
        let request = Request::post("/produce/order")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        send(self.app.clone(), request).await
    }
}

pub async fn send(app: Router, request: Request<Body>) -> (u16, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}
