//! HTTP surface of the gateway.
//!
//! - `POST /produce/order`: publish the request body to the order exchange
//! - `GET /readiness`: always 200, does not check the broker

use std::{sync::Arc, time::Duration};

use amqp::{AmqpPublisher, Envelope, PublishChannel};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::{error::GatewayError, FailurePolicy, GatewayConfig};

pub const CONTENT_TYPE: &str = "application/json";

pub struct AppState<C = lapin::Channel> {
    pub publisher: Arc<AmqpPublisher<C>>,
    pub exchange: String,
    pub routing_key: String,
    pub publish_budget: Duration,
    pub failure_policy: FailurePolicy,
    pub max_body_bytes: usize,
}

impl<C> AppState<C> {
    pub fn new(publisher: Arc<AmqpPublisher<C>>, config: &GatewayConfig) -> Self {
        Self {
            publisher,
            exchange: config.mq_exchange.clone(),
            routing_key: config.mq_routing_key.clone(),
            publish_budget: config.publish_budget(),
            failure_policy: config.publish_failure_policy,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub fn create_router<C: PublishChannel>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/produce/order", post(produce_order::<C>))
        .route("/readiness", get(readiness))
        .with_state(state)
}

async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// Forwards the raw body to the broker once it is known to be a JSON object,
/// then echoes the decoded document back.
async fn produce_order<C: PublishChannel>(
    State(state): State<Arc<AppState<C>>>,
    request: Request,
) -> Result<(StatusCode, Json<Map<String, Value>>), GatewayError> {
    let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(GatewayError::BodyRead)?;

    let order: Map<String, Value> = serde_json::from_slice(&body)?;

    let envelope = Envelope::new(
        state.exchange.as_str(),
        state.routing_key.as_str(),
        CONTENT_TYPE,
        body,
    );
    info!(
        exchange = %state.exchange,
        routing_key = %state.routing_key,
        message_id = %envelope.message_id(),
        bytes = envelope.body().len(),
        "Preparing order production"
    );

    match state.publisher.publish(&envelope, state.publish_budget).await {
        Ok(()) => {
            info!(message_id = %envelope.message_id(), "Produced order");
            Ok((StatusCode::CREATED, Json(order)))
        }
        Err(e) => {
            error!(message_id = %envelope.message_id(), error = %e, "Failed to produce order");
            if state.failure_policy == FailurePolicy::Halt {
                halt();
            }
            Err(e.into())
        }
    }
}

fn halt() -> ! {
    error!("publish failure policy is halt, terminating");
    std::process::exit(1)
}
