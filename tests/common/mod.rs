//! Shared helpers for integration tests: canned API bodies and a tracing
//! layer that records the crate's log events.

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex};

use oai_client::{OpenAiClient, OpenAiConfig};
use serde_json::{Value, json};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const API_KEY: &str = "sk-test-key";

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Collects events emitted by `oai_client` while installed.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Events at INFO or more severe; policy internals log at DEBUG.
    pub fn records(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level <= Level::INFO)
            .collect()
    }

    pub fn single_record(&self) -> CapturedEvent {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one log record, got {records:?}");
        records.into_iter().next().unwrap()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("oai_client") {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

/// Install a capturing subscriber for the current thread.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn client_for(base_url: &str) -> OpenAiClient {
    OpenAiClient::from_config(config_for(base_url)).unwrap()
}

pub fn config_for(base_url: &str) -> OpenAiConfig {
    OpenAiConfig::new(API_KEY.to_string()).with_base_url(base_url.to_string())
}

pub fn permission_body() -> Value {
    json!({
        "id": "modelperm-7E2R4dMpcNVAI0yJxFfXWKbC",
        "object": "model_permission",
        "created": 1669066354,
        "allow_create_engine": false,
        "allow_sampling": true,
        "allow_logprobs": true,
        "allow_search_indices": false,
        "allow_view": true,
        "allow_fine_tuning": false,
        "organization": "*",
        "group": null,
        "is_blocking": false
    })
}

pub fn model_body(id: &str) -> Value {
    json!({
        "id": id,
        "object": "model",
        "created": 1649364042,
        "owned_by": "openai",
        "permission": [permission_body()],
        "root": id,
        "parent": null
    })
}

pub fn models_body() -> Value {
    json!({
        "object": "list",
        "data": [model_body("davinci-instruct-beta")]
    })
}

pub fn completion_body(prompt: &str, model: &str) -> Value {
    json!({
        "id": "cmpl-6Fh8LwPpEwl1MsoHFNYqzxZQ",
        "object": "text_completion",
        "created": 1669066354,
        "model": model,
        "choices": [{
            "text": format!("{prompt}\n\nThis is indeed a test"),
            "index": 0,
            "logprobs": null,
            "finish_reason": "length"
        }],
        "usage": { "prompt_tokens": 5, "completion_tokens": 6, "total_tokens": 11 }
    })
}
