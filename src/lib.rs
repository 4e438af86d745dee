//! # oai-client
//!
//! A small typed client for the OpenAI text-completion API: list models, get a
//! model, create a completion.
//!
//! Every call goes through one shared executor that authenticates the
//! request, logs the outcome once through `tracing` and decodes the JSON body.
//! Failures come back as a [`ClientError`] whose [`FailureKind`] separates
//! transport, HTTP and decode problems.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oai_client::{CompletionRequest, OpenAiClient, OpenAiConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAiClient::from_config(OpenAiConfig::from_env()?)?;
//!
//!     let models = client.list_models().await?;
//!     println!("{} models available", models.models.len());
//!
//!     let request = CompletionRequest::new("text-davinci-002", "Say this is a test")
//!         .with_max_tokens(6)
//!         .with_temperature(0.0);
//!     let completion = client.create_completion(&request).await?;
//!     println!("{}", completion.choices[0].text);
//!     Ok(())
//! }
//! ```
//!
//! Server-sent-event streaming is not supported; `CompletionRequest::stream`
//! is sent as given but the response is always decoded as a single JSON body.

pub mod completions;
pub mod core;
pub mod models;
pub mod provider;

pub use completions::{Choice, ChoiceLogProbs, CompletionRequest, CompletionResponse, Usage};
pub use crate::core::{
    Call, CircuitBreakerPolicy, ClientError, FailureKind, HttpClient, HttpClientConfig,
    JsonOptions, PooledTransportFactory, RetryPolicy, Transport, TransportFactory,
    TransportPolicy,
};
pub use models::{ModelPermission, ModelResponse, ModelsResponse};
pub use provider::{ApiKey, OpenAiClient, OpenAiConfig};
