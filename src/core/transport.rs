//! Transport handle acquisition.
//!
//! A handle is a `reqwest::Client`. It is either held directly by the
//! executor or produced per call by a [`TransportFactory`] keyed by client
//! name. Either way the executor only ever owns a cheap clone for the
//! duration of one call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use super::error::ClientError;
use super::http::HttpClientConfig;

/// Produces transport handles by client name.
pub trait TransportFactory: Send + Sync {
    fn create_client(&self, name: &str) -> Result<reqwest::Client, ClientError>;
}

/// How the executor obtains its transport handle. Fixed at construction.
#[derive(Clone)]
pub enum Transport {
    /// One handle reused by every call.
    Direct(reqwest::Client),
    /// A handle requested from the factory on every call.
    Factory {
        factory: Arc<dyn TransportFactory>,
        name: String,
    },
}

impl Transport {
    pub fn direct(config: &HttpClientConfig) -> Result<Self, ClientError> {
        Ok(Transport::Direct(build_client(config)?))
    }

    pub fn factory(factory: Arc<dyn TransportFactory>, name: impl Into<String>) -> Self {
        Transport::Factory {
            factory,
            name: name.into(),
        }
    }

    pub(crate) fn acquire(&self) -> Result<reqwest::Client, ClientError> {
        match self {
            Transport::Direct(client) => Ok(client.clone()),
            Transport::Factory { factory, name } => factory.create_client(name),
        }
    }
}

pub(crate) fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ClientError::Configuration(format!("Failed to build reqwest client: {e}")))
}

struct PooledHandle {
    client: reqwest::Client,
    created: Instant,
}

/// Caches one client per name and rebuilds it once its handler lifetime has
/// elapsed, so DNS changes are eventually picked up.
#[derive(Default)]
pub struct PooledTransportFactory {
    default_config: HttpClientConfig,
    configs: HashMap<String, HttpClientConfig>,
    handles: Mutex<HashMap<String, PooledHandle>>,
}

impl PooledTransportFactory {
    pub fn new(default_config: HttpClientConfig) -> Self {
        Self {
            default_config,
            configs: HashMap::new(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Use `config` for clients created under `name`.
    pub fn with_client(mut self, name: impl Into<String>, config: HttpClientConfig) -> Self {
        self.configs.insert(name.into(), config);
        self
    }

    fn config_for(&self, name: &str) -> &HttpClientConfig {
        self.configs.get(name).unwrap_or(&self.default_config)
    }
}

impl TransportFactory for PooledTransportFactory {
    fn create_client(&self, name: &str) -> Result<reqwest::Client, ClientError> {
        let config = self.config_for(name);
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(handle) = handles.get(name) {
            if handle.created.elapsed() < config.handler_lifetime {
                return Ok(handle.client.clone());
            }
            debug!(client = name, "Handler lifetime elapsed, rebuilding client");
        }

        let client = build_client(config)?;
        handles.insert(
            name.to_string(),
            PooledHandle {
                client: client.clone(),
                created: Instant::now(),
            },
        );
        Ok(client)
    }
}
