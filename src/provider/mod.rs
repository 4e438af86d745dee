mod constants;
pub(crate) mod openai;

pub use constants::openai as defaults;
pub use openai::{OpenAiClient, OpenAiConfig};

use crate::core::ClientError;

/// Where the API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKey {
    /// Read from the `OPENAI_API_KEY` environment variable.
    Default,
    Custom(String),
}

impl ApiKey {
    pub fn resolve(self) -> Result<String, ClientError> {
        match self {
            ApiKey::Custom(key) => Ok(key),
            ApiKey::Default => std::env::var(constants::openai::API_KEY_ENV_VAR).map_err(|_| {
                ClientError::Configuration(format!(
                    "{} not set.",
                    constants::openai::API_KEY_ENV_VAR
                ))
            }),
        }
    }
}
