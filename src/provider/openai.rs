//! OpenAI text-completion endpoints: model listing, model detail and
//! completions.

use std::sync::Arc;

use reqwest::header::HeaderValue;
use tokio_util::sync::CancellationToken;

use crate::completions::{CompletionRequest, CompletionResponse};
use crate::core::{
    Call, ClientError, HttpClient, HttpClientConfig, JsonOptions, Transport, TransportFactory,
    TransportPolicy,
};
use crate::models::{ModelResponse, ModelsResponse};
use crate::provider::ApiKey;
use crate::provider::constants::openai;

const LIST_MODELS_SUCCESS: &str = "Successfully retrieved models from OpenAI.";
const LIST_MODELS_FAILURE: &str = "Failed to retrieve models from OpenAI.";
const CREATE_COMPLETION_SUCCESS: &str = "Successfully created completion from OpenAI.";
const CREATE_COMPLETION_FAILURE: &str = "Failed to create completion from OpenAI.";

/// Client configuration, built once at startup.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Route prefix, e.g. `v1`
    pub api_version: String,
    /// Sent as `OpenAI-Organization` when set
    pub organization: Option<String>,
    /// Name handed to the transport factory in factory mode
    pub client_name: String,
    pub user_agent: Option<String>,
    pub http_config: HttpClientConfig,
    pub json_options: JsonOptions,
    pub retry_policy: Option<Arc<dyn TransportPolicy>>,
    pub circuit_breaker_policy: Option<Arc<dyn TransportPolicy>>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    http_client: Option<reqwest::Client>,
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: openai::API_BASE.to_string(),
            api_version: openai::API_VERSION.to_string(),
            organization: None,
            client_name: openai::CLIENT_NAME.to_string(),
            user_agent: None,
            http_config: HttpClientConfig::default(),
            json_options: JsonOptions::default(),
            retry_policy: None,
            circuit_breaker_policy: None,
            transport_factory: None,
            http_client: None,
        }
    }

    /// Build a configuration from `OPENAI_API_KEY` and the optional
    /// `OPENAI_BASE_URL`, `OPENAI_API_VERSION` and `OPENAI_ORGANIZATION`.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::new(ApiKey::Default.resolve()?);

        if let Ok(base_url) = std::env::var(openai::BASE_URL_ENV_VAR) {
            config.base_url = base_url;
        }
        if let Ok(api_version) = std::env::var(openai::API_VERSION_ENV_VAR) {
            config.api_version = api_version;
        }
        config.organization = std::env::var(openai::ORGANIZATION_ENV_VAR).ok();

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_organization(mut self, organization: String) -> Self {
        self.organization = Some(organization);
        self
    }

    pub fn with_client_name(mut self, client_name: String) -> Self {
        self.client_name = client_name;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    pub fn with_json_options(mut self, options: JsonOptions) -> Self {
        self.json_options = options;
        self
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn TransportPolicy>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_circuit_breaker_policy(mut self, policy: Arc<dyn TransportPolicy>) -> Self {
        self.circuit_breaker_policy = Some(policy);
        self
    }

    /// Factory mode: ask `factory` for a handle named `client_name` on every call.
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Direct mode with a caller-supplied handle instead of one built from
    /// `http_config`.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    fn transport(&self) -> Result<Transport, ClientError> {
        if let Some(factory) = &self.transport_factory {
            return Ok(Transport::factory(factory.clone(), self.client_name.clone()));
        }

        match &self.http_client {
            Some(client) => Ok(Transport::Direct(client.clone())),
            None => Transport::direct(&self.http_config),
        }
    }

    /// Reject credentials and header values that can never be sent.
    fn validate_headers(&self) -> Result<(), ClientError> {
        if !self.api_key.trim().is_empty() {
            check_header_value("Authorization", &format!("Bearer {}", self.api_key))?;
        }
        if let Some(organization) = &self.organization {
            check_header_value(openai::ORGANIZATION_HEADER, organization)?;
        }
        if let Some(user_agent) = &self.user_agent {
            check_header_value("User-Agent", user_agent)?;
        }
        Ok(())
    }

    fn route(&self, endpoint: &str) -> String {
        let version = self.api_version.trim_matches('/');
        if version.is_empty() {
            endpoint.to_string()
        } else {
            format!("{version}/{endpoint}")
        }
    }
}

fn check_header_value(name: &str, value: &str) -> Result<(), ClientError> {
    HeaderValue::from_str(value)
        .map(|_| ())
        .map_err(|e| ClientError::Configuration(format!("Invalid {name} header value: {e}")))
}

/// Typed client for the OpenAI text-completion API.
///
/// Every method sends the configured API key and returns the decoded body or
/// a [`ClientError`] whose [`kind`](ClientError::kind) tells transport, HTTP
/// and decode failures apart. Each call emits exactly one log record.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: HttpClient,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Result<Self, ClientError> {
        Self::from_config(OpenAiConfig::new(api_key))
    }

    pub fn from_config(config: OpenAiConfig) -> Result<Self, ClientError> {
        config.validate_headers()?;

        let mut http = HttpClient::new(config.transport()?, config.base_url.clone())
            .with_json_options(config.json_options);

        if let Some(user_agent) = &config.user_agent {
            http = http.with_user_agent(user_agent.clone());
        }
        if let Some(organization) = &config.organization {
            http = http.with_header(openai::ORGANIZATION_HEADER, organization.clone());
        }
        // Retry wraps the circuit breaker so every retry is admitted by it.
        if let Some(policy) = &config.retry_policy {
            http = http.with_policy(policy.clone());
        }
        if let Some(policy) = &config.circuit_breaker_policy {
            http = http.with_policy(policy.clone());
        }

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// `GET {api_version}/models`
    pub async fn list_models(&self) -> Result<ModelsResponse, ClientError> {
        self.http.get_json(self.list_models_call()).await
    }

    pub async fn list_models_with_cancellation(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<ModelsResponse, ClientError> {
        let call = self.list_models_call().cancellation(cancellation);
        self.http.get_json(call).await
    }

    /// `GET {api_version}/models/{model_id}`, with `model_id` percent-encoded.
    pub async fn get_model(&self, model_id: &str) -> Result<ModelResponse, ClientError> {
        self.http.get_json(self.get_model_call(model_id)).await
    }

    pub async fn get_model_with_cancellation(
        &self,
        model_id: &str,
        cancellation: &CancellationToken,
    ) -> Result<ModelResponse, ClientError> {
        let call = self.get_model_call(model_id).cancellation(cancellation);
        self.http.get_json(call).await
    }

    /// `POST {api_version}/completions`
    pub async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ClientError> {
        self.http
            .post_json(self.create_completion_call(), request)
            .await
    }

    pub async fn create_completion_with_cancellation(
        &self,
        request: &CompletionRequest,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResponse, ClientError> {
        let call = self.create_completion_call().cancellation(cancellation);
        self.http.post_json(call, request).await
    }

    fn list_models_call(&self) -> Call<'_> {
        Call::new(
            self.config.route(openai::MODELS_ENDPOINT),
            LIST_MODELS_SUCCESS,
            LIST_MODELS_FAILURE,
        )
        .bearer(&self.config.api_key)
    }

    fn get_model_call(&self, model_id: &str) -> Call<'_> {
        let route = self.config.route(&format!(
            "{}/{}",
            openai::MODELS_ENDPOINT,
            urlencoding::encode(model_id)
        ));

        Call::new(
            route,
            format!("Successfully retrieved model {model_id} from OpenAI."),
            format!("Failed to retrieve model {model_id} from OpenAI."),
        )
        .bearer(&self.config.api_key)
    }

    fn create_completion_call(&self) -> Call<'_> {
        Call::new(
            self.config.route(openai::COMPLETIONS_ENDPOINT),
            CREATE_COMPLETION_SUCCESS,
            CREATE_COMPLETION_FAILURE,
        )
        .bearer(&self.config.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("sk-test".to_string()).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = OpenAiConfig::new("sk-test".to_string());

        assert_eq!(config.base_url, "https://api.openai.com/");
        assert_eq!(config.api_version, "v1");
        assert_eq!(config.client_name, "OpenAI.Client");
        assert_eq!(config.http_config.timeout.as_secs(), 20);
        assert_eq!(config.http_config.handler_lifetime.as_secs(), 300);
        assert!(config.retry_policy.is_none());
        assert!(config.circuit_breaker_policy.is_none());
    }

    #[test]
    fn routes_carry_the_api_version() {
        let client = client();

        assert_eq!(client.list_models_call().route(), "v1/models");
        assert_eq!(client.create_completion_call().route(), "v1/completions");
        assert_eq!(
            client.get_model_call("davinci-instruct-beta").route(),
            "v1/models/davinci-instruct-beta"
        );
    }

    #[test]
    fn model_id_is_encoded_as_one_path_segment() {
        let client = client();

        assert_eq!(
            client.get_model_call("../files?purpose=x").route(),
            "v1/models/..%2Ffiles%3Fpurpose%3Dx"
        );
        assert_eq!(
            client.get_model_call("ft model").route(),
            "v1/models/ft%20model"
        );
    }

    #[test]
    fn unsendable_header_values_are_configuration_errors() {
        let bad_key = OpenAiClient::new("sk-bad\nkey".to_string()).err().unwrap();
        assert_eq!(bad_key.kind(), crate::FailureKind::Configuration);
        assert!(!bad_key.to_string().contains("sk-bad"));

        let bad_org = OpenAiClient::from_config(
            OpenAiConfig::new("sk-test".to_string()).with_organization("org\r\n".to_string()),
        )
        .err()
        .unwrap();
        assert_eq!(bad_org.kind(), crate::FailureKind::Configuration);

        assert!(OpenAiClient::new(String::new()).is_ok());
    }

    #[test]
    fn empty_api_version_yields_bare_routes() {
        let config = OpenAiConfig::new("sk-test".to_string()).with_api_version("/".to_string());

        assert_eq!(config.route(openai::MODELS_ENDPOINT), "models");
    }
}
