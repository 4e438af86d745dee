//! Shared request executor for every endpoint.
//!
//! One call is one authenticated HTTP round trip that ends in either a
//! decoded value or a [`ClientError`], and in exactly one log record.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Method, header::USER_AGENT};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::error::ClientError;
use super::json::JsonOptions;
use super::policy::{Next, TransportError, TransportPolicy, TransportResult};
use super::transport::Transport;

/// Settings for the transport handles the executor uses.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total time for a single exchange.
    pub timeout: Duration,
    /// How long a pooled handle lives before it is rebuilt. Only
    /// [`PooledTransportFactory`](super::transport::PooledTransportFactory)
    /// enforces it; a direct handle lives as long as the executor.
    pub handler_lifetime: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            handler_lifetime: Duration::from_secs(5 * 60),
        }
    }
}

/// Everything the executor needs to know about one call besides its body.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    route: String,
    access_token: Option<&'a str>,
    success_message: String,
    failure_message: String,
    json_options: Option<JsonOptions>,
    cancellation: Option<&'a CancellationToken>,
}

impl<'a> Call<'a> {
    pub fn new(
        route: impl Into<String>,
        success_message: impl Into<String>,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            access_token: None,
            success_message: success_message.into(),
            failure_message: failure_message.into(),
            json_options: None,
            cancellation: None,
        }
    }

    /// Send `token` as a bearer credential. Blank tokens are ignored.
    pub fn bearer(mut self, token: &'a str) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Override the executor's JSON options for this call only.
    pub fn json_options(mut self, options: JsonOptions) -> Self {
        self.json_options = Some(options);
        self
    }

    pub fn cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Authenticated JSON request executor.
pub struct HttpClient {
    transport: Transport,
    base_url: String,
    user_agent: String,
    headers: Vec<(String, String)>,
    json: JsonOptions,
    policies: Vec<Arc<dyn TransportPolicy>>,
}

impl HttpClient {
    pub fn new(transport: Transport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            user_agent: format!("oai-client/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
            json: JsonOptions::default(),
            policies: Vec::new(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json_options(mut self, options: JsonOptions) -> Self {
        self.json = options;
        self
    }

    /// Wrap the exchange in `policy`. Policies added first run outermost.
    pub fn with_policy(mut self, policy: Arc<dyn TransportPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request and decode the JSON response.
    pub async fn get_json<Res>(&self, call: Call<'_>) -> Result<Res, ClientError>
    where
        Res: DeserializeOwned,
    {
        self.execute::<(), Res>(Method::GET, call, None).await
    }

    /// Make a POST request with a JSON body and decode the JSON response.
    pub async fn post_json<Req, Res>(&self, call: Call<'_>, body: &Req) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.execute(Method::POST, call, Some(body)).await
    }

    #[tracing::instrument(
        name = "http_request",
        skip(self, method, call, body),
        fields(method = %method, route = %call.route)
    )]
    async fn execute<Req, Res>(
        &self,
        method: Method,
        call: Call<'_>,
        body: Option<&Req>,
    ) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let json = call.json_options.unwrap_or(self.json);
        let work = self.dispatch(&method, &call, &json, body);

        let outcome = match call.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ClientError::cancelled()),
                outcome = work => outcome,
            },
            None => work.await,
        };

        log_outcome(&method, &call, &outcome);
        outcome
    }

    async fn dispatch<Req, Res>(
        &self,
        method: &Method,
        call: &Call<'_>,
        json: &JsonOptions,
        body: Option<&Req>,
    ) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let payload = body
            .map(|body| json.encode(body))
            .transpose()
            .map_err(|source| ClientError::InvalidRequest {
                message: "Failed to serialize request body".to_string(),
                source,
            })?;

        let client = self.transport.acquire()?;
        let url = self.url_for(&call.route);

        let attempt = || -> BoxFuture<'static, TransportResult> {
            let request = self.build_request(
                &client,
                method.clone(),
                &url,
                call.access_token,
                payload.as_ref(),
            );
            Box::pin(async move { request.send().await.map_err(TransportError::from) })
        };

        let response = Next::new(&self.policies, &attempt)
            .run()
            .await
            .map_err(|e| ClientError::transport(format!("{method} {url} failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport("Failed to read response body", e))?;

        json.decode(&bytes).map_err(|source| ClientError::Decode {
            message: "Failed to parse API response".to_string(),
            source,
        })
    }

    fn build_request(
        &self,
        client: &reqwest::Client,
        method: Method,
        url: &str,
        access_token: Option<&str>,
        payload: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let mut request = client.request(method, url).header(USER_AGENT, &self.user_agent);

        if let Some(token) = access_token.filter(|token| !token.trim().is_empty()) {
            request = request.bearer_auth(token);
        }

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        request
    }

    fn url_for(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

fn log_outcome<T>(method: &Method, call: &Call<'_>, outcome: &Result<T, ClientError>) {
    let route = call.route.as_str();
    let failure = call.failure_message.as_str();

    match outcome {
        Ok(_) => info!(%method, route, "{}", call.success_message),
        Err(ClientError::Http { status, detail, .. }) => {
            error!(%method, route, status, "Error: {detail}\nMessage: {failure}")
        }
        Err(ClientError::Decode { source, .. }) => error!(
            %method,
            route,
            error = %source,
            "Error during HTTP {method}. Failed to deserialize response body. Message: {failure}"
        ),
        Err(ClientError::InvalidRequest { source, .. }) => error!(
            %method,
            route,
            error = %source,
            "Error during HTTP {method}. Failed to serialize request body. Message: {failure}"
        ),
        Err(e) => error!(
            %method,
            route,
            error = %error_chain(e),
            "Error during HTTP {method}. Message: {failure}"
        ),
    }
}

fn error_chain(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
