use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use oai_client::{
    CircuitBreakerPolicy, CompletionRequest, FailureKind, OpenAiClient, OpenAiConfig, RetryPolicy,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oai_client=debug".parse()?))
        .init();

    // Retry runs outside the circuit breaker, so every retry is admitted by it.
    let config = OpenAiConfig::from_env()?
        .with_retry_policy(Arc::new(RetryPolicy::default()))
        .with_circuit_breaker_policy(Arc::new(CircuitBreakerPolicy::new(
            5,
            Duration::from_secs(30),
        )));
    let client = OpenAiClient::from_config(config)?;

    let request = CompletionRequest::new("text-davinci-002", "Say this is a test")
        .with_max_tokens(6)
        .with_temperature(0.0)
        .with_echo(true)
        .with_stop(vec!["\n".to_string()]);

    match client.create_completion(&request).await {
        Ok(response) => {
            for choice in &response.choices {
                println!("[{}] {}", choice.index, choice.text);
            }
            println!("{} tokens used", response.usage.total_tokens);
        }
        Err(e) if e.kind() == FailureKind::Http => println!("API rejected the request: {e}"),
        Err(e) => println!("Request failed: {e}"),
    }

    Ok(())
}
