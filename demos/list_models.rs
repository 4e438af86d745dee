use dotenv::dotenv;
use oai_client::{OpenAiClient, OpenAiConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oai_client=info".parse()?))
        .init();

    let client = OpenAiClient::from_config(OpenAiConfig::from_env()?)?;

    let models = client.list_models().await?;
    for model in &models.models {
        println!("{} (owned by {})", model.id, model.owned_by);
    }

    let model = client.get_model("davinci-instruct-beta").await?;
    println!(
        "{}: root={:?}, {} permission entries",
        model.id,
        model.root,
        model.permissions.len()
    );

    Ok(())
}
