use streamsure_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage, pipeline and routes
    let (_state, router) = streamsure_api::setup::initialize_app(config.clone()).await?;

    streamsure_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
