use gateway::{AppState, get_configuration, logging::setup_logging, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let state = AppState::initialize(&config)?;

    run_server(&config, state).await
}
