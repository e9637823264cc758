use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payserve::config::Config;
use payserve::{app, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init(config.log_format);

    config.validate().into_diagnostic()?;
    tracing::info!(
        port = config.port,
        max_retries = config.max_retries,
        base_delay_ms = config.base_delay_ms,
        admission_shards = config.admission_shards,
        "starting payment backend"
    );

    app::run(config).await.into_diagnostic()?;
    Ok(())
}
