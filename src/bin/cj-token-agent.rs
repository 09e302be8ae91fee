use anyhow::Result;
use clap::Parser;
use cj_token_agent::app::App;
use cj_token_agent::server;
use cj_token_agent::utils::config_loader;
use cj_token_agent::utils::logging;
use cj_token_agent::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "cj-token-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, read once
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Token store, refresher, alerts, gateway
    // -------------------------------

    let app = App::build(&service_config).await?;
    match app.store.get().await {
        Some(credential) => info!("starting with credential updated at {}", credential.updated_at),
        None => info!("starting without credential, first CJ call will trigger a refresh"),
    }

    // -------------------------------
    // 3. Serve
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, app.state().await).await
}
