use clap::Parser;
use color_eyre::eyre::Result;
use pod_racer::{
    config::{
        self,
        ClientConfig,
    },
    logging,
};

mod client;
mod ui;

#[derive(Parser, Debug)]
#[command(version, about = "Pick a track and a racer, then race them on a pod racing server", long_about = None)]
struct Args {
    /// Base URL of the race server
    #[arg(short, long)]
    server_url: Option<String>,

    /// TOML file with client settings
    #[arg(short, long)]
    config: Option<String>,

    /// Write logs to this file (logging is off without it)
    #[arg(long)]
    log_file: Option<String>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(config::expand_path(path)?)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.server_url {
        config.server_url = url.clone();
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _log_guard = match &args.log_file {
        Some(path) => Some(logging::init_tracing(&config::expand_path(path)?)?),
        None => None,
    };
    tracing::info!("starting pod-racer client");
    let config = build_config(&args)?;
    client::run_app(config).await
}
