//! drongo-monitor: connects to a Drongo dashboard's realtime stream and
//! logs every event it pushes.

mod cli;
mod subscribers;

use drongo_common::DrongoError;
use drongo_config::DashboardConfig;
use drongo_realtime::{RealtimeClient, RealtimeConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "drongo=info";

fn load_config(args: &cli::Args) -> Result<DashboardConfig, DrongoError> {
    let mut config = match &args.config {
        Some(path) => drongo_config::load_config_from(path)?,
        None => drongo_config::load_config()?,
    };
    if let Some(origin) = &args.origin {
        config.realtime.origin = origin.clone();
    }
    Ok(config)
}

fn init_logging(args: &cli::Args, config: Option<&DashboardConfig>) {
    let directive = match (&args.log_level, config) {
        (Some(level), _) => format!("drongo={level}"),
        (None, Some(config)) => format!("drongo={}", config.logging.level.as_directive()),
        (None, None) => DEFAULT_DIRECTIVE.to_string(),
    };
    let filter = match directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::new(DEFAULT_DIRECTIVE),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: cli::Args, config: DashboardConfig) -> Result<(), DrongoError> {
    let client = RealtimeClient::new(RealtimeConfig::from(&config.realtime))?;
    subscribers::register(&client);

    if args.request_update {
        let client = client.clone();
        let mut state = client.watch_state();
        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let open = state.borrow_and_update().is_open();
                if open {
                    client.request_update();
                }
            }
        });
    }

    tracing::info!(url = client.url(), "Starting dashboard monitor");
    client.connect();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, shutting down");
    client.disconnect();
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let config = load_config(&args);
    init_logging(&args, config.as_ref().ok());

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args, config).await {
        tracing::error!(error = %e, "Monitor failed");
        std::process::exit(1);
    }
}
