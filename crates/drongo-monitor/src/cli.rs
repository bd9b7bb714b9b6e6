use std::path::PathBuf;

use clap::Parser;

/// Watch a Drongo dashboard's realtime stream and log what it pushes.
#[derive(Parser, Debug)]
#[command(name = "drongo-monitor", version, about)]
pub struct Args {
    /// Dashboard origin, e.g. http://localhost:5001. Overrides the config file.
    #[arg(long)]
    pub origin: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Ask for a stats push every time the connection opens.
    #[arg(long)]
    pub request_update: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
