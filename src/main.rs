//! edge-guard: security gate and passthrough proxy.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use edge_guard::config;
use edge_guard::lifecycle::startup;
use edge_guard::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "edge-guard")]
#[command(about = "Edge security gate: size, origin, path and rate checks with CSP headers")]
struct Args {
    /// TOML configuration file. Environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging is not up yet; configuration errors go to stderr.
    let config = match config::load_from_env(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-guard: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.check {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("edge-guard: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("edge-guard v{} starting", env!("CARGO_PKG_VERSION"));

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
