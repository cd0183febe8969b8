// CLI entry point for the table server.
//
// Seats four TCP clients at one table and runs games until killed. Win
// checks go to the HTTP scoring service at `--oracle-url`; `--offline`
// replaces it with an oracle that never allows a claim, for local testing
// without the service.
//
// Logging goes to stderr through `tracing-subscriber`; set `RUST_LOG` to
// change the filter (default `info`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mahjong_game::{GameConfig, HttpOracle, ScoringOracle, StaticOracle};
use mahjong_server::{ServerConfig, start_server};

#[derive(Parser)]
#[command(name = "mahjong-server", about = "Four-seat mahjong table server")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 picks a free port).
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Scoring service endpoint.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    oracle_url: String,

    /// Scoring service request timeout.
    #[arg(long, default_value_t = 5000)]
    oracle_timeout_ms: u64,

    /// Run without a scoring service; nobody can claim a discard.
    #[arg(long)]
    offline: bool,

    /// Outbound messages buffered per seat before it is dropped.
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    /// Seats that must send `next` before a finished round advances.
    #[arg(long)]
    confirmations: Option<usize>,

    /// JSON rules file overriding the default game rules.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Fixed shuffle seed, for reproducible deals.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut game = match &cli.rules {
        Some(path) => match GameConfig::load(path) {
            Ok(game) => game,
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not load rules");
                std::process::exit(1);
            }
        },
        None => GameConfig::default(),
    };
    if let Some(n) = cli.confirmations {
        game.confirmations_required = n;
    }

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        oracle_url: cli.oracle_url,
        oracle_timeout: Duration::from_millis(cli.oracle_timeout_ms),
        queue_capacity: cli.queue_capacity,
        seed: cli.seed,
        game,
        ..ServerConfig::default()
    };

    let oracle: Arc<dyn ScoringOracle> = if cli.offline {
        info!("offline mode: claims disabled");
        Arc::new(StaticOracle::never())
    } else {
        info!(url = %config.oracle_url, "using scoring service");
        Arc::new(HttpOracle::new(config.oracle_url.clone(), config.oracle_timeout))
    };

    let (handle, addr) = match start_server(config, oracle) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };
    info!(%addr, "waiting for players");
    handle.wait();
}
