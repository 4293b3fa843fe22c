use std::time::Duration;

use clap::Parser;
use rollhouse::prelude::*;
use tracing_subscriber::EnvFilter;

/// Rollhouse game server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, env = "ROLLHOUSE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Delay between a roll being announced and the dice landing, in ms
    #[arg(long, env = "ROLLHOUSE_ROLL_DELAY_MS", default_value_t = 5_000)]
    roll_delay_ms: u64,

    /// Pause after a bust before the next round, in ms
    #[arg(long, env = "ROLLHOUSE_BUST_GRACE_MS", default_value_t = 5_000)]
    bust_grace_ms: u64,

    /// Rounds per game when the host doesn't pick a number
    #[arg(
        long,
        env = "ROLLHOUSE_MAX_ROUNDS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_rounds: u32,
}

impl Args {
    fn room_config(&self) -> RoomConfig {
        RoomConfig {
            default_max_rounds: self.max_rounds,
            roll_delay: Duration::from_millis(self.roll_delay_ms),
            bust_grace: Duration::from_millis(self.bust_grace_ms),
            ..RoomConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let server = RollhouseServer::builder()
        .bind(&address)
        .room_config(args.room_config())
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
