use clap::Parser;
use log::{error, info};
use server::config::{ConsumptionPolicy, GameConfig, GameMode};
use server::network::{BoxError, Server, ServerMessage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Simulation ticks per second, overrides the config file
    #[arg(short, long)]
    tick_rate: Option<u32>,

    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// TOML file with gameplay tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What the arena is filled with, overrides the config file
    #[arg(long, value_enum)]
    mode: Option<GameMode>,

    /// Who decides consumption, overrides the config file
    #[arg(long, value_enum)]
    policy: Option<ConsumptionPolicy>,
}

impl Args {
    fn game_config(&self) -> Result<GameConfig, BoxError> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };

        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.game_config()?;

    info!("Starting arena server...");
    info!(
        "Mode: {:?}, policy: {:?}, {} Hz, {} levels",
        config.mode,
        config.policy,
        config.tick_rate,
        config.levels.len()
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config, args.max_clients).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                let _ = shutdown.send(ServerMessage::Shutdown);
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
