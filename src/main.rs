use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daytrack::server::{ServerConfig, start_server};

#[derive(Parser)]
#[command(name = "daytrack")]
#[command(version, about = "Realtime multi-panel day-planning board")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board relay server
    Serve {
        /// Port to serve on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Database path
        #[arg(long, default_value = ".daytrack/board.db")]
        db_path: String,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "daytrack=debug"
    } else {
        "daytrack=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Serve { port, db_path, dev } => {
            start_server(ServerConfig {
                port,
                db_path: db_path.into(),
                dev_mode: dev,
            })
            .await?;
        }
    }

    Ok(())
}
