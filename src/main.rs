//! Tandem - Primary-Backup Replication Manager
//!
//! Runs one node of a tandem cluster, or issues a one-shot read/write
//! against a running node.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tandem::config::TandemConfig;
use tandem::error::Result;
use tandem::network::{NetworkServer, ReplicationClient};
use tandem::replication::{BackupNode, PrimaryNode, Request};

/// Tandem - Primary-backup replication manager
#[derive(Parser)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an optional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the primary node
    Primary {
        /// Port to listen on
        port: u16,
    },

    /// Run a backup node and join a primary
    Backup {
        /// Port to listen on
        port: u16,

        /// Primary address to join (host:port)
        primary: String,
    },

    /// Read the replicated value from a node
    Read {
        /// Node address to query (host:port)
        address: String,
    },

    /// Write the replicated value through a node
    Write {
        /// Node address to write through (host:port)
        address: String,

        /// New value
        value: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => match TandemConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration from {:?}: {}", path, e);
                return Err(e);
            }
        },
        None => TandemConfig::default(),
    };

    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level);

    match cli.command {
        Commands::Primary { port } => run_primary(config, port).await,
        Commands::Backup { port, primary } => run_backup(config, port, primary).await,
        Commands::Read { address } => run_read(config, address).await,
        Commands::Write { address, value } => run_write(config, address, value).await,
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the primary node
async fn run_primary(config: TandemConfig, port: u16) -> Result<()> {
    tracing::info!("Starting as PRIMARY on port {}", port);

    let server = match NetworkServer::bind(&config.bind_address(port)).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            return Err(e);
        }
    };

    let node = Arc::new(PrimaryNode::new(config.replication()));

    tokio::select! {
        result = server.serve(node) => {
            if let Err(ref e) = result {
                tracing::error!("Server error: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("Primary shutdown complete");
    Ok(())
}

/// Run a backup node
async fn run_backup(config: TandemConfig, port: u16, primary: String) -> Result<()> {
    tracing::info!("Starting as BACKUP on port {}, primary {}", port, primary);

    // Bind before joining: the listening socket must exist by the time
    // the primary starts broadcasting to the address we register.
    let server = match NetworkServer::bind(&config.bind_address(port)).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            return Err(e);
        }
    };
    let listen_port = server.local_addr()?.port();

    let node = match BackupNode::join(primary.clone(), listen_port, config.replication()).await {
        Ok(n) => Arc::new(n),
        Err(e) => {
            // A backup cannot exist without a completed join.
            tracing::error!("Failed to join primary {}: {}", primary, e);
            return Err(e);
        }
    };

    tokio::select! {
        result = server.serve(node) => {
            if let Err(ref e) = result {
                tracing::error!("Server error: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("Backup shutdown complete");
    Ok(())
}

/// Read the replicated value from a node
async fn run_read(config: TandemConfig, address: String) -> Result<()> {
    let client = ReplicationClient::from_config(&config.replication());

    match client.send(&address, &Request::Read).await {
        Ok(response) => {
            println!("{}", response);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to read from {}: {}", address, e);
            Err(e)
        }
    }
}

/// Write the replicated value through a node
async fn run_write(config: TandemConfig, address: String, value: i64) -> Result<()> {
    let client = ReplicationClient::from_config(&config.replication());

    match client.send(&address, &Request::Write(value)).await {
        Ok(response) => {
            println!("{}", response);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to write through {}: {}", address, e);
            Err(e)
        }
    }
}
