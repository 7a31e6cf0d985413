//! LayDB CLI
//!
//! Runs a single operation against a local data directory.

use std::process;

use clap::{Parser, Subcommand};
use laydb::{Config, LayError, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// LayDB CLI
#[derive(Parser, Debug)]
#[command(name = "laydb")]
#[command(about = "Embedded append-only-log key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./laydb_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List all keys
    Keys,

    /// Rewrite the log with one record per live key
    Compact,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,laydb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("LayDB v{}", laydb::VERSION);
    tracing::debug!("Data directory: {}", args.data_dir);

    let config = Config::builder().data_dir(&args.data_dir).build();

    let store = match Store::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            process::exit(1);
        }
    };

    let result = run(&store, args.command);
    let closed = store.close();

    if let Err(e) = result.and(closed) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(store: &Store, command: Commands) -> laydb::Result<()> {
    match command {
        Commands::Get { key } => match store.get(key.as_bytes()) {
            Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
            Err(LayError::NotFound) => println!("(nil)"),
            Err(e) => return Err(e),
        },
        Commands::Set { key, value } => {
            store.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Keys => {
            let keys = store.view(|tx| tx.keys())?;
            for key in keys {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Commands::Compact => {
            let stats = store.compact()?;
            println!(
                "entries: {} -> {}, bytes: {} -> {}",
                stats.entries_before, stats.entries_after, stats.bytes_before, stats.bytes_after
            );
        }
    }
    Ok(())
}
