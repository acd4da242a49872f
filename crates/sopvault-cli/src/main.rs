use anyhow::Result;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use sopvault_core::analytics::{self, AnalyticsEvent};
use sopvault_core::paths::default_medium_path;
use sopvault_core::{
    migrate_all, spawn_session_loop, FileMedium, SecureStore, SessionMonitor, VaultConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator CLI for the sopvault record store", long_about = None)]
struct Cli {
    /// Override the directory holding the record file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a JSON value under a key
    Set { key: String, value: String },

    /// Read a value back
    Get { key: String },

    /// Delete a single record
    Remove { key: String },

    /// List stored keys
    Keys,

    /// Delete every record
    Clear,

    /// Re-encrypt legacy plaintext records in place
    Migrate,

    /// Record an analytics event
    Track {
        name: String,
        /// Event properties as a JSON object
        #[arg(default_value = "{}")]
        props: String,
    },

    /// Show recent analytics events
    Events {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Run the session monitor until Ctrl-C; stdin lines count as activity
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = VaultConfig::from_env();

    let medium_path = match &cli.data_dir {
        Some(dir) => dir.join("records.json"),
        None => default_medium_path()?,
    };
    let medium = FileMedium::open(&medium_path)?;
    let mut store = SecureStore::open(medium, &config)?;

    match cli.command {
        Commands::Set { key, value } => {
            let value: serde_json::Value = serde_json::from_str(&value)?;
            store.set_item(&key, &value)?;
            println!("stored {key}");
        }
        Commands::Get { key } => match store.get_item::<serde_json::Value>(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("(no value)"),
        },
        Commands::Remove { key } => {
            store.remove_item(&key)?;
            println!("removed {key}");
        }
        Commands::Keys => {
            for key in store.keys() {
                println!("{key}");
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("cleared");
        }
        Commands::Migrate => {
            let migrated = migrate_all(&mut store)?;
            println!("migrated {migrated} record(s)");
        }
        Commands::Track { name, props } => {
            let props: serde_json::Value = serde_json::from_str(&props)?;
            analytics::track(&mut store, AnalyticsEvent::new(name, props))?;
            println!("tracked");
        }
        Commands::Events { limit } => {
            for event in analytics::recent(&store, limit) {
                println!(
                    "{} | {} | {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.name,
                    serde_json::to_string(&event.props)?
                );
            }
        }
        Commands::Watch => watch_command(store, &config).await?,
    }
    Ok(())
}

async fn watch_command(store: SecureStore<FileMedium>, config: &VaultConfig) -> Result<()> {
    let store = Arc::new(Mutex::new(store));
    let monitor = Arc::new(SessionMonitor::new(store, config.session_timeout));
    monitor.init();

    let mut expiry_rx = monitor.subscribe();
    let (loop_task, loop_handle) =
        spawn_session_loop(monitor.clone(), config.poll_interval, || {
            info!("session expired; host should force logout");
        });

    let activity_monitor = monitor.clone();
    let stdin_task = tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            activity_monitor.update_activity();
            info!("activity observed");
        }
    });

    info!(
        timeout_secs = config.session_timeout.as_secs(),
        "session monitor running; Ctrl-C to stop"
    );
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            changed = expiry_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("session expired (expiry #{})", *expiry_rx.borrow());
            }
        }
    }

    info!("stopping");
    let _ = loop_handle.shutdown_tx.send(true);
    loop_task.abort();
    stdin_task.abort();
    Ok(())
}
