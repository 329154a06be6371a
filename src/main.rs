//! schedhub - management console for multiple scheduler instances.
//!
//! Usage:
//!   schedhub serve                    Run the console against an in-memory store
//!   schedhub serve --config-dir DIR   Run against a file-backed store
//!   schedhub list --config-dir DIR    List persisted scheduler configurations
//!   schedhub validate <FILE>          Check a configuration file without registering it

use clap::{Parser, Subcommand};
use schedhub::api::{create_api_state, start_server};
use schedhub::{
    AppSettings, ConfigProps, EngineHandle, LocalEngine, LocalEngineFactory, SchedulerContainer,
    StoreSettings, AUTO_START_KEY,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// schedhub - management console for multiple scheduler instances
#[derive(Parser)]
#[command(name = "schedhub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the console API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = schedhub::config::DEFAULT_HOST)]
        host: String,

        /// Port to bind to
        #[arg(long, default_value_t = schedhub::config::DEFAULT_PORT)]
        port: u16,

        /// Directory for the file-backed config store (in-memory when omitted)
        #[arg(long, value_name = "DIR")]
        config_dir: Option<PathBuf>,

        /// SQLite database file for the config store
        #[cfg(feature = "sqlite")]
        #[arg(long, value_name = "FILE", conflicts_with = "config_dir")]
        sqlite_db: Option<PathBuf>,
    },

    /// List persisted scheduler configurations
    List {
        /// Directory of the file-backed config store
        #[arg(long, value_name = "DIR")]
        config_dir: PathBuf,
    },

    /// Validate a configuration file without registering it
    Validate {
        /// Path to a properties file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config_dir,
            #[cfg(feature = "sqlite")]
            sqlite_db,
        } => {
            #[allow(unused_mut)]
            let mut store = match config_dir {
                Some(dir) => StoreSettings::File { dir },
                None => StoreSettings::Memory,
            };
            #[cfg(feature = "sqlite")]
            if let Some(path) = sqlite_db {
                store = StoreSettings::Sqlite { path };
            }
            serve(AppSettings::new(host, port, store)).await?;
        }
        Commands::List { config_dir } => {
            list_configs(config_dir).await?;
        }
        Commands::Validate { file } => {
            validate_config(file).await?;
        }
    }

    Ok(())
}

/// Run the console: store, container, API server, in that order.
async fn serve(settings: AppSettings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = settings.socket_addr()?;
    let store = settings.open_store().await?;

    let container = Arc::new(SchedulerContainer::new(store, Arc::new(LocalEngineFactory)));
    container.init().await?;
    info!(
        "managing {} scheduler configuration(s)",
        container.all_config_ids().await.len()
    );

    let server = start_server(addr, create_api_state(Arc::clone(&container))).await?;
    info!("press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down...");
        }
        _ = server => {
            error!("API server stopped unexpectedly");
        }
    }

    // Teardown in reverse order: API first, then the schedulers.
    container.destroy().await;
    info!("goodbye");
    Ok(())
}

/// List persisted scheduler configurations from a file store.
async fn list_configs(config_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let settings = AppSettings::new(
        schedhub::config::DEFAULT_HOST,
        schedhub::config::DEFAULT_PORT,
        StoreSettings::File { dir: config_dir },
    );
    let store = settings.open_store().await?;

    let ids = store.list_config_ids().await?;
    if ids.is_empty() {
        println!("no scheduler configurations found");
        return Ok(());
    }

    println!("{} scheduler configuration(s):", ids.len());
    for id in ids {
        let text = store.load(&id).await?;
        let (name, auto) = match ConfigProps::parse(&text) {
            Ok(props) => (
                props
                    .get("engine.name")
                    .unwrap_or("(unnamed)")
                    .to_string(),
                props.get_bool(AUTO_START_KEY),
            ),
            Err(_) => ("(invalid configuration)".to_string(), false),
        };
        println!("  {}  name={}  autoStart={}", id, name, auto);
    }

    Ok(())
}

/// Parse a configuration file and try to build an engine from it.
async fn validate_config(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(&file).await?;

    let props = match ConfigProps::parse(&text) {
        Ok(props) => props,
        Err(e) => {
            error!("{}: invalid properties: {}", file.display(), e);
            return Err(e.into());
        }
    };

    match LocalEngine::from_props(&props) {
        Ok(engine) => {
            let meta = engine.metadata().await?;
            engine.shutdown().await?;
            info!(
                "{}: OK ({} job(s), engine name {})",
                file.display(),
                meta.job_count,
                meta.name
            );
            Ok(())
        }
        Err(e) => {
            error!("{}: invalid configuration: {}", file.display(), e);
            Err(e.into())
        }
    }
}
