pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod guard;
pub mod hierarchy;
pub mod resolver;
pub mod server;
pub mod service;
pub mod store;
pub mod style;
pub mod types;
pub mod validator;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::AppConfig;
use service::MapService;
use std::path::PathBuf;
use store::MemoryStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write a project's area boundaries as a GeoJSON FeatureCollection
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long)]
        project: types::ProjectId,
        /// Output directory, overriding `[export] dir`
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_service(config: &AppConfig) -> anyhow::Result<MapService<MemoryStore>> {
    let store = match &config.storage.snapshot {
        Some(path) => {
            tracing::info!("Loading snapshot from {:?}", path);
            MemoryStore::open(path)?
        }
        None => MemoryStore::new(),
    };
    Ok(MapService::new(store, config.validation.containment))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            init_tracing(&app_config);
            tracing::info!("Serving map API with config: {:?}", config);

            let service = open_service(&app_config)?;
            server::start_server(app_config, service).await?;
        }
        Commands::Export { config, project, out } => {
            let app_config = AppConfig::load_from_file(config)?;
            init_tracing(&app_config);

            let service = open_service(&app_config)?;
            let collection = export::project_boundaries(&service, *project)
                .with_context(|| format!("Failed to export project {}", project))?;
            let dir = out.as_ref().unwrap_or(&app_config.export.dir);
            let path = export::write_collection(dir, *project, &collection)?;
            tracing::info!("Wrote {} features to {:?}", collection.features.len(), path);
        }
    }

    Ok(())
}
