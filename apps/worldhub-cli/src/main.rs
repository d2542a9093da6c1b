use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldhub_common::WorldId;
use worldhub_engine::{Engine, EngineConfig};
use worldhub_materialize::{ScatterParams, cluster_count, scatter};
use worldhub_persist::FileStore;
use worldhub_stream::{DefinitionSource, DirDefinitionSource, HttpDefinitionSource};

#[derive(Parser)]
#[command(name = "worldhub-cli", about = "Resolve project definitions into navigable worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML engine config; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the record store and world cache
    #[arg(long, default_value = ".worldhub")]
    data_dir: PathBuf,

    /// Definition source: a directory, or an http(s) base URL
    #[arg(long, default_value = "definitions")]
    source: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reconciled projects
    Projects,
    /// Print a world as JSON
    World {
        /// `mainWorld` or `project-world-<id>`
        id: String,
    },
    /// Reload every definition and rebuild the world cache
    Reload,
    /// Navigate to a world and report where the viewer lands
    Navigate {
        /// `mainWorld` or `project-world-<id>`
        id: String,
    },
    /// Print the scatter layout for a gallery of the given size
    Layout {
        /// Number of gallery assets
        #[arg(short, long, default_value = "12")]
        assets: usize,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

async fn open_engine(cli: &Cli) -> anyhow::Result<Engine> {
    let mut config = load_config(cli)?;
    let source: Arc<dyn DefinitionSource> =
        if cli.source.starts_with("http://") || cli.source.starts_with("https://") {
            let timeout = config.loader_config().timeout;
            Arc::new(HttpDefinitionSource::new(cli.source.as_str(), timeout)?)
        } else {
            let dir = DirDefinitionSource::new(&cli.source);
            if config.catalog.is_empty() {
                config.catalog = dir
                    .discover_catalog()
                    .await
                    .with_context(|| format!("scanning {}", cli.source))?;
                info!(slugs = config.catalog.len(), "catalog discovered from source directory");
            }
            Arc::new(dir)
        };
    let store = FileStore::open(&cli.data_dir)
        .await
        .with_context(|| format!("opening data dir {}", cli.data_dir.display()))?;
    Ok(Engine::new(config, source, Arc::new(store)))
}

fn parse_world(id: &str) -> anyhow::Result<WorldId> {
    id.parse().with_context(|| format!("invalid world id {id:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match &cli.command {
        Commands::Projects => {
            let engine = open_engine(&cli).await?;
            engine.initialize().await?;
            let projects = engine.get_all_projects().await;
            println!("{} project(s)", projects.len());
            for p in projects {
                println!(
                    "  {:>6}  {:<32} {:?}/{:?} media={} assets={}",
                    p.id.0,
                    p.name,
                    p.status,
                    p.kind,
                    p.media_objects.len(),
                    p.asset_gallery.len()
                );
            }
        }
        Commands::World { id } => {
            let id = parse_world(id)?;
            let engine = open_engine(&cli).await?;
            engine.initialize().await?;
            match engine.get_world(id).await? {
                Some(world) => println!("{}", serde_json::to_string_pretty(&world)?),
                None => anyhow::bail!("world {id} does not exist"),
            }
        }
        Commands::Reload => {
            let engine = open_engine(&cli).await?;
            engine.force_reload().await?;
            println!(
                "Reloaded: projects={}, cached worlds={}, fetches={}",
                engine.get_all_projects().await.len(),
                engine.get_all_worlds().await.len(),
                engine.fetch_count()
            );
        }
        Commands::Navigate { id } => {
            let engine = open_engine(&cli).await?;
            engine.initialize().await?;
            let entered = engine.navigate(id).await;
            let target = engine.get_camera_target().await;
            println!("Requested: {id}");
            println!("Entered:   {entered}");
            println!("Camera:    ({:.3}, {:.3}, {:.3})", target.x, target.y, target.z);
        }
        Commands::Layout { assets } => {
            let assets = *assets;
            println!("Scatter layout: assets={assets}, clusters={}", cluster_count(assets));
            for (index, slot) in scatter(assets, &ScatterParams::default()).iter().enumerate() {
                let p = slot.placement.position;
                println!(
                    "  asset {index:>3}: cluster={} slot={} pos=({:.3}, {:.3}, {:.3}) yaw={:.3} scale={:.3}",
                    slot.cluster,
                    slot.slot,
                    p.x,
                    p.y,
                    p.z,
                    slot.placement.rotation.y,
                    slot.placement.scale.x
                );
            }
        }
    }

    Ok(())
}
