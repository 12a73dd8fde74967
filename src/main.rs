//! # Tactica Server Entry Point
//!
//! Parses the command line, loads rules, map and sprites, and runs the TCP game
//! server until it fails or is interrupted.

use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tactica::{
    config, scan_sprites, CharacterStore, DefaultMaze, GameConfig, GameWorld, MapSource, Server,
    SessionGateway, TacticaResult, TerrainStore,
};

/// Command line arguments for the Tactica server.
#[derive(Parser, Debug)]
#[command(name = "tactica")]
#[command(about = "Server-authoritative turn-based tactics engine")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Directory holding saved character sheets
    #[arg(long, default_value = "characters")]
    characters_dir: PathBuf,

    /// Directory holding saved terrain files
    #[arg(long, default_value = "terrains")]
    terrains_dir: PathBuf,

    /// Directory scanned for sprite images
    #[arg(long, default_value = "public/assets/sprites")]
    sprites_dir: PathBuf,

    /// Root that sprite paths are made relative to
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,

    /// Terrain file to start with instead of the built-in maze
    #[arg(long)]
    map: Option<String>,

    /// JSON file with rule overrides
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Random seed for damage rolls
    #[arg(short, long)]
    seed: Option<u64>,

    /// Game loop poll interval in milliseconds
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    if let Err(e) = run(args).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

/// Initializes `env_logger`. `RUST_LOG` takes precedence over the flag.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

async fn run(args: Args) -> TacticaResult<()> {
    info!("Starting Tactica v{}", tactica::VERSION);

    let rules = match &args.rules {
        Some(path) => {
            info!("Loading rules from {}", path.display());
            GameConfig::load(path)?
        }
        None => GameConfig::default(),
    };

    let terrains = TerrainStore::new(&args.terrains_dir);
    let map = match &args.map {
        Some(name) => {
            info!("Loading terrain '{}'", name);
            terrains.load_map(name)?
        }
        None => DefaultMaze.load()?,
    };

    let sprites = match scan_sprites(&args.sprites_dir, &args.public_dir) {
        Ok(sprites) => sprites,
        Err(e) => {
            warn!("Sprite scan failed, continuing without sprites: {}", e);
            Default::default()
        }
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);

    let characters = CharacterStore::new(&args.characters_dir);
    match characters.list() {
        Ok(sheets) => info!(
            "{} saved characters in {}",
            sheets.len(),
            characters.dir().display()
        ),
        Err(e) => warn!("Could not list saved characters: {}", e),
    }

    let world = GameWorld::new(map, rules, seed).with_sprites(sprites);
    let gateway = SessionGateway::new(world, characters, terrains);
    let server = Server::bind(
        (args.bind.as_str(), args.port),
        gateway,
        Duration::from_millis(args.tick_ms),
    )
    .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
