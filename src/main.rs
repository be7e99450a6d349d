//! aberredcore runner.
//!
//! Loads the game content from a `resources/` directory and runs the object
//! runtime headless:
//! - **mlua + LuaJIT** for component scripts
//! - **configparser** for `config.ini`
//! - **clap** for the command line
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --resources ./resources --frames 600
//! ```

use aberredcore::game::{Game, HeadlessBackend};
use aberredcore::resources::assets::DirectorySource;
use aberredcore::resources::gameconfig::GameConfig;
use clap::Parser;
use std::path::PathBuf;

/// aberredcore object runtime
#[derive(Parser)]
#[command(version, about = "Runs a game's actors, components and scenes headless.")]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Game content directory; overrides `[resources] path`.
    #[arg(long, value_name = "PATH")]
    resources: Option<PathBuf>,

    /// Scene to start in; overrides the manifest's `initial_scene`.
    #[arg(long, value_name = "NAME")]
    scene: Option<String>,

    /// Stop after this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => GameConfig::with_path(path),
        None => GameConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        log::warn!("{}; using defaults", e);
    }
    if let Some(path) = cli.resources {
        config.resources_path = path;
    }
    if let Some(scene) = cli.scene {
        config.initial_scene = Some(scene);
    }

    let source = match DirectorySource::open(&config.resources_path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut game = match Game::new(Box::new(source), &config) {
        Ok(game) => game,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut backend = HeadlessBackend::new(config.target_fps).paced();
    if let Some(frames) = cli.frames {
        backend = backend.with_frame_limit(frames);
    }

    if game.run(&mut backend).is_err() {
        std::process::exit(1);
    }
    log::info!("{} finished after {} frames", game.title(), backend.frames());
}
