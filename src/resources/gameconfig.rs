//! Runtime configuration.
//!
//! Settings are read from an INI file. Every value has a safe default, so a
//! missing file or a missing key just keeps the default.
//!
//! # Configuration File Format
//!
//! ```ini
//! [resources]
//! path = resources
//!
//! [game]
//! initial_scene = title
//!
//! [window]
//! target_fps = 60
//!
//! [render]
//! width = 640
//! height = 360
//! zoom = 1.0
//!
//! [physics]
//! gravity_x = 0.0
//! gravity_y = 9.8
//! step = 0.016666668
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_RESOURCES_PATH: &str = "resources";
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_RENDER_WIDTH: u32 = 640;
const DEFAULT_RENDER_HEIGHT: u32 = 360;
const DEFAULT_ZOOM: f32 = 1.0;
const DEFAULT_GRAVITY_X: f32 = 0.0;
const DEFAULT_GRAVITY_Y: f32 = 9.8;
const DEFAULT_PHYSICS_STEP: f32 = 1.0 / 60.0;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Root of the game content (`game.config`, `component_types/`, ...).
    pub resources_path: PathBuf,
    /// Overrides `initial_scene` of the game manifest.
    pub initial_scene: Option<String>,
    /// Target frames per second of the headless runner.
    pub target_fps: u32,
    /// Internal render width in pixels.
    pub render_width: u32,
    /// Internal render height in pixels.
    pub render_height: u32,
    /// Initial camera zoom factor.
    pub zoom: f32,
    pub gravity_x: f32,
    pub gravity_y: f32,
    /// Fixed physics step in seconds.
    pub physics_step: f32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            resources_path: PathBuf::from(DEFAULT_RESOURCES_PATH),
            initial_scene: None,
            target_fps: DEFAULT_TARGET_FPS,
            render_width: DEFAULT_RENDER_WIDTH,
            render_height: DEFAULT_RENDER_HEIGHT,
            zoom: DEFAULT_ZOOM,
            gravity_x: DEFAULT_GRAVITY_X,
            gravity_y: DEFAULT_GRAVITY_Y,
            physics_step: DEFAULT_PHYSICS_STEP,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded config: resources={}, scene={:?}, fps={}, {}x{} render, gravity=({}, {}), step={}",
            self.resources_path.display(),
            self.initial_scene,
            self.target_fps,
            self.render_width,
            self.render_height,
            self.gravity_x,
            self.gravity_y,
            self.physics_step
        );

        Ok(())
    }

    /// Parse INI text directly.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [resources] section
        if let Some(path) = config.get("resources", "path") {
            self.resources_path = PathBuf::from(path);
        }

        // [game] section
        if let Some(scene) = config.get("game", "initial_scene") {
            self.initial_scene = Some(scene);
        }

        // [window] section
        if let Some(fps) = config.getuint("window", "target_fps").ok().flatten() {
            self.target_fps = fps as u32;
        }

        // [render] section
        if let Some(width) = config.getuint("render", "width").ok().flatten() {
            self.render_width = width as u32;
        }
        if let Some(height) = config.getuint("render", "height").ok().flatten() {
            self.render_height = height as u32;
        }
        if let Some(zoom) = config.getfloat("render", "zoom").ok().flatten()
            && zoom > 0.0
        {
            self.zoom = zoom as f32;
        }

        // [physics] section
        if let Some(x) = config.getfloat("physics", "gravity_x").ok().flatten() {
            self.gravity_x = x as f32;
        }
        if let Some(y) = config.getfloat("physics", "gravity_y").ok().flatten() {
            self.gravity_y = y as f32;
        }
        if let Some(step) = config.getfloat("physics", "step").ok().flatten() {
            self.physics_step = step as f32;
        }
    }

    /// Set render resolution.
    pub fn set_render_size(&mut self, width: u32, height: u32) {
        self.render_width = width;
        self.render_height = height;
    }
}
