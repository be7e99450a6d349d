//! Frame loop.
//!
//! [`Game`] owns the runtime context and drives one frame at a time:
//!
//! 1. poll input (backend)
//! 2. scene update: start, update, late update and the deferred flushes
//! 3. event-bus flush
//! 4. physics step and contact dispatch
//! 5. render the frame's draw requests (backend)
//! 6. apply a pending `Scene.Load`
//!
//! Windowing, input and drawing are behind [`EngineBackend`]; the crate ships
//! a [`HeadlessBackend`] that runs a fixed number of frames.

use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{error, info};
use mlua::prelude::LuaError;
use thiserror::Error;

use crate::resources::assets::{ContentError, ResourceSource, load_manifest};
use crate::resources::context::RuntimeContext;
use crate::resources::drawqueue::{Camera, DrawRequest};
use crate::resources::gameconfig::GameConfig;
use crate::systems::{collision, scene};

/// The platform side of the frame loop.
pub trait EngineBackend {
    /// Pump platform input. Returns `false` when the window wants to close.
    fn poll_input(&mut self) -> bool;
    /// Seconds elapsed since the previous frame.
    fn frame_delta(&mut self) -> f32;
    /// Draw the frame's requests, already in composition order.
    fn render(&mut self, camera: Camera, requests: Vec<DrawRequest>);
}

/// Backend without a window: a frame limit, a fixed delta and optional
/// real-time pacing.
#[derive(Debug)]
pub struct HeadlessBackend {
    frame_limit: Option<u64>,
    frames: u64,
    target_fps: u32,
    pace: bool,
    last_frame: Option<Instant>,
    pub last_requests: Vec<DrawRequest>,
    pub last_camera: Camera,
}

impl HeadlessBackend {
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame_limit: None,
            frames: 0,
            target_fps: target_fps.max(1),
            pace: false,
            last_frame: None,
            last_requests: Vec::new(),
            last_camera: Camera::default(),
        }
    }

    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Sleep between frames to hold the target frame rate.
    pub fn paced(mut self) -> Self {
        self.pace = true;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl EngineBackend for HeadlessBackend {
    fn poll_input(&mut self) -> bool {
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            return false;
        }
        self.frames += 1;
        true
    }

    fn frame_delta(&mut self) -> f32 {
        let target = 1.0 / self.target_fps as f32;
        if !self.pace {
            return target;
        }
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            let elapsed = now.duration_since(last);
            let budget = Duration::from_secs_f32(target);
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
        target
    }

    fn render(&mut self, camera: Camera, requests: Vec<DrawRequest>) {
        self.last_camera = camera;
        self.last_requests = requests;
    }
}

/// Startup failure of the game.
#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("script host failed: {0}")]
    Script(#[from] LuaError),
}

pub struct Game {
    ctx: Rc<RuntimeContext>,
    title: String,
}

impl Game {
    /// Build the runtime and load the initial scene.
    ///
    /// The scene comes from `config.initial_scene` when set, otherwise from
    /// the manifest's `initial_scene`.
    pub fn new(source: Box<dyn ResourceSource>, config: &GameConfig) -> Result<Self, GameError> {
        let manifest = load_manifest(source.as_ref())?;
        let initial_scene = config
            .initial_scene
            .clone()
            .or(manifest.initial_scene)
            .ok_or(ContentError::MissingInitialScene)?;
        let title = manifest.game_title.unwrap_or_else(|| "aberredcore".to_string());

        let ctx = RuntimeContext::new(source, config)?;
        scene::load_scene(&ctx, &initial_scene)?;
        if let Some(err) = ctx.take_fatal() {
            return Err(err.into());
        }
        info!("{} started in scene {}", title, initial_scene);
        Ok(Self { ctx, title })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn context(&self) -> &Rc<RuntimeContext> {
        &self.ctx
    }

    /// Run one frame. Returns `Ok(false)` once the game should stop and the
    /// first content error raised during the frame, if any.
    pub fn run_frame(&mut self, backend: &mut dyn EngineBackend) -> Result<bool, ContentError> {
        let ctx = &self.ctx;
        if !backend.poll_input() {
            return Ok(false);
        }
        let delta = backend.frame_delta();

        scene::update_actors(ctx);
        ctx.bus.borrow_mut().flush();

        ctx.physics.borrow_mut().step();
        collision::dispatch_contacts(ctx);

        let requests = ctx.draw_queue.borrow_mut().drain_sorted();
        backend.render(ctx.camera.get(), requests);

        if let Some(next) = ctx.take_pending_scene() {
            if let Err(err) = scene::load_scene(ctx, &next) {
                ctx.record_fatal(err);
            }
        }

        let mut time = ctx.time.get();
        time.advance(delta);
        ctx.time.set(time);

        if let Some(err) = ctx.take_fatal() {
            return Err(err);
        }
        Ok(!ctx.quit_requested())
    }

    /// Run frames until the backend closes, a script calls
    /// `Application.Quit()`, or content turns out to be broken.
    pub fn run(&mut self, backend: &mut dyn EngineBackend) -> Result<(), ContentError> {
        loop {
            match self.run_frame(backend) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            }
        }
    }
}
