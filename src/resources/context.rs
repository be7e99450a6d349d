//! Runtime context: every piece of shared state the object runtime needs.
//!
//! One [`RuntimeContext`] owns the script host, the component template cache,
//! the actor arena, the current scene, the event bus, the physics world and
//! the counters that hand out actor ids and runtime component keys. It is
//! shared as `Rc<RuntimeContext>`; script callbacks reach it through a weak
//! link stored in the Lua app data (see [`context`]).
//!
//! Interior mutability follows one rule: no `RefCell` borrow is held across a
//! call into Lua. Passes snapshot what they iterate, release the borrow, then
//! call out.

use mlua::prelude::*;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::error;

use super::actor::{Actor, ActorId};
use super::assets::{ContentError, ResourceSource};
use super::drawqueue::{Camera, DrawQueue};
use super::gameconfig::GameConfig;
use super::lua_runtime::LuaRuntime;
use super::physics::PhysicsWorld;
use super::scene::Scene;
use super::worldtime::WorldTime;
use crate::components::instance::ComponentInstance;
use crate::components::template::ComponentTemplateCache;
use crate::components::vector2::Vector2;
use crate::events::eventbus::EventBus;

/// A loaded actor template: named, keyed components used as copy sources.
#[derive(Debug)]
pub struct ActorTemplate {
    pub name: String,
    pub components: Vec<(String, ComponentInstance)>,
}

/// Weak back-link from the Lua state to its owning context.
pub(crate) struct ContextLink(pub(crate) Weak<RuntimeContext>);

pub struct RuntimeContext {
    pub source: Box<dyn ResourceSource>,
    pub components: RefCell<ComponentTemplateCache>,
    pub actor_templates: RefCell<FxHashMap<String, Rc<ActorTemplate>>>,
    pub actors: RefCell<SlotMap<ActorId, Actor>>,
    pub scene: RefCell<Scene>,
    pub bus: RefCell<EventBus>,
    pub physics: RefCell<PhysicsWorld>,
    pub draw_queue: RefCell<DrawQueue>,
    pub camera: Cell<Camera>,
    pub time: Cell<WorldTime>,
    next_uuid: Cell<u32>,
    next_runtime_key: Cell<u64>,
    pending_scene: RefCell<Option<String>>,
    fatal: RefCell<Option<ContentError>>,
    quit: Cell<bool>,
    // Declared last so Lua values held by the fields above drop first.
    lua: LuaRuntime,
}

impl RuntimeContext {
    pub fn new(source: Box<dyn ResourceSource>, config: &GameConfig) -> LuaResult<Rc<Self>> {
        let lua = LuaRuntime::new()?;
        let components = ComponentTemplateCache::new(lua.lua())?;
        let gravity = Vector2::new(config.gravity_x, config.gravity_y);
        let ctx = Rc::new(Self {
            source,
            components: RefCell::new(components),
            actor_templates: RefCell::new(FxHashMap::default()),
            actors: RefCell::new(SlotMap::with_key()),
            scene: RefCell::new(Scene::default()),
            bus: RefCell::new(EventBus::new()),
            physics: RefCell::new(PhysicsWorld::new(gravity, config.physics_step)),
            draw_queue: RefCell::new(DrawQueue::new()),
            camera: Cell::new(Camera::new(
                config.render_width,
                config.render_height,
                config.zoom,
            )),
            time: Cell::new(WorldTime::default()),
            next_uuid: Cell::new(0),
            next_runtime_key: Cell::new(0),
            pending_scene: RefCell::new(None),
            fatal: RefCell::new(None),
            quit: Cell::new(false),
            lua,
        });
        ctx.lua.bind(Rc::downgrade(&ctx));
        Ok(ctx)
    }

    pub fn lua(&self) -> &Lua {
        self.lua.lua()
    }

    pub fn runtime(&self) -> &LuaRuntime {
        &self.lua
    }

    pub fn next_uuid(&self) -> u32 {
        let id = self.next_uuid.get();
        self.next_uuid.set(id + 1);
        id
    }

    /// Key for a component added at runtime: `r0`, `r1`, ...
    pub fn next_runtime_key(&self) -> String {
        let n = self.next_runtime_key.get();
        self.next_runtime_key.set(n + 1);
        format!("r{}", n)
    }

    pub fn actor_name(&self, id: ActorId) -> String {
        self.actors
            .borrow()
            .get(id)
            .map(|a| a.name.clone())
            .unwrap_or_default()
    }

    pub fn is_alive(&self, id: ActorId) -> bool {
        self.actors.borrow().get(id).is_some_and(|a| !a.destroyed)
    }

    /// Remember a content error. Only the first one is kept; the frame loop
    /// stops at the end of the current frame.
    pub fn record_fatal(&self, err: ContentError) {
        error!("{}", err);
        let mut fatal = self.fatal.borrow_mut();
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    pub fn take_fatal(&self) -> Option<ContentError> {
        self.fatal.borrow_mut().take()
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal.borrow().is_some()
    }

    pub fn request_scene(&self, name: &str) {
        *self.pending_scene.borrow_mut() = Some(name.to_string());
    }

    pub fn take_pending_scene(&self) -> Option<String> {
        self.pending_scene.borrow_mut().take()
    }

    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }
}

/// The context behind a Lua state, for use inside script API callbacks.
pub fn context(lua: &Lua) -> LuaResult<Rc<RuntimeContext>> {
    lua.app_data_ref::<ContextLink>()
        .and_then(|link| link.0.upgrade())
        .ok_or_else(|| LuaError::runtime("runtime context is not available"))
}

/// Record a content error on the context and turn it into a script error so
/// the calling script stops.
pub fn fatal_to_lua(ctx: &RuntimeContext, err: ContentError) -> LuaError {
    let message = err.to_string();
    ctx.record_fatal(err);
    LuaError::runtime(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::assets::MemorySource;

    fn ctx() -> Rc<RuntimeContext> {
        RuntimeContext::new(Box::new(MemorySource::new()), &GameConfig::new()).unwrap()
    }

    #[test]
    fn runtime_keys_count_up() {
        let ctx = ctx();
        assert_eq!(ctx.next_runtime_key(), "r0");
        assert_eq!(ctx.next_runtime_key(), "r1");
        assert_eq!(ctx.next_uuid(), 0);
        assert_eq!(ctx.next_uuid(), 1);
    }

    #[test]
    fn lua_reaches_context() {
        let ctx = ctx();
        let found = context(ctx.lua()).unwrap();
        assert!(Rc::ptr_eq(&found, &ctx));
    }

    #[test]
    fn first_fatal_wins() {
        let ctx = ctx();
        ctx.record_fatal(ContentError::MissingScene("a".into()));
        ctx.record_fatal(ContentError::MissingScene("b".into()));
        assert!(ctx.has_fatal());
        assert_eq!(
            ctx.take_fatal(),
            Some(ContentError::MissingScene("a".into()))
        );
        assert!(!ctx.has_fatal());
    }

    #[test]
    fn scene_request_is_taken_once() {
        let ctx = ctx();
        ctx.request_scene("level2");
        assert_eq!(ctx.take_pending_scene().as_deref(), Some("level2"));
        assert_eq!(ctx.take_pending_scene(), None);
    }
}
