//! Lua runtime core implementation.
//!
//! [`LuaRuntime`] owns the interpreter and registers the global script API
//! (`Debug`, `Vector2`, `Actor`, `Application`, `Scene`, `Event`, `Physics`,
//! `Text`, `Image`, `Camera`). API functions reach the runtime context
//! through the [`ContextLink`] stored in Lua's app data.

use mlua::ObjectLike;
use mlua::prelude::*;
use std::rc::Weak;
use std::time::Duration;

use log::{error, info};

use super::actor_ref::ActorRef;
use super::physics_api::register_physics_api;
use super::render_api::{register_camera_api, register_image_api, register_text_api};
use crate::components::instance::is_truthy;
use crate::components::vector2::register_vector2_api;
use crate::events::eventbus::Subscription;
use crate::resources::context::{ContextLink, RuntimeContext, context, fatal_to_lua};
use crate::resources::definitions::ActorDefinition;
use crate::systems::{events, scene};

/// Resource holding the Lua interpreter state.
pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    /// Creates a new Lua runtime and registers the script API.
    ///
    /// # Errors
    ///
    /// Returns an error if any API table cannot be created.
    pub fn new() -> LuaResult<Self> {
        let runtime = Self { lua: Lua::new() };
        runtime.register_debug_api()?;
        register_vector2_api(&runtime.lua)?;
        runtime.register_actor_api()?;
        runtime.register_application_api()?;
        runtime.register_scene_api()?;
        runtime.register_event_api()?;
        register_physics_api(&runtime.lua)?;
        register_text_api(&runtime.lua)?;
        register_image_api(&runtime.lua)?;
        register_camera_api(&runtime.lua)?;
        Ok(runtime)
    }

    /// Point API calls at `ctx`.
    pub(crate) fn bind(&self, ctx: Weak<RuntimeContext>) {
        self.lua.set_app_data(ContextLink(ctx));
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    #[cfg(test)]
    pub(crate) fn exec(&self, name: &str, code: &str) -> LuaResult<()> {
        self.lua.load(code).set_name(name).exec()
    }

    fn register_debug_api(&self) -> LuaResult<()> {
        let debug = self.lua.create_table()?;

        // Debug.Log(message)
        debug.set(
            "Log",
            self.lua.create_function(|_, msg: LuaValue| {
                info!(target: "lua", "{}", display_value(&msg));
                Ok(())
            })?,
        )?;

        // Debug.LogError(message)
        debug.set(
            "LogError",
            self.lua.create_function(|_, msg: LuaValue| {
                error!(target: "lua", "{}", display_value(&msg));
                Ok(())
            })?,
        )?;

        self.lua.globals().set("Debug", debug)
    }

    fn register_actor_api(&self) -> LuaResult<()> {
        let actor = self.lua.create_table()?;

        actor.set(
            "Find",
            self.lua.create_function(|lua, name: String| {
                let ctx = context(lua)?;
                Ok(ctx.scene.borrow().find(&name).map(ActorRef))
            })?,
        )?;

        actor.set(
            "FindAll",
            self.lua.create_function(|lua, name: String| {
                let ctx = context(lua)?;
                let found = ctx.scene.borrow().find_all(&name);
                lua.create_sequence_from(found.into_iter().map(ActorRef))
            })?,
        )?;

        actor.set(
            "Instantiate",
            self.lua.create_function(|lua, template: String| {
                let ctx = context(lua)?;
                let definition = ActorDefinition {
                    template: Some(template),
                    ..Default::default()
                };
                scene::instantiate_actor(&ctx, &definition)
                    .map(ActorRef)
                    .map_err(|e| fatal_to_lua(&ctx, e))
            })?,
        )?;

        actor.set(
            "Destroy",
            self.lua.create_function(|lua, actor: ActorRef| {
                let ctx = context(lua)?;
                scene::destroy_actor(&ctx, actor.0);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("Actor", actor)
    }

    fn register_application_api(&self) -> LuaResult<()> {
        let application = self.lua.create_table()?;

        application.set(
            "GetFrame",
            self.lua.create_function(|lua, ()| {
                let ctx = context(lua)?;
                Ok(ctx.time.get().frame)
            })?,
        )?;

        application.set(
            "GetTime",
            self.lua.create_function(|lua, ()| {
                let ctx = context(lua)?;
                Ok(ctx.time.get().elapsed)
            })?,
        )?;

        application.set(
            "Quit",
            self.lua.create_function(|lua, ()| {
                context(lua)?.request_quit();
                Ok(())
            })?,
        )?;

        // Application.Sleep(milliseconds)
        application.set(
            "Sleep",
            self.lua.create_function(|_, milliseconds: u64| {
                std::thread::sleep(Duration::from_millis(milliseconds));
                Ok(())
            })?,
        )?;

        self.lua.globals().set("Application", application)
    }

    fn register_scene_api(&self) -> LuaResult<()> {
        let scene_table = self.lua.create_table()?;

        scene_table.set(
            "Load",
            self.lua.create_function(|lua, name: String| {
                context(lua)?.request_scene(&name);
                Ok(())
            })?,
        )?;

        scene_table.set(
            "GetCurrent",
            self.lua.create_function(|lua, ()| {
                let ctx = context(lua)?;
                let name = ctx.scene.borrow().name.clone();
                Ok(name)
            })?,
        )?;

        scene_table.set(
            "DontDestroy",
            self.lua.create_function(|lua, actor: ActorRef| {
                let ctx = context(lua)?;
                scene::mark_persistent(&ctx, actor.0);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("Scene", scene_table)
    }

    fn register_event_api(&self) -> LuaResult<()> {
        let event = self.lua.create_table()?;

        event.set(
            "Subscribe",
            self.lua.create_function(
                |lua, (event_type, subscriber, callback): (String, LuaValue, LuaFunction)| {
                    let ctx = context(lua)?;
                    ctx.bus
                        .borrow_mut()
                        .subscribe(Subscription::new(event_type, subscriber, callback));
                    Ok(())
                },
            )?,
        )?;

        event.set(
            "Unsubscribe",
            self.lua.create_function(
                |lua, (event_type, subscriber, callback): (String, LuaValue, LuaFunction)| {
                    let ctx = context(lua)?;
                    ctx.bus
                        .borrow_mut()
                        .unsubscribe(Subscription::new(event_type, subscriber, callback));
                    Ok(())
                },
            )?,
        )?;

        // Event.Publish(type [, payload])
        event.set(
            "Publish",
            self.lua.create_function(|lua, args: LuaMultiValue| {
                let mut args = args.into_iter();
                let (event_type, payload) = match (args.next(), args.next(), args.next()) {
                    (Some(event_type), payload, None) => (event_type, payload),
                    _ => {
                        return Err(LuaError::runtime(
                            "Event.Publish expects an event type and an optional payload",
                        ));
                    }
                };
                let event_type: String = lua.unpack(event_type)?;
                let ctx = context(lua)?;
                events::publish(&ctx, &event_type, payload);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("Event", event)
    }
}

fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => s.to_string_lossy(),
        LuaValue::Nil => "nil".to_string(),
        other => other.to_string().unwrap_or_else(|_| format!("{:?}", other)),
    }
}

/// Human-readable message of a script error: the first line of the Lua
/// message, without the traceback.
pub fn script_error_message(err: &LuaError) -> String {
    match err {
        LuaError::CallbackError { cause, .. } => script_error_message(cause),
        LuaError::RuntimeError(message) | LuaError::SyntaxError { message, .. } => {
            message.lines().next().unwrap_or_default().to_string()
        }
        other => other.to_string().lines().next().unwrap_or_default().to_string(),
    }
}

/// Path separators become `/` and everything before `resources/` is cut.
pub fn normalize_error_location(message: &str) -> String {
    let message = message.replace('\\', "/");
    match message.find("resources/") {
        Some(index) => message[index..].to_string(),
        None => message,
    }
}

/// Log a failed callback as `<actor name> : <message>`.
pub fn report_script_error(actor_name: &str, err: &LuaError) {
    let message = normalize_error_location(&script_error_message(err));
    error!(target: "lua", "{} : {}", actor_name, message);
}

/// Name of the actor owning a script-side component value, if any.
pub fn owner_name(ctx: &RuntimeContext, component: &LuaValue) -> String {
    let actor = match component {
        LuaValue::Table(table) => table.get::<LuaValue>("actor"),
        LuaValue::UserData(ud) => ud.get::<LuaValue>("actor"),
        _ => return String::new(),
    };
    match actor {
        Ok(LuaValue::UserData(ud)) => match ud.borrow::<ActorRef>() {
            Ok(actor) => ctx.actor_name(actor.0),
            Err(_) => String::new(),
        },
        _ => String::new(),
    }
}

/// Whether a script-side component value currently reads as enabled.
/// Values that are not components count as enabled.
pub fn value_enabled(component: &LuaValue) -> bool {
    let enabled = match component {
        LuaValue::Table(table) => table.get::<LuaValue>("enabled"),
        LuaValue::UserData(ud) => ud.get::<LuaValue>("enabled"),
        _ => return true,
    };
    matches!(enabled, Ok(v) if is_truthy(&v))
}
