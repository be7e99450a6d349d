//! Script handle to an actor.
//!
//! [`ActorRef`] is just an [`ActorId`]; every method looks the actor up in
//! the runtime arena, so a handle to a freed actor degrades to `nil` results
//! instead of touching freed memory.

use mlua::prelude::*;

use crate::components::instance::ComponentInstance;
use crate::resources::actor::ActorId;
use crate::resources::context::{RuntimeContext, context, fatal_to_lua};
use crate::systems::lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorRef(pub ActorId);

impl FromLua for ActorRef {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match value {
            LuaValue::UserData(ud) => Ok(*ud.borrow::<ActorRef>()?),
            other => Err(LuaError::runtime(format!(
                "expected an actor, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Enabled components of a type, in key order.
pub fn enabled_components(
    ctx: &RuntimeContext,
    id: ActorId,
    type_name: &str,
) -> Vec<ComponentInstance> {
    let candidates = {
        let actors = ctx.actors.borrow();
        actors
            .get(id)
            .map(|a| a.lookup_type(type_name))
            .unwrap_or_default()
    };
    candidates.into_iter().filter(|c| c.is_enabled()).collect()
}

pub fn enabled_component_by_key(
    ctx: &RuntimeContext,
    id: ActorId,
    key: &str,
) -> Option<ComponentInstance> {
    let candidate = {
        let actors = ctx.actors.borrow();
        actors.get(id).and_then(|a| a.lookup_key(key))
    };
    candidate.filter(|c| c.is_enabled())
}

impl LuaUserData for ActorRef {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("GetName", |lua, this, ()| {
            let ctx = context(lua)?;
            let actors = ctx.actors.borrow();
            Ok(actors.get(this.0).map(|a| a.name.clone()))
        });

        methods.add_method("GetID", |lua, this, ()| {
            let ctx = context(lua)?;
            let actors = ctx.actors.borrow();
            Ok(actors.get(this.0).map(|a| a.uuid))
        });

        methods.add_method("GetComponentByKey", |lua, this, key: String| {
            let ctx = context(lua)?;
            Ok(enabled_component_by_key(&ctx, this.0, &key).map(|c| c.lua_value()))
        });

        methods.add_method("GetComponent", |lua, this, type_name: String| {
            let ctx = context(lua)?;
            Ok(enabled_components(&ctx, this.0, &type_name)
                .first()
                .map(|c| c.lua_value()))
        });

        methods.add_method("GetComponents", |lua, this, type_name: String| {
            let ctx = context(lua)?;
            let list = enabled_components(&ctx, this.0, &type_name);
            lua.create_sequence_from(list.iter().map(|c| c.lua_value()))
        });

        methods.add_method("AddComponent", |lua, this, type_name: String| {
            let ctx = context(lua)?;
            match lifecycle::add_component(&ctx, this.0, &type_name) {
                Ok(component) => Ok(component.map(|c| c.lua_value())),
                Err(e) => Err(fatal_to_lua(&ctx, e)),
            }
        });

        methods.add_method("RemoveComponent", |lua, this, component: LuaValue| {
            let ctx = context(lua)?;
            lifecycle::remove_component(&ctx, this.0, &component);
            Ok(())
        });

        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaValue| {
            Ok(match other {
                LuaValue::UserData(ud) => ud.borrow::<ActorRef>().is_ok_and(|o| o.0 == this.0),
                _ => false,
            })
        });

        methods.add_meta_method(LuaMetaMethod::ToString, |lua, this, ()| {
            let ctx = context(lua)?;
            let actors = ctx.actors.borrow();
            Ok(match actors.get(this.0) {
                Some(actor) => format!("Actor({}, {})", actor.name, actor.uuid),
                None => "Actor(<destroyed>)".to_string(),
            })
        });
    }
}
