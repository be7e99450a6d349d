//! `Physics` namespace: ray queries against the physics world.
//!
//! ```lua
//! local hit = Physics.Raycast(self.rb:GetPosition(), Vector2(1, 0), 5)
//! if hit ~= nil and not hit.is_trigger then
//!     Debug.Log("wall " .. hit.actor:GetName() .. " at " .. tostring(hit.point))
//! end
//! ```

use mlua::prelude::*;

use super::actor_ref::ActorRef;
use crate::components::vector2::Vector2;
use crate::resources::context::context;
use crate::resources::physics::RayHit;

impl LuaUserData for RayHit {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("actor", |_, this| Ok(ActorRef(this.actor)));
        fields.add_field_method_get("point", |_, this| Ok(this.point));
        fields.add_field_method_get("normal", |_, this| Ok(this.normal));
        fields.add_field_method_get("is_trigger", |_, this| Ok(this.is_trigger));
    }
}

pub(super) fn register_physics_api(lua: &Lua) -> LuaResult<()> {
    let physics = lua.create_table()?;

    // Physics.Raycast(position, direction, distance) -> HitResult or nil
    physics.set(
        "Raycast",
        lua.create_function(
            |lua, (origin, direction, distance): (Vector2, Vector2, f32)| {
                let ctx = context(lua)?;
                let hit = ctx.physics.borrow().raycast(origin, direction, distance);
                Ok(hit)
            },
        )?,
    )?;

    // Physics.RaycastAll(position, direction, distance) -> { HitResult }, nearest first
    physics.set(
        "RaycastAll",
        lua.create_function(
            |lua, (origin, direction, distance): (Vector2, Vector2, f32)| {
                let ctx = context(lua)?;
                let hits = ctx.physics.borrow().raycast_all(origin, direction, distance);
                lua.create_sequence_from(hits)
            },
        )?,
    )?;

    lua.globals().set("Physics", physics)
}
