//! Delivery of physics contacts to `OnCollision*` / `OnTrigger*` callbacks.

use mlua::prelude::*;

use super::lifecycle::invoke;
use crate::components::hooks::LifecycleHooks;
use crate::events::collision::{Collision, hook_for};
use crate::resources::actor::ActorId;
use crate::resources::context::RuntimeContext;
use crate::resources::lua_runtime::report_script_error;

/// Drain the contact reports of the last physics step and dispatch them in
/// the order they were produced.
pub fn dispatch_contacts(ctx: &RuntimeContext) {
    let contacts = ctx.physics.borrow().drain_contacts();
    for contact in contacts {
        let hook = hook_for(contact.kind, contact.phase);
        let (for_a, for_b) = Collision::pair(&contact);
        deliver(ctx, contact.a, hook, for_a);
        deliver(ctx, contact.b, hook, for_b);
    }
}

fn deliver(
    ctx: &RuntimeContext,
    id: ActorId,
    hook: LifecycleHooks,
    collision: Collision,
) {
    let (name, components) = {
        let actors = ctx.actors.borrow();
        let Some(actor) = actors.get(id) else {
            return;
        };
        if actor.destroyed {
            return;
        }
        (actor.name.clone(), actor.with_hook(hook))
    };
    if components.is_empty() {
        return;
    }

    let payload = match ctx.lua().create_userdata(collision) {
        Ok(ud) => LuaValue::UserData(ud),
        Err(err) => {
            report_script_error(&name, &err);
            return;
        }
    };
    for component in components {
        if ctx.is_alive(id) && component.was_started() && component.is_enabled() {
            invoke(ctx, &name, &component, hook, Some(payload.clone()));
        }
    }
}
