//! Component lifecycle passes of a single actor.
//!
//! Every pass follows the same shape: snapshot the components to visit while
//! the arena is borrowed, drop the borrow, then call into Lua one component
//! at a time. `enabled` is read right before each call, so a component
//! disabled by an earlier callback in the same pass is skipped.
//!
//! Structural changes requested by scripts (`AddComponent`,
//! `RemoveComponent`) only touch the actor's pending buffers; they are
//! applied by [`process_added_components`] and
//! [`process_removed_components`], once per frame.

use mlua::prelude::*;

use log::debug;

use crate::components::hooks::LifecycleHooks;
use crate::components::instance::{ComponentBody, ComponentInstance, LifecycleState, NativeKind};
use crate::components::template::load_template;
use crate::components::{particlesystem, rigidbody};
use crate::resources::actor::ActorId;
use crate::resources::assets::ContentError;
use crate::resources::context::RuntimeContext;
use crate::resources::lua_runtime::report_script_error;

/// Run one hook on one component. Script errors are logged against the
/// owning actor and swallowed.
pub fn invoke(
    ctx: &RuntimeContext,
    actor_name: &str,
    component: &ComponentInstance,
    hook: LifecycleHooks,
    payload: Option<LuaValue>,
) {
    let result = match component.body() {
        ComponentBody::Scripted(_) => component.call_scripted(hook, payload),
        ComponentBody::Native(NativeKind::Rigidbody, ud) => {
            if hook == LifecycleHooks::START {
                rigidbody::on_start(ctx, ud)
            } else if hook == LifecycleHooks::DESTROY {
                rigidbody::on_destroy(ctx, ud)
            } else {
                Ok(())
            }
        }
        ComponentBody::Native(NativeKind::ParticleSystem, ud) => {
            if hook == LifecycleHooks::START {
                particlesystem::on_start(ud)
            } else if hook == LifecycleHooks::UPDATE {
                particlesystem::on_update(ctx, ud)
            } else {
                Ok(())
            }
        }
    };
    if let Err(err) = result {
        report_script_error(actor_name, &err);
    }
}

/// First frame of an actor: start every component in key order.
pub fn start_actor(ctx: &RuntimeContext, id: ActorId) {
    let (name, components) = {
        let mut actors = ctx.actors.borrow_mut();
        let Some(actor) = actors.get_mut(id) else {
            return;
        };
        actor.started = true;
        (actor.name.clone(), actor.components())
    };

    for component in components {
        if component.state() != LifecycleState::Created {
            continue;
        }
        component.set_state(LifecycleState::Started);
        if component.has_hook(LifecycleHooks::START) && component.is_enabled() {
            invoke(ctx, &name, &component, LifecycleHooks::START, None);
        }
    }
}

/// `OnUpdate` or `OnLateUpdate` pass over one actor.
pub fn update_actor(ctx: &RuntimeContext, id: ActorId, hook: LifecycleHooks) {
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

    for component in components {
        if component.state() == LifecycleState::Started && component.is_enabled() {
            invoke(ctx, &name, &component, hook, None);
        }
    }
}

/// Move the actor's pending-add batch into its key map and start it.
pub fn process_added_components(ctx: &RuntimeContext, id: ActorId) {
    let (name, batch) = {
        let mut actors = ctx.actors.borrow_mut();
        let Some(actor) = actors.get_mut(id) else {
            return;
        };
        if actor.destroyed {
            return;
        }
        let batch = actor.take_pending_add();
        for component in &batch {
            if component.state() == LifecycleState::Created {
                actor.insert_component(component.clone());
            }
        }
        (actor.name.clone(), batch)
    };

    for component in batch {
        if component.state() != LifecycleState::Created {
            continue;
        }
        component.set_state(LifecycleState::Started);
        if component.has_hook(LifecycleHooks::START) && component.is_enabled() {
            invoke(ctx, &name, &component, LifecycleHooks::START, None);
        }
    }
}

/// Drop the actor's pending-remove batch from its key map, firing
/// `OnDestroy` for components that had started.
pub fn process_removed_components(ctx: &RuntimeContext, id: ActorId) {
    let (name, removed) = {
        let mut actors = ctx.actors.borrow_mut();
        let Some(actor) = actors.get_mut(id) else {
            return;
        };
        let mut removed = Vec::new();
        for component in actor.take_pending_remove() {
            if actor.remove_component(&component) {
                removed.push(component);
            }
        }
        (actor.name.clone(), removed)
    };

    for component in removed {
        let was_started = component.was_started();
        component.set_state(LifecycleState::Destroyed);
        if was_started && component.has_hook(LifecycleHooks::DESTROY) {
            invoke(ctx, &name, &component, LifecycleHooks::DESTROY, None);
        }
    }
}

/// Final teardown: `OnDestroy` for every started component in key order,
/// then the actor leaves the arena.
pub fn teardown_actor(ctx: &RuntimeContext, id: ActorId) {
    let (name, components, pending) = {
        let actors = ctx.actors.borrow();
        let Some(actor) = actors.get(id) else {
            return;
        };
        (actor.name.clone(), actor.components(), actor.all_components())
    };
    debug!("Tearing down actor {}", name);

    for component in &components {
        let was_started = component.was_started();
        component.set_state(LifecycleState::Destroyed);
        if was_started && component.has_hook(LifecycleHooks::DESTROY) {
            invoke(ctx, &name, component, LifecycleHooks::DESTROY, None);
        }
    }
    for component in &pending {
        component.set_state(LifecycleState::Destroyed);
        if let Err(err) = component.set_enabled(false) {
            report_script_error(&name, &err);
        }
    }

    ctx.actors.borrow_mut().remove(id);
}

/// Disable every component of an actor, pending ones included.
pub fn disable_all(ctx: &RuntimeContext, id: ActorId) {
    let (name, components) = {
        let actors = ctx.actors.borrow();
        let Some(actor) = actors.get(id) else {
            return;
        };
        (actor.name.clone(), actor.all_components())
    };
    for component in components {
        if let Err(err) = component.set_enabled(false) {
            report_script_error(&name, &err);
        }
    }
}

/// Fresh, unattached instance of a component type.
pub fn create_component(
    ctx: &RuntimeContext,
    type_name: &str,
) -> Result<ComponentInstance, ContentError> {
    let template = load_template(&ctx.components, ctx.lua(), ctx.source.as_ref(), type_name)?;
    ctx.components
        .borrow()
        .instantiate(ctx.lua(), &template)
        .map_err(|e| blueprint_error(type_name, e))
}

pub(crate) fn blueprint_error(type_name: &str, err: LuaError) -> ContentError {
    ContentError::Blueprint {
        type_name: type_name.to_string(),
        message: err.to_string(),
    }
}

/// `actor:AddComponent(type)`: a new component under the next `r<N>` key,
/// queued until the next added-components flush. Returns `None` if the
/// actor is gone.
pub fn add_component(
    ctx: &RuntimeContext,
    id: ActorId,
    type_name: &str,
) -> Result<Option<ComponentInstance>, ContentError> {
    if !ctx.actors.borrow().contains_key(id) {
        return Ok(None);
    }
    let mut component = create_component(ctx, type_name)?;
    let key = ctx.next_runtime_key();
    component
        .attach(&key, id)
        .map_err(|e| blueprint_error(type_name, e))?;

    let mut actors = ctx.actors.borrow_mut();
    let Some(actor) = actors.get_mut(id) else {
        return Ok(None);
    };
    actor.queue_add(component.clone());
    Ok(Some(component))
}

/// `actor:RemoveComponent(component)`: disabled now, removed at the next
/// removed-components flush. Returns whether `value` belonged to the actor.
pub fn remove_component(ctx: &RuntimeContext, id: ActorId, value: &LuaValue) -> bool {
    let found = {
        let actors = ctx.actors.borrow();
        actors.get(id).and_then(|a| a.find_by_value(value))
    };
    let Some(component) = found else {
        return false;
    };
    if let Err(err) = component.set_enabled(false) {
        report_script_error(&ctx.actor_name(id), &err);
    }
    ctx.actors
        .borrow_mut()
        .get_mut(id)
        .is_some_and(|a| a.queue_remove(value))
}
