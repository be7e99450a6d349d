//! Scene passes: the per-frame actor update, instantiation, destruction,
//! persistence and scene loading.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info};

use super::lifecycle::{self, blueprint_error, create_component};
use crate::components::hooks::LifecycleHooks;
use crate::components::instance::ComponentInstance;
use crate::resources::actor::{Actor, ActorId};
use crate::resources::assets::{self, ContentError};
use crate::resources::context::{ActorTemplate, RuntimeContext};
use crate::resources::definitions::{ActorDefinition, ComponentDefinition};
use crate::resources::scene::{Residence, Scene};

/// One frame of the scene.
///
/// 1. start the actors instantiated since the last frame and make them live
/// 2. flush added components of every live actor
/// 3. `OnUpdate` pass, then `OnLateUpdate` pass
/// 4. flush removed components
/// 5. tear down the actors destroyed during the frame
pub fn update_actors(ctx: &RuntimeContext) {
    let batch = ctx.scene.borrow_mut().promote_pending();
    for id in batch {
        if ctx.is_alive(id) {
            lifecycle::start_actor(ctx, id);
        }
    }

    let live: Vec<ActorId> = ctx.scene.borrow().actors().to_vec();
    for &id in &live {
        lifecycle::process_added_components(ctx, id);
    }
    for &id in &live {
        lifecycle::update_actor(ctx, id, LifecycleHooks::UPDATE);
    }
    for &id in &live {
        lifecycle::update_actor(ctx, id, LifecycleHooks::LATE_UPDATE);
    }
    for &id in &live {
        lifecycle::process_removed_components(ctx, id);
    }

    let destroyed = ctx.scene.borrow_mut().drain_destroyed();
    for id in destroyed {
        lifecycle::teardown_actor(ctx, id);
    }
}

/// Load (once) and cache an actor template.
pub fn load_actor_template(
    ctx: &RuntimeContext,
    name: &str,
) -> Result<Rc<ActorTemplate>, ContentError> {
    if let Some(template) = ctx.actor_templates.borrow().get(name) {
        return Ok(Rc::clone(template));
    }

    let definition = assets::load_actor_template(ctx.source.as_ref(), name)?;
    let template_name = definition.name.clone().unwrap_or_else(|| name.to_string());
    let components = build_components(ctx, &template_name, None, &definition.components)?;
    let template = Rc::new(ActorTemplate {
        name: template_name,
        components,
    });
    info!("Loaded actor template {}", name);
    ctx.actor_templates
        .borrow_mut()
        .insert(name.to_string(), Rc::clone(&template));
    Ok(template)
}

/// Components of a new actor: copies of the template's components with the
/// definition's overrides layered on top.
///
/// An override of an inherited key writes fields into the copy; the copy
/// keeps the hook set it was cloned with. A key the template does not have
/// introduces a new component and must name its `type`.
fn build_components(
    ctx: &RuntimeContext,
    actor_name: &str,
    base: Option<&ActorTemplate>,
    overrides: &BTreeMap<String, ComponentDefinition>,
) -> Result<Vec<(String, ComponentInstance)>, ContentError> {
    let lua = ctx.lua();
    let mut components: BTreeMap<String, ComponentInstance> = BTreeMap::new();

    if let Some(base) = base {
        let cache = ctx.components.borrow();
        for (key, source) in &base.components {
            let copy = cache
                .clone_instance(lua, source)
                .map_err(|e| blueprint_error(source.type_name(), e))?;
            components.insert(key.clone(), copy);
        }
    }

    for (key, definition) in overrides {
        if let Some(existing) = components.get(key) {
            existing
                .apply_overrides(lua, &definition.fields)
                .map_err(|e| blueprint_error(existing.type_name(), e))?;
            continue;
        }
        let type_name =
            definition
                .type_name
                .as_deref()
                .ok_or_else(|| ContentError::MissingComponentTypeField {
                    actor: actor_name.to_string(),
                    key: key.clone(),
                })?;
        let component = create_component(ctx, type_name)?;
        component
            .apply_overrides(lua, &definition.fields)
            .map_err(|e| blueprint_error(type_name, e))?;
        components.insert(key.clone(), component);
    }

    Ok(components.into_iter().collect())
}

/// Build an actor from a definition and queue it on the current scene.
///
/// The actor is findable by name right away and starts on the next scene
/// update.
pub fn instantiate_actor(
    ctx: &RuntimeContext,
    definition: &ActorDefinition,
) -> Result<ActorId, ContentError> {
    let base = match &definition.template {
        Some(template) => Some(load_actor_template(ctx, template)?),
        None => None,
    };
    let name = definition
        .name
        .clone()
        .or_else(|| base.as_ref().map(|t| t.name.clone()))
        .unwrap_or_default();
    let components = build_components(ctx, &name, base.as_deref(), &definition.components)?;

    let uuid = ctx.next_uuid();
    let id = ctx.actors.borrow_mut().insert(Actor::new(name.clone(), uuid));

    let mut attached = Vec::with_capacity(components.len());
    for (key, mut component) in components {
        component
            .attach(&key, id)
            .map_err(|e| blueprint_error(component.type_name(), e))?;
        attached.push(component);
    }
    if let Some(actor) = ctx.actors.borrow_mut().get_mut(id) {
        for component in attached {
            actor.insert_component(component);
        }
    }

    ctx.scene.borrow_mut().register(id, &name);
    debug!("Instantiated actor {} ({})", name, uuid);
    Ok(id)
}

/// `Actor.Destroy(actor)`.
///
/// The actor is marked destroyed, its components are disabled and it leaves
/// the name index immediately. A live actor is torn down at the end of the
/// scene update; one that never started is torn down right away.
pub fn destroy_actor(ctx: &RuntimeContext, id: ActorId) {
    let name = {
        let mut actors = ctx.actors.borrow_mut();
        let Some(actor) = actors.get_mut(id) else {
            return;
        };
        if actor.destroyed {
            return;
        }
        actor.destroyed = true;
        actor.name.clone()
    };
    lifecycle::disable_all(ctx, id);

    let residence = {
        let mut scene = ctx.scene.borrow_mut();
        scene.unindex(id, &name);
        scene.residence(id)
    };
    match residence {
        Residence::Live(index) => ctx.scene.borrow_mut().queue_destroy(index),
        Residence::Pending(index) => {
            ctx.scene.borrow_mut().remove_pending(index);
            lifecycle::teardown_actor(ctx, id);
        }
        Residence::Absent => lifecycle::teardown_actor(ctx, id),
    }
}

/// `Scene.DontDestroy(actor)`: keep the actor across scene loads.
pub fn mark_persistent(ctx: &RuntimeContext, id: ActorId) {
    if let Some(actor) = ctx.actors.borrow_mut().get_mut(id) {
        actor.persist = true;
    }
}

/// Replace the current scene with `name`.
///
/// Persistent actors of the outgoing scene move to the front of the new one,
/// ahead of the actors its definition builds. Everything else is torn down.
/// If the scene resource is missing or malformed the current scene is kept.
pub fn load_scene(ctx: &RuntimeContext, name: &str) -> Result<(), ContentError> {
    let definition = assets::load_scene_definition(ctx.source.as_ref(), name)?;
    info!("Loading scene {}", name);

    let mut old = std::mem::replace(&mut *ctx.scene.borrow_mut(), Scene::new(name));
    let built = definition
        .actors
        .iter()
        .try_for_each(|actor| instantiate_actor(ctx, actor).map(|_| ()));

    let outgoing = old.take_all();
    let (keep, drop): (Vec<ActorId>, Vec<ActorId>) = {
        let actors = ctx.actors.borrow();
        outgoing.into_iter().partition(|&id| {
            actors
                .get(id)
                .is_some_and(|a| a.persist && !a.destroyed)
        })
    };

    for &id in keep.iter().rev() {
        let (actor_name, started) = {
            let actors = ctx.actors.borrow();
            match actors.get(id) {
                Some(actor) => (actor.name.clone(), actor.started),
                None => continue,
            }
        };
        ctx.scene.borrow_mut().adopt_front(id, &actor_name, started);
        info!("Actor {} persists into scene {}", actor_name, name);
    }
    for id in drop {
        lifecycle::disable_all(ctx, id);
        lifecycle::teardown_actor(ctx, id);
    }

    built
}
