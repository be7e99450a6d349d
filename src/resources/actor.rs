//! Actor data: components by key, derived indices and deferred buffers.
//!
//! Actors live in a slot-map arena owned by the runtime context; everything
//! else (scenes, physics bodies, script handles) refers to them by
//! [`ActorId`], so a freed actor turns into a lookup miss rather than a
//! dangling reference.
//!
//! Component order is the lexical order of the keys (`BTreeMap`). The
//! `by_type`, `needs_update` and `needs_late_update` indices are rebuilt from
//! that map whenever its structure changes, and are the only lists the
//! lifecycle passes iterate.

use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use std::collections::BTreeMap;

use crate::components::hooks::LifecycleHooks;
use crate::components::instance::{ComponentInstance, LifecycleState};
use mlua::prelude::LuaValue;

new_key_type! {
    /// Stable handle of an actor in the runtime arena.
    pub struct ActorId;
}

#[derive(Debug, Default)]
pub struct Actor {
    pub name: String,
    /// Process-wide unique number, exposed to scripts as `GetID()`.
    pub uuid: u32,
    pub destroyed: bool,
    pub persist: bool,
    pub started: bool,
    components: BTreeMap<String, ComponentInstance>,
    by_type: FxHashMap<String, Vec<ComponentInstance>>,
    needs_update: Vec<ComponentInstance>,
    needs_late_update: Vec<ComponentInstance>,
    pending_add: Vec<ComponentInstance>,
    pending_remove: Vec<ComponentInstance>,
}

impl Actor {
    pub fn new(name: impl Into<String>, uuid: u32) -> Self {
        Self {
            name: name.into(),
            uuid,
            ..Default::default()
        }
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Every component in key order, enabled or not.
    pub fn components(&self) -> Vec<ComponentInstance> {
        self.components.values().cloned().collect()
    }

    /// Direct access by key, used while building the actor.
    pub fn component(&self, key: &str) -> Option<&ComponentInstance> {
        self.components.get(key)
    }

    pub fn updatable(&self) -> &[ComponentInstance] {
        &self.needs_update
    }

    pub fn late_updatable(&self) -> &[ComponentInstance] {
        &self.needs_late_update
    }

    /// Components carrying `hook`, in key order.
    pub fn with_hook(&self, hook: LifecycleHooks) -> Vec<ComponentInstance> {
        if hook == LifecycleHooks::UPDATE {
            return self.needs_update.clone();
        }
        if hook == LifecycleHooks::LATE_UPDATE {
            return self.needs_late_update.clone();
        }
        self.components
            .values()
            .filter(|c| c.has_hook(hook))
            .cloned()
            .collect()
    }

    /// Insert a component during construction and rebuild the indices.
    pub fn insert_component(&mut self, component: ComponentInstance) {
        self.components.insert(component.key().to_string(), component);
        self.refresh_indices();
    }

    /// Rebuild every derived index from the key map.
    pub fn refresh_indices(&mut self) {
        self.by_type.clear();
        self.needs_update.clear();
        self.needs_late_update.clear();
        for component in self.components.values() {
            self.by_type
                .entry(component.type_name().to_string())
                .or_default()
                .push(component.clone());
            if component.has_hook(LifecycleHooks::UPDATE) {
                self.needs_update.push(component.clone());
            }
            if component.has_hook(LifecycleHooks::LATE_UPDATE) {
                self.needs_late_update.push(component.clone());
            }
        }
    }

    /// Candidates for a by-key lookup. Callers filter on `enabled` after
    /// releasing the arena borrow.
    pub fn lookup_key(&self, key: &str) -> Option<ComponentInstance> {
        self.components.get(key).cloned()
    }

    /// Candidates of one type, in key order.
    pub fn lookup_type(&self, type_name: &str) -> Vec<ComponentInstance> {
        self.by_type.get(type_name).cloned().unwrap_or_default()
    }

    pub fn queue_add(&mut self, component: ComponentInstance) {
        self.pending_add.push(component);
    }

    pub fn take_pending_add(&mut self) -> Vec<ComponentInstance> {
        std::mem::take(&mut self.pending_add)
    }

    pub fn take_pending_remove(&mut self) -> Vec<ComponentInstance> {
        std::mem::take(&mut self.pending_remove)
    }

    /// Queue a component for removal.
    ///
    /// A component still waiting in the add buffer is dropped from it
    /// directly and never starts. Returns `false` when `value` is not a
    /// component of this actor.
    pub fn queue_remove(&mut self, value: &LuaValue) -> bool {
        if let Some(index) = self.pending_add.iter().position(|c| c.is_same(value)) {
            let component = self.pending_add.remove(index);
            component.set_state(LifecycleState::Destroyed);
            return true;
        }
        let Some(component) = self.components.values().find(|c| c.is_same(value)) else {
            return false;
        };
        if !self.pending_remove.iter().any(|c| c.is_same(value)) {
            self.pending_remove.push(component.clone());
        }
        true
    }

    /// Find a component (live or pending) by identity.
    pub fn find_by_value(&self, value: &LuaValue) -> Option<ComponentInstance> {
        self.components
            .values()
            .chain(self.pending_add.iter())
            .find(|c| c.is_same(value))
            .cloned()
    }

    /// Remove a component from the key map if it is still the one stored
    /// under its key, and rebuild the indices. Returns whether anything was
    /// removed.
    pub fn remove_component(&mut self, component: &ComponentInstance) -> bool {
        let matches = self
            .components
            .get(component.key())
            .is_some_and(|c| c.is_same(&component.lua_value()));
        if matches {
            self.components.remove(component.key());
            self.refresh_indices();
        }
        matches
    }

    /// Every component, live and pending, for disabling on destroy.
    pub fn all_components(&self) -> Vec<ComponentInstance> {
        self.components
            .values()
            .chain(self.pending_add.iter())
            .cloned()
            .collect()
    }
}
