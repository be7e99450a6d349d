//! Component instances.
//!
//! A [`ComponentInstance`] is a cheap handle: the field store lives in the Lua
//! state (a table for scripted components, userdata for native ones) and the
//! handle only carries what the runtime needs to dispatch without asking Lua,
//! namely the key, the type name, the hook set and the lifecycle state.
//! Cloning the handle aliases the same component; copying a component is the
//! job of the template cache.

use mlua::prelude::*;
use mlua::ObjectLike;
use serde_json::Value;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::warn;

use super::hooks::LifecycleHooks;
use super::particlesystem::ParticleSystem;
use super::rigidbody::Rigidbody;
use crate::resources::actor::ActorId;
use crate::resources::lua_runtime::ActorRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Destroyed,
}

/// Built-in component types implemented in Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    Rigidbody,
    ParticleSystem,
}

impl NativeKind {
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "Rigidbody" => Some(NativeKind::Rigidbody),
            "ParticleSystem" => Some(NativeKind::ParticleSystem),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            NativeKind::Rigidbody => "Rigidbody",
            NativeKind::ParticleSystem => "ParticleSystem",
        }
    }

    /// Fixed hook table of each native type.
    pub fn hooks(self) -> LifecycleHooks {
        match self {
            NativeKind::Rigidbody => LifecycleHooks::START | LifecycleHooks::DESTROY,
            NativeKind::ParticleSystem => LifecycleHooks::START | LifecycleHooks::UPDATE,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ComponentBody {
    Scripted(LuaTable),
    Native(NativeKind, LuaAnyUserData),
}

#[derive(Debug, Clone)]
pub struct ComponentInstance {
    key: String,
    type_name: Rc<str>,
    hooks: LifecycleHooks,
    state: Rc<Cell<LifecycleState>>,
    body: ComponentBody,
}

impl ComponentInstance {
    pub fn scripted(type_name: &str, table: LuaTable, hooks: LifecycleHooks) -> Self {
        Self {
            key: String::new(),
            type_name: Rc::from(type_name),
            hooks,
            state: Rc::new(Cell::new(LifecycleState::Created)),
            body: ComponentBody::Scripted(table),
        }
    }

    pub fn native(kind: NativeKind, userdata: LuaAnyUserData) -> Self {
        Self {
            key: String::new(),
            type_name: Rc::from(kind.type_name()),
            hooks: kind.hooks(),
            state: Rc::new(Cell::new(LifecycleState::Created)),
            body: ComponentBody::Native(kind, userdata),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn hooks(&self) -> LifecycleHooks {
        self.hooks
    }

    pub fn has_hook(&self, hook: LifecycleHooks) -> bool {
        self.hooks.contains(hook)
    }

    pub fn body(&self) -> &ComponentBody {
        &self.body
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn set_state(&self, state: LifecycleState) {
        self.state.set(state);
    }

    pub fn was_started(&self) -> bool {
        self.state.get() == LifecycleState::Started
    }

    /// The script-visible object (`self` inside callbacks).
    pub fn lua_value(&self) -> LuaValue {
        match &self.body {
            ComponentBody::Scripted(table) => LuaValue::Table(table.clone()),
            ComponentBody::Native(_, ud) => LuaValue::UserData(ud.clone()),
        }
    }

    /// Identity test against a value handed back by a script.
    pub fn is_same(&self, value: &LuaValue) -> bool {
        let same_kind = matches!(
            (&self.body, value),
            (ComponentBody::Scripted(_), LuaValue::Table(_))
                | (ComponentBody::Native(..), LuaValue::UserData(_))
        );
        same_kind && self.lua_value().to_pointer() == value.to_pointer()
    }

    /// Current value of the `enabled` field. Unreadable state counts as disabled.
    pub fn is_enabled(&self) -> bool {
        match &self.body {
            ComponentBody::Scripted(table) => {
                matches!(table.get::<LuaValue>("enabled"), Ok(v) if is_truthy(&v))
            }
            ComponentBody::Native(NativeKind::Rigidbody, ud) => {
                ud.borrow::<Rigidbody>().map(|rb| rb.enabled).unwrap_or(false)
            }
            ComponentBody::Native(NativeKind::ParticleSystem, ud) => ud
                .borrow::<ParticleSystem>()
                .map(|ps| ps.enabled)
                .unwrap_or(false),
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> LuaResult<()> {
        match &self.body {
            ComponentBody::Scripted(table) => table.set("enabled", enabled),
            ComponentBody::Native(NativeKind::Rigidbody, ud) => {
                ud.borrow_mut::<Rigidbody>()?.enabled = enabled;
                Ok(())
            }
            ComponentBody::Native(NativeKind::ParticleSystem, ud) => {
                ud.borrow_mut::<ParticleSystem>()?.enabled = enabled;
                Ok(())
            }
        }
    }

    /// Bind the component to its key and owner. Scripts see both as the
    /// `key` and `actor` fields.
    pub fn attach(&mut self, key: &str, owner: ActorId) -> LuaResult<()> {
        self.key = key.to_string();
        match &self.body {
            ComponentBody::Scripted(table) => {
                table.set("key", key)?;
                table.set("actor", ActorRef(owner))
            }
            ComponentBody::Native(NativeKind::Rigidbody, ud) => {
                let mut rb = ud.borrow_mut::<Rigidbody>()?;
                rb.key = key.to_string();
                rb.actor = Some(owner);
                Ok(())
            }
            ComponentBody::Native(NativeKind::ParticleSystem, ud) => {
                let mut ps = ud.borrow_mut::<ParticleSystem>()?;
                ps.key = key.to_string();
                ps.actor = Some(owner);
                Ok(())
            }
        }
    }

    pub fn get_field(&self, name: &str) -> LuaResult<LuaValue> {
        match &self.body {
            ComponentBody::Scripted(table) => table.get(name),
            ComponentBody::Native(_, ud) => ud.get(name),
        }
    }

    /// Write one field. Native components ignore (and warn about) fields they
    /// do not define.
    pub fn set_field(&self, lua: &Lua, name: &str, value: LuaValue) -> LuaResult<()> {
        let known = match &self.body {
            ComponentBody::Scripted(table) => {
                table.set(name, value)?;
                true
            }
            ComponentBody::Native(NativeKind::Rigidbody, ud) => {
                ud.borrow_mut::<Rigidbody>()?.set_field(lua, name, value)?
            }
            ComponentBody::Native(NativeKind::ParticleSystem, ud) => {
                ud.borrow_mut::<ParticleSystem>()?.set_field(lua, name, value)?
            }
        };
        if !known {
            warn!("{} has no field '{}'", self.type_name, name);
        }
        Ok(())
    }

    /// Apply field overrides from a resource definition.
    pub fn apply_overrides(&self, lua: &Lua, fields: &BTreeMap<String, Value>) -> LuaResult<()> {
        for (name, value) in fields {
            let value = lua.to_value(value)?;
            self.set_field(lua, name, value)?;
        }
        Ok(())
    }

    /// Call a scripted hook with `self` and an optional payload.
    ///
    /// Native components have no Lua-side hooks; dispatching those is the job
    /// of the lifecycle system.
    pub fn call_scripted(&self, hook: LifecycleHooks, payload: Option<LuaValue>) -> LuaResult<()> {
        let ComponentBody::Scripted(table) = &self.body else {
            return Ok(());
        };
        let Some(name) = hook.callback_name() else {
            return Ok(());
        };
        let callback: LuaFunction = table.get(name)?;
        let mut args = vec![LuaValue::Table(table.clone())];
        args.extend(payload);
        callback.call::<()>(args.into_iter().collect::<LuaMultiValue>())
    }
}

pub fn is_truthy(value: &LuaValue) -> bool {
    !matches!(value, LuaValue::Nil | LuaValue::Boolean(false))
}
