//! Component blueprints and the cache that stamps instances out of them.
//!
//! A scripted blueprint is the global table defined by
//! `resources/component_types/<Type>.lua`. Instances are empty tables whose
//! metatable points `__index` at their parent, so unset fields fall back to
//! the blueprint, and copies made from an actor template fall back to the
//! template's instance.

use mlua::prelude::*;
use rustc_hash::FxHashMap;
use std::cell::RefCell;

use log::info;

use super::hooks::LifecycleHooks;
use super::instance::{ComponentBody, ComponentInstance, NativeKind};
use super::particlesystem::ParticleSystem;
use super::rigidbody::Rigidbody;
use crate::resources::assets::{ContentError, ResourceSource, blueprint_chunk_name};

/// A loaded, immutable component type.
#[derive(Debug, Clone)]
pub enum ComponentTemplate {
    Native(NativeKind),
    Scripted {
        type_name: String,
        table: LuaTable,
        hooks: LifecycleHooks,
    },
}

impl ComponentTemplate {
    pub fn type_name(&self) -> &str {
        match self {
            ComponentTemplate::Native(kind) => kind.type_name(),
            ComponentTemplate::Scripted { type_name, .. } => type_name,
        }
    }
}

pub struct ComponentTemplateCache {
    templates: FxHashMap<String, ComponentTemplate>,
    inherit: LuaFunction,
}

const INHERIT_SOURCE: &str = r#"
local setmetatable = setmetatable
return function(parent)
    return setmetatable({}, { __index = parent })
end
"#;

impl ComponentTemplateCache {
    pub fn new(lua: &Lua) -> LuaResult<Self> {
        let inherit = lua
            .load(INHERIT_SOURCE)
            .set_name("=inherit")
            .eval::<LuaFunction>()?;
        Ok(Self {
            templates: FxHashMap::default(),
            inherit,
        })
    }

    pub fn get(&self, type_name: &str) -> Option<ComponentTemplate> {
        self.templates.get(type_name).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.templates.len()
    }

    /// Fresh instance with its own field table and `enabled = true`.
    pub fn instantiate(
        &self,
        lua: &Lua,
        template: &ComponentTemplate,
    ) -> LuaResult<ComponentInstance> {
        match template {
            ComponentTemplate::Native(kind) => native_instance(lua, *kind, None),
            ComponentTemplate::Scripted {
                type_name,
                table,
                hooks,
            } => {
                let instance: LuaTable = self.inherit.call(table.clone())?;
                instance.set("enabled", true)?;
                Ok(ComponentInstance::scripted(type_name, instance, *hooks))
            }
        }
    }

    /// Independent copy of `source` for another actor.
    ///
    /// Scripted copies read through to `source`, so values set on the source
    /// (template overrides) are visible until the copy assigns its own. The
    /// hook set is taken from `source` as-is.
    pub fn clone_instance(
        &self,
        lua: &Lua,
        source: &ComponentInstance,
    ) -> LuaResult<ComponentInstance> {
        match source.body() {
            ComponentBody::Scripted(table) => {
                let instance: LuaTable = self.inherit.call(table.clone())?;
                Ok(ComponentInstance::scripted(
                    source.type_name(),
                    instance,
                    source.hooks(),
                ))
            }
            ComponentBody::Native(kind, userdata) => native_instance(lua, *kind, Some(userdata)),
        }
    }
}

fn native_instance(
    lua: &Lua,
    kind: NativeKind,
    source: Option<&LuaAnyUserData>,
) -> LuaResult<ComponentInstance> {
    let userdata = match kind {
        NativeKind::Rigidbody => {
            let rb = match source {
                Some(ud) => ud.borrow::<Rigidbody>()?.copy_definition(),
                None => Rigidbody::default(),
            };
            lua.create_userdata(rb)?
        }
        NativeKind::ParticleSystem => {
            let ps = match source {
                Some(ud) => ud.borrow::<ParticleSystem>()?.copy_definition(),
                None => ParticleSystem::default(),
            };
            lua.create_userdata(ps)?
        }
    };
    Ok(ComponentInstance::native(kind, userdata))
}

/// Load a component type, running its blueprint script on first use.
///
/// The cache is not borrowed while the blueprint runs, so blueprint code may
/// itself use the script API.
pub fn load_template(
    cache: &RefCell<ComponentTemplateCache>,
    lua: &Lua,
    source: &dyn ResourceSource,
    type_name: &str,
) -> Result<ComponentTemplate, ContentError> {
    if let Some(template) = cache.borrow().get(type_name) {
        return Ok(template);
    }

    let template = match NativeKind::from_type_name(type_name) {
        Some(kind) => ComponentTemplate::Native(kind),
        None => load_blueprint(lua, source, type_name)?,
    };
    cache
        .borrow_mut()
        .templates
        .insert(type_name.to_string(), template.clone());
    Ok(template)
}

fn load_blueprint(
    lua: &Lua,
    source: &dyn ResourceSource,
    type_name: &str,
) -> Result<ComponentTemplate, ContentError> {
    let code = source
        .component_blueprint(type_name)?
        .ok_or_else(|| ContentError::MissingComponentType(type_name.to_string()))?;
    let blueprint_error = |message: String| ContentError::Blueprint {
        type_name: type_name.to_string(),
        message,
    };

    lua.load(&code)
        .set_name(blueprint_chunk_name(type_name))
        .exec()
        .map_err(|e| blueprint_error(e.to_string()))?;

    let table = match lua.globals().get::<LuaValue>(type_name) {
        Ok(LuaValue::Table(table)) => table,
        Ok(_) => return Err(blueprint_error(format!("no global table named {}", type_name))),
        Err(e) => return Err(blueprint_error(e.to_string())),
    };
    let hooks = LifecycleHooks::detect(&table).map_err(|e| blueprint_error(e.to_string()))?;
    info!("Loaded component type {} ({:?})", type_name, hooks);

    Ok(ComponentTemplate::Scripted {
        type_name: type_name.to_string(),
        table,
        hooks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::assets::MemorySource;

    fn setup(source: MemorySource) -> (Lua, RefCell<ComponentTemplateCache>, MemorySource) {
        let lua = Lua::new();
        let cache = RefCell::new(ComponentTemplateCache::new(&lua).unwrap());
        (lua, cache, source)
    }

    #[test]
    fn missing_blueprint_is_content_error() {
        let (lua, cache, source) = setup(MemorySource::new());
        let err = load_template(&cache, &lua, &source, "Ghost").unwrap_err();
        assert_eq!(err, ContentError::MissingComponentType("Ghost".to_string()));
    }

    #[test]
    fn blueprint_without_table_is_content_error() {
        let (lua, cache, source) = setup(MemorySource::new().with_component("Empty", "x = 1"));
        let err = load_template(&cache, &lua, &source, "Empty").unwrap_err();
        assert!(matches!(err, ContentError::Blueprint { .. }));
    }

    #[test]
    fn load_is_cached() {
        let (lua, cache, source) = setup(MemorySource::new().with_component(
            "Counter",
            "loads = (loads or 0) + 1\nCounter = { OnStart = function(self) end }",
        ));
        load_template(&cache, &lua, &source, "Counter").unwrap();
        load_template(&cache, &lua, &source, "Counter").unwrap();
        let loads: i64 = lua.globals().get("loads").unwrap();
        assert_eq!(loads, 1);
        assert_eq!(cache.borrow().len(), 1);
    }

    #[test]
    fn natives_need_no_blueprint() {
        let (lua, cache, source) = setup(MemorySource::new());
        let template = load_template(&cache, &lua, &source, "Rigidbody").unwrap();
        let instance = cache.borrow().instantiate(&lua, &template).unwrap();
        assert_eq!(instance.type_name(), "Rigidbody");
        assert!(instance.is_enabled());
        assert!(instance.has_hook(LifecycleHooks::START));
        assert!(!instance.has_hook(LifecycleHooks::UPDATE));
    }

    #[test]
    fn instances_inherit_but_do_not_alias() {
        let (lua, cache, source) = setup(
            MemorySource::new()
                .with_component("AI", "AI = { speed = 2, OnUpdate = function(self) end }"),
        );
        let template = load_template(&cache, &lua, &source, "AI").unwrap();
        let cache = cache.borrow();
        let a = cache.instantiate(&lua, &template).unwrap();
        let b = cache.instantiate(&lua, &template).unwrap();
        a.set_field(&lua, "speed", LuaValue::Integer(9)).unwrap();
        let speed_a: f64 = lua.unpack(a.get_field("speed").unwrap()).unwrap();
        let speed_b: f64 = lua.unpack(b.get_field("speed").unwrap()).unwrap();
        assert_eq!(speed_a, 9.0);
        assert_eq!(speed_b, 2.0);
        assert!(a.has_hook(LifecycleHooks::UPDATE));
    }

    #[test]
    fn clones_read_through_to_source_and_keep_hooks() {
        let (lua, cache, source) = setup(
            MemorySource::new().with_component("AI", "AI = { speed = 2 }"),
        );
        let template = load_template(&cache, &lua, &source, "AI").unwrap();
        let cache = cache.borrow();
        let original = cache.instantiate(&lua, &template).unwrap();
        original.set_field(&lua, "speed", LuaValue::Integer(4)).unwrap();

        let copy = cache.clone_instance(&lua, &original).unwrap();
        let speed: f64 = lua.unpack(copy.get_field("speed").unwrap()).unwrap();
        assert_eq!(speed, 4.0);
        assert!(copy.is_enabled());
        assert_eq!(copy.hooks(), original.hooks());

        // hooks stay fixed even if a function appears later
        let LuaValue::Table(table) = copy.lua_value() else {
            panic!("scripted copy is a table");
        };
        table
            .set("OnUpdate", lua.create_function(|_, ()| Ok(())).unwrap())
            .unwrap();
        assert!(!copy.has_hook(LifecycleHooks::UPDATE));
    }

    #[test]
    fn native_clone_copies_fields() {
        let (lua, cache, source) = setup(MemorySource::new());
        let template = load_template(&cache, &lua, &source, "ParticleSystem").unwrap();
        let cache = cache.borrow();
        let original = cache.instantiate(&lua, &template).unwrap();
        original
            .set_field(&lua, "burst_quantity", LuaValue::Integer(12))
            .unwrap();
        let copy = cache.clone_instance(&lua, &original).unwrap();
        let quantity: i64 = lua.unpack(copy.get_field("burst_quantity").unwrap()).unwrap();
        assert_eq!(quantity, 12);
        assert!(!copy.is_same(&original.lua_value()));
    }
}
