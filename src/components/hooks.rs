//! Lifecycle hook presence set.
//!
//! Every component carries a [`LifecycleHooks`] bitset computed once when the
//! instance is created. Dispatch passes consult the bitset instead of asking
//! the script host whether a callback exists, so a script that later assigns a
//! new `OnUpdate` field does not start receiving updates.

use bitflags::bitflags;
use mlua::prelude::*;

bitflags! {
    /// Which lifecycle callbacks a component defines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LifecycleHooks: u8 {
        const START = 1 << 0;
        const UPDATE = 1 << 1;
        const LATE_UPDATE = 1 << 2;
        const DESTROY = 1 << 3;
        const COLLISION_ENTER = 1 << 4;
        const COLLISION_EXIT = 1 << 5;
        const TRIGGER_ENTER = 1 << 6;
        const TRIGGER_EXIT = 1 << 7;
    }
}

/// Script-side callback names, one per hook bit.
const HOOK_NAMES: [(LifecycleHooks, &str); 8] = [
    (LifecycleHooks::START, "OnStart"),
    (LifecycleHooks::UPDATE, "OnUpdate"),
    (LifecycleHooks::LATE_UPDATE, "OnLateUpdate"),
    (LifecycleHooks::DESTROY, "OnDestroy"),
    (LifecycleHooks::COLLISION_ENTER, "OnCollisionEnter"),
    (LifecycleHooks::COLLISION_EXIT, "OnCollisionExit"),
    (LifecycleHooks::TRIGGER_ENTER, "OnTriggerEnter"),
    (LifecycleHooks::TRIGGER_EXIT, "OnTriggerExit"),
];

impl LifecycleHooks {
    /// Name of the script callback for a single hook bit.
    ///
    /// Returns `None` for an empty set or a combination of several bits.
    pub fn callback_name(self) -> Option<&'static str> {
        HOOK_NAMES
            .iter()
            .find(|(hook, _)| *hook == self)
            .map(|(_, name)| *name)
    }

    /// Inspect a blueprint table and record every callback that is a function.
    ///
    /// Lookups go through the table's `__index` chain, so an instance table
    /// reports the hooks inherited from its blueprint.
    pub fn detect(table: &LuaTable) -> LuaResult<Self> {
        let mut hooks = LifecycleHooks::empty();
        for (hook, name) in HOOK_NAMES {
            if let LuaValue::Function(_) = table.get::<LuaValue>(name)? {
                hooks |= hook;
            }
        }
        Ok(hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_name_single_bits() {
        assert_eq!(LifecycleHooks::START.callback_name(), Some("OnStart"));
        assert_eq!(
            LifecycleHooks::TRIGGER_EXIT.callback_name(),
            Some("OnTriggerExit")
        );
    }

    #[test]
    fn callback_name_rejects_combinations() {
        let both = LifecycleHooks::START | LifecycleHooks::UPDATE;
        assert_eq!(both.callback_name(), None);
        assert_eq!(LifecycleHooks::empty().callback_name(), None);
    }

    #[test]
    fn detect_reads_functions_only() {
        let lua = Lua::new();
        let table: LuaTable = lua
            .load(
                r#"
            return {
                speed = 3,
                OnStart = function(self) end,
                OnLateUpdate = function(self) end,
                OnUpdate = "not a function",
            }
        "#,
            )
            .eval()
            .unwrap();
        let hooks = LifecycleHooks::detect(&table).unwrap();
        assert!(hooks.contains(LifecycleHooks::START));
        assert!(hooks.contains(LifecycleHooks::LATE_UPDATE));
        assert!(!hooks.contains(LifecycleHooks::UPDATE));
        assert!(!hooks.contains(LifecycleHooks::DESTROY));
    }

    #[test]
    fn detect_follows_index_chain() {
        let lua = Lua::new();
        let table: LuaTable = lua
            .load(
                r#"
            local base = { OnDestroy = function(self) end }
            return setmetatable({}, { __index = base })
        "#,
            )
            .eval()
            .unwrap();
        let hooks = LifecycleHooks::detect(&table).unwrap();
        assert_eq!(hooks, LifecycleHooks::DESTROY);
    }
}
