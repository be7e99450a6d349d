//! Collision payload handed to `OnCollision*` and `OnTrigger*` callbacks.
//!
//! Each side of a contact receives its own [`Collision`] whose `other` field
//! names the opposite actor. `point`, `relative_velocity` and `normal` are
//! shared by both sides; trigger contacts and every exit carry
//! `(-999, -999)` for `point` and `normal`.
//!
//! ```lua
//! function Player:OnCollisionEnter(collision)
//!     if collision.other:GetName() == "Spikes" then
//!         Debug.Log("ouch at " .. tostring(collision.point))
//!     end
//! end
//! ```

use mlua::prelude::*;

use crate::components::hooks::LifecycleHooks;
use crate::components::vector2::Vector2;
use crate::resources::actor::ActorId;
use crate::resources::lua_runtime::ActorRef;
use crate::resources::physics::{ContactEvent, ContactKind, ContactPhase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub other: ActorId,
    pub point: Vector2,
    pub relative_velocity: Vector2,
    pub normal: Vector2,
}

impl Collision {
    /// The payloads for side `a` and side `b` of a contact.
    pub fn pair(event: &ContactEvent) -> (Collision, Collision) {
        let for_a = Collision {
            other: event.b,
            point: event.point,
            relative_velocity: event.relative_velocity,
            normal: event.normal,
        };
        let for_b = Collision {
            other: event.a,
            ..for_a
        };
        (for_a, for_b)
    }
}

/// Hook that handles a contact report.
pub fn hook_for(kind: ContactKind, phase: ContactPhase) -> LifecycleHooks {
    match (kind, phase) {
        (ContactKind::Collision, ContactPhase::Enter) => LifecycleHooks::COLLISION_ENTER,
        (ContactKind::Collision, ContactPhase::Exit) => LifecycleHooks::COLLISION_EXIT,
        (ContactKind::Trigger, ContactPhase::Enter) => LifecycleHooks::TRIGGER_ENTER,
        (ContactKind::Trigger, ContactPhase::Exit) => LifecycleHooks::TRIGGER_EXIT,
    }
}

impl LuaUserData for Collision {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("other", |_, this| Ok(ActorRef(this.other)));
        fields.add_field_method_get("point", |_, this| Ok(this.point));
        fields.add_field_method_get("relative_velocity", |_, this| {
            Ok(this.relative_velocity)
        });
        fields.add_field_method_get("normal", |_, this| Ok(this.normal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::physics::NO_CONTACT_POINT;
    use slotmap::SlotMap;

    #[test]
    fn pair_swaps_other() {
        let mut arena: SlotMap<ActorId, ()> = SlotMap::with_key();
        let (a, b) = (arena.insert(()), arena.insert(()));
        let event = ContactEvent {
            kind: ContactKind::Trigger,
            phase: ContactPhase::Enter,
            a,
            b,
            point: NO_CONTACT_POINT,
            normal: NO_CONTACT_POINT,
            relative_velocity: Vector2::new(1.0, 0.0),
        };
        let (for_a, for_b) = Collision::pair(&event);
        assert_eq!(for_a.other, b);
        assert_eq!(for_b.other, a);
        assert_eq!(for_b.relative_velocity, for_a.relative_velocity);
        assert_eq!(for_b.point, NO_CONTACT_POINT);
    }

    #[test]
    fn hooks_per_contact_kind() {
        assert_eq!(
            hook_for(ContactKind::Collision, ContactPhase::Exit),
            LifecycleHooks::COLLISION_EXIT
        );
        assert_eq!(
            hook_for(ContactKind::Trigger, ContactPhase::Enter),
            LifecycleHooks::TRIGGER_ENTER
        );
    }
}
