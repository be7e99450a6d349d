//! Lua scripting runtime for the object runtime.
//!
//! Scripts see a small set of global tables:
//!
//! - `Debug` - `Log`, `LogError`
//! - `Vector2` - constructor plus `Distance` and `Dot`
//! - `Actor` - `Find`, `FindAll`, `Instantiate`, `Destroy`
//! - `Application` - `GetFrame`, `GetTime`, `Quit`, `Sleep`
//! - `Scene` - `Load`, `GetCurrent`, `DontDestroy`
//! - `Event` - `Subscribe`, `Unsubscribe`, `Publish`
//! - `Physics` - `Raycast`, `RaycastAll`
//! - `Text` - `Draw`
//! - `Image` - `Draw`, `DrawEx`, `DrawUI`, `DrawUIEx`, `DrawPixel`
//! - `Camera` - `SetPosition`, `GetPositionX`, `GetPositionY`, `SetZoom`,
//!   `GetZoom`, `GetCameraWidth`, `GetCameraHeight`
//!
//! Every component table also carries `key`, `enabled` and an `actor`
//! handle ([`ActorRef`]).
//!
//! # Example
//!
//! ```lua
//! function Spawner:OnUpdate()
//!     if Application.GetFrame() % 60 == 0 then
//!         local goblin = Actor.Instantiate("Goblin")
//!         Event.Publish("spawned", goblin)
//!     end
//! end
//! ```

mod actor_ref;
mod physics_api;
mod render_api;
mod runtime;

pub use actor_ref::{ActorRef, enabled_component_by_key, enabled_components};
pub use runtime::{
    LuaRuntime, normalize_error_location, owner_name, report_script_error, script_error_message,
    value_enabled,
};
