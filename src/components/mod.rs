//! Component types and their blueprints.
//!
//! A component is either scripted (a Lua table inheriting from its blueprint)
//! or native (a Rust struct exposed to Lua as userdata). Both are handled
//! through [`instance::ComponentInstance`].
//!
//! Submodules overview:
//! - [`hooks`] – bitset of the lifecycle callbacks a component defines
//! - [`instance`] – component handle, lifecycle state and field access
//! - [`particlesystem`] – native particle emitter
//! - [`rigidbody`] – native physics body
//! - [`template`] – blueprint loading and the template cache
//! - [`vector2`] – 2D vector shared with scripts

pub mod hooks;
pub mod instance;
pub mod particlesystem;
pub mod rigidbody;
pub mod template;
pub mod vector2;
