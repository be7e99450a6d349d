//! Runtime systems.
//!
//! Systems are free functions over the [`crate::resources::context::RuntimeContext`]
//! that advance the object runtime by one step.
//!
//! Submodules overview
//! - [`collision`] – deliver physics contact reports to component callbacks
//! - [`events`] – synchronous `Event.Publish` delivery
//! - [`lifecycle`] – per-actor start/update/flush/teardown passes
//! - [`scene`] – scene update, instantiation, destruction, persistence and loading

pub mod collision;
pub mod events;
pub mod lifecycle;
pub mod scene;
