//! Event types exchanged between the runtime and scripts.
//!
//! Submodules:
//! - [`collision`] – payload handed to collision and trigger callbacks
//! - [`eventbus`] – script-facing publish/subscribe bus
pub mod collision;
pub mod eventbus;
