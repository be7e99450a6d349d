//! aberredcore library.
//!
//! The object-lifecycle runtime of a 2D engine: actors, their scripted and
//! native components, scenes and the script-facing event bus. Exposed as a
//! library for the runner binary and for integration tests.

pub mod components;
pub mod events;
pub mod game;
pub mod resources;
pub mod systems;
