//! Long-lived runtime data.
//!
//! Overview
//! - `actor` – actor data, component indices and deferred buffers
//! - `assets` – resource lookup by name and content errors
//! - `context` – the shared runtime context
//! - `definitions` – JSON formats of templates, scenes and the manifest
//! - `drawqueue` – draw requests handed to the renderer
//! - `gameconfig` – INI configuration
//! - `lua_runtime` – Lua host and script API
//! - `physics` – rigid bodies, contacts and the fixed-step world
//! - `scene` – actors of the current scene and the name index
//! - `worldtime` – frame counter and elapsed time
pub mod actor;
pub mod assets;
pub mod context;
pub mod definitions;
pub mod drawqueue;
pub mod gameconfig;
pub mod lua_runtime;
pub mod physics;
pub mod scene;
pub mod worldtime;
