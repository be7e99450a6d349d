//! Resource lookup and content errors.
//!
//! The runtime never touches the filesystem directly. Everything it needs
//! (component blueprints, actor templates, scenes, the manifest) is fetched
//! through a [`ResourceSource`], so the binary reads from a `resources/`
//! directory while tests serve the same documents from memory.
//!
//! Directory layout:
//!
//! ```text
//! resources/
//! ├── game.config
//! ├── component_types/<Type>.lua
//! ├── actor_templates/<name>.template
//! └── scenes/<name>.scene
//! ```

use rustc_hash::FxHashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::definitions::{ActorDefinition, GameManifest, SceneDefinition};

/// Broken or missing game content. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    #[error("resources/ missing (looked in {})", .0.display())]
    MissingResourcesRoot(PathBuf),
    #[error("resources/game.config missing")]
    MissingManifest,
    #[error("initial_scene unspecified in resources/game.config")]
    MissingInitialScene,
    #[error("failed to locate component {0}")]
    MissingComponentType(String),
    #[error("template {0} is missing")]
    MissingActorTemplate(String),
    #[error("scene {0} is missing")]
    MissingScene(String),
    /// A new component was declared without a `type` field.
    #[error("component '{key}' of actor '{actor}' has no type")]
    MissingComponentTypeField { actor: String, key: String },
    /// A resource exists but could not be read or is not valid JSON for its
    /// format.
    #[error("failed to parse {resource}: {message}")]
    Parse { resource: String, message: String },
    /// A blueprint script raised an error or did not define its table.
    #[error("problem with lua file {type_name}: {message}")]
    Blueprint { type_name: String, message: String },
}

/// Read access to game content by logical name.
///
/// Implementations return the raw document text, `None` when the resource
/// does not exist, or an error when it exists but cannot be read. Parsing
/// happens in the free functions of this module.
pub trait ResourceSource {
    fn component_blueprint(&self, type_name: &str) -> Result<Option<String>, ContentError>;
    fn actor_template(&self, name: &str) -> Result<Option<String>, ContentError>;
    fn scene(&self, name: &str) -> Result<Option<String>, ContentError>;
    fn manifest(&self) -> Result<Option<String>, ContentError>;
}

/// Content served from a `resources/` directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ContentError::MissingResourcesRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &str) -> Result<Option<String>, ContentError> {
        match std::fs::read_to_string(self.root.join(relative)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContentError::Parse {
                resource: format!("resources/{}", relative),
                message: e.to_string(),
            }),
        }
    }
}

impl ResourceSource for DirectorySource {
    fn component_blueprint(&self, type_name: &str) -> Result<Option<String>, ContentError> {
        self.read(&format!("component_types/{}.lua", type_name))
    }

    fn actor_template(&self, name: &str) -> Result<Option<String>, ContentError> {
        self.read(&format!("actor_templates/{}.template", name))
    }

    fn scene(&self, name: &str) -> Result<Option<String>, ContentError> {
        self.read(&format!("scenes/{}.scene", name))
    }

    fn manifest(&self) -> Result<Option<String>, ContentError> {
        self.read("game.config")
    }
}

/// In-memory content, used by tests and tools.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    blueprints: FxHashMap<String, String>,
    templates: FxHashMap<String, String>,
    scenes: FxHashMap<String, String>,
    manifest: Option<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, type_name: &str, source: &str) -> Self {
        self.blueprints.insert(type_name.to_string(), source.to_string());
        self
    }

    pub fn with_template(mut self, name: &str, json: &str) -> Self {
        self.templates.insert(name.to_string(), json.to_string());
        self
    }

    pub fn with_scene(mut self, name: &str, json: &str) -> Self {
        self.scenes.insert(name.to_string(), json.to_string());
        self
    }

    pub fn with_manifest(mut self, json: &str) -> Self {
        self.manifest = Some(json.to_string());
        self
    }
}

impl ResourceSource for MemorySource {
    fn component_blueprint(&self, type_name: &str) -> Result<Option<String>, ContentError> {
        Ok(self.blueprints.get(type_name).cloned())
    }

    fn actor_template(&self, name: &str) -> Result<Option<String>, ContentError> {
        Ok(self.templates.get(name).cloned())
    }

    fn scene(&self, name: &str) -> Result<Option<String>, ContentError> {
        Ok(self.scenes.get(name).cloned())
    }

    fn manifest(&self) -> Result<Option<String>, ContentError> {
        Ok(self.manifest.clone())
    }
}

/// Chunk name used when running a component blueprint, so script error
/// locations read `resources/component_types/<Type>.lua:<line>`.
pub fn blueprint_chunk_name(type_name: &str) -> String {
    format!("@resources/component_types/{}.lua", type_name)
}

pub fn load_actor_template(
    source: &dyn ResourceSource,
    name: &str,
) -> Result<ActorDefinition, ContentError> {
    let text = source
        .actor_template(name)?
        .ok_or_else(|| ContentError::MissingActorTemplate(name.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ContentError::Parse {
        resource: format!("resources/actor_templates/{}.template", name),
        message: e.to_string(),
    })
}

pub fn load_scene_definition(
    source: &dyn ResourceSource,
    name: &str,
) -> Result<SceneDefinition, ContentError> {
    let text = source
        .scene(name)?
        .ok_or_else(|| ContentError::MissingScene(name.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ContentError::Parse {
        resource: format!("resources/scenes/{}.scene", name),
        message: e.to_string(),
    })
}

pub fn load_manifest(source: &dyn ResourceSource) -> Result<GameManifest, ContentError> {
    let text = source.manifest()?.ok_or(ContentError::MissingManifest)?;
    serde_json::from_str(&text).map_err(|e| ContentError::Parse {
        resource: "resources/game.config".to_string(),
        message: e.to_string(),
    })
}
