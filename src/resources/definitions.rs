//! JSON resource formats.
//!
//! Actor templates (`actor_templates/<name>.template`), scenes
//! (`scenes/<name>.scene`) and the game manifest (`game.config`) are plain
//! JSON documents deserialized with `serde_json`.
//!
//! ```json
//! {
//!   "name": "Goblin",
//!   "components": {
//!     "ai":   { "type": "AI", "speed": 2 },
//!     "body": { "type": "Rigidbody", "body_type": "dynamic" }
//!   }
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One component entry: an optional `type` plus free-form field overrides.
///
/// `type` is required when the entry introduces a new component and ignored
/// when it overrides a component inherited from a template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentDefinition {
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Actor entry of a scene, or the body of an actor template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneDefinition {
    #[serde(default)]
    pub actors: Vec<ActorDefinition>,
}

/// `resources/game.config`.
#[derive(Debug, Clone, Deserialize)]
pub struct GameManifest {
    pub initial_scene: Option<String>,
    #[serde(default)]
    pub game_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_is_split_from_fields() {
        let def: ComponentDefinition =
            serde_json::from_str(r#"{ "type": "AI", "speed": 2, "name": "grunt" }"#).unwrap();
        assert_eq!(def.type_name.as_deref(), Some("AI"));
        assert_eq!(def.fields.len(), 2);
        assert_eq!(def.fields["speed"], Value::from(2));
        assert!(!def.fields.contains_key("type"));
    }

    #[test]
    fn scene_entries_accept_template_and_overrides() {
        let scene: SceneDefinition = serde_json::from_str(
            r#"{ "actors": [
                { "template": "Goblin", "components": { "ai": { "speed": 5 } } },
                { "name": "Camera" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(scene.actors.len(), 2);
        assert_eq!(scene.actors[0].template.as_deref(), Some("Goblin"));
        assert_eq!(scene.actors[0].components["ai"].type_name, None);
        assert_eq!(scene.actors[1].name.as_deref(), Some("Camera"));
        assert!(scene.actors[1].components.is_empty());
    }

    #[test]
    fn component_keys_are_sorted() {
        let actor: ActorDefinition = serde_json::from_str(
            r#"{ "components": { "b": { "type": "B" }, "a": { "type": "A" }, "1": { "type": "C" } } }"#,
        )
        .unwrap();
        let keys: Vec<&str> = actor.components.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "a", "b"]);
    }

    #[test]
    fn manifest_title_is_optional() {
        let manifest: GameManifest =
            serde_json::from_str(r#"{ "initial_scene": "basic" }"#).unwrap();
        assert_eq!(manifest.initial_scene.as_deref(), Some("basic"));
        assert!(manifest.game_title.is_none());
    }
}
