use marionette_core::config::CharacterConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from lowercase emotion token to renderer expression preset id.
///
/// Keys are normalized to lowercase on construction; lookups are
/// case-insensitive as a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotionMap(HashMap<String, u32>);

impl EmotionMap {
    pub fn new(entries: HashMap<String, u32>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        )
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.0.get(&token.to_lowercase()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Whether `id` is a value of the map — the validity test for every
    /// expression id that reaches the renderer.
    pub fn contains_id(&self, id: u32) -> bool {
        self.0.values().any(|v| *v == id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, u32); N]> for EmotionMap {
    fn from(entries: [(&str, u32); N]) -> Self {
        Self::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

/// The model a session's renderer has loaded.
///
/// Built once from config and shared read-only by every session; a session
/// holds the same descriptor for its whole lifetime.
#[derive(Debug, Clone)]
pub struct LiveModelDescriptor {
    pub character_name: String,
    pub character_id: String,
    pub avatar: String,
    /// Expression restored when a timed expression elapses.
    pub default_expression: u32,
    emotion_map: EmotionMap,
    motion_groups: HashMap<String, Vec<u32>>,
}

impl LiveModelDescriptor {
    pub fn from_config(cfg: &CharacterConfig) -> Self {
        Self {
            character_name: cfg.name.clone(),
            character_id: cfg.id.clone(),
            avatar: cfg.avatar.clone(),
            default_expression: cfg.default_expression,
            emotion_map: EmotionMap::new(cfg.emotion_map.clone()),
            motion_groups: cfg.motion_groups.clone(),
        }
    }

    pub fn emotion_map(&self) -> &EmotionMap {
        &self.emotion_map
    }

    pub fn has_expression(&self, id: u32) -> bool {
        self.emotion_map.contains_id(id)
    }

    pub fn has_motion_group(&self, group: &str) -> bool {
        self.motion_groups.contains_key(group)
    }

    pub fn motion_groups(&self) -> &HashMap<String, Vec<u32>> {
        &self.motion_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_normalized_to_lowercase() {
        let map = EmotionMap::from([("Joy", 3), ("SADNESS", 1)]);
        assert_eq!(map.get("joy"), Some(3));
        assert_eq!(map.get("JOY"), Some(3));
        assert_eq!(map.get("sadness"), Some(1));
        assert_eq!(map.get("anger"), None);
    }

    #[test]
    fn contains_id_checks_values_not_keys() {
        let map = EmotionMap::from([("neutral", 0), ("joy", 3)]);
        assert!(map.contains_id(0));
        assert!(map.contains_id(3));
        assert!(!map.contains_id(1));
    }

    #[test]
    fn descriptor_from_config_defaults() {
        let descriptor = LiveModelDescriptor::from_config(&Default::default());
        assert!(descriptor.has_motion_group("idle"));
        assert!(!descriptor.has_motion_group("dance"));
        assert!(descriptor.has_expression(descriptor.default_expression));
    }
}
