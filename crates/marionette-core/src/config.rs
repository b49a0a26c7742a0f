use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Control-plane constants — shared by the gateway and the session layer.
pub const DEFAULT_PORT: u16 = 12393;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Bounded per-session outbound queue depth.
pub const OUTBOUND_CAPACITY: usize = 64;
/// Direct-reply paths block this long on a full outbound queue before failing.
pub const DIRECT_SEND_TIMEOUT_MS: u64 = 1_000;
/// Upper bound on a single agent / TTS call made from a synchronous endpoint.
pub const COLLABORATOR_TIMEOUT_SECS: u64 = 30;

/// Top-level config (marionette.toml + MARIONETTE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarionetteConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub character: CharacterConfig,
    #[serde(default)]
    pub autonomous: AutonomousConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// The live model the renderer drives, as deployed alongside the gateway.
///
/// `emotion_map` maps lowercase emotion tokens to renderer expression presets;
/// `motion_groups` maps group names to the motion indices the model ships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    #[serde(default = "default_character_id")]
    pub id: String,
    #[serde(default = "default_character_name")]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    /// Expression restored after a timed expression elapses.
    #[serde(default)]
    pub default_expression: u32,
    #[serde(default = "default_emotion_map")]
    pub emotion_map: HashMap<String, u32>,
    #[serde(default = "default_motion_groups")]
    pub motion_groups: HashMap<String, Vec<u32>>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            id: default_character_id(),
            name: default_character_name(),
            avatar: String::new(),
            default_expression: 0,
            emotion_map: default_emotion_map(),
            motion_groups: default_motion_groups(),
        }
    }
}

/// Autonomous speech generator settings, mutable at runtime through
/// `/api/autonomous/control`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_interval")]
    pub min_interval_seconds: f64,
    #[serde(default = "default_max_interval")]
    pub max_interval_seconds: f64,
    #[serde(default = "default_prompt_pool")]
    pub prompt_pool: Vec<String>,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_seconds: default_min_interval(),
            max_interval_seconds: default_max_interval(),
            prompt_pool: default_prompt_pool(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// When false, ingested chat messages are filtered and scored but never
    /// answered.
    #[serde(default = "bool_true")]
    pub auto_responses_enabled: bool,
    /// Session whose agent/context answers chat and autonomous prompts.
    #[serde(default = "default_presenter")]
    pub presenter_session: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            auto_responses_enabled: true,
            presenter_session: default_presenter(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_character_id() -> String {
    "mari-01".to_string()
}
fn default_character_name() -> String {
    "Mari".to_string()
}
fn default_min_interval() -> f64 {
    60.0
}
fn default_max_interval() -> f64 {
    180.0
}
fn default_presenter() -> String {
    "default".to_string()
}

fn default_emotion_map() -> HashMap<String, u32> {
    HashMap::from([
        ("neutral".to_string(), 0),
        ("sadness".to_string(), 1),
        ("anger".to_string(), 2),
        ("joy".to_string(), 3),
        ("surprise".to_string(), 4),
        ("fear".to_string(), 5),
        ("disgust".to_string(), 6),
    ])
}

fn default_motion_groups() -> HashMap<String, Vec<u32>> {
    HashMap::from([
        ("idle".to_string(), vec![0, 1, 2]),
        ("tap_body".to_string(), vec![0, 1]),
    ])
}

fn default_prompt_pool() -> Vec<String> {
    vec![
        "Share a short fun thought with the viewers.".to_string(),
        "Comment on how the stream is going.".to_string(),
        "Ask the chat a light question.".to_string(),
    ]
}

impl MarionetteConfig {
    /// Load config from a TOML file with MARIONETTE_* env var overrides.
    ///
    /// A missing file is not an error — defaults apply and env vars still win.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("marionette.toml");

        let config: MarionetteConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MARIONETTE_").split("_"))
            .extract()
            .map_err(|e| crate::error::ControlError::Config(e.to_string()))?;

        Ok(config)
    }
}
