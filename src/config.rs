//! Configuration for ingestion, retrieval, tutoring and validation.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.teacherspet/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the command handlers)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TP_` and use double underscores
//! to separate nested levels:
//! - `TP_RETRIEVAL__TOP_K=8` sets `retrieval.top_k`
//! - `TP_EMBEDDING__PROVIDER=openai` sets `embedding.provider`
//! - `TP_VALIDATION__ENABLED=false` sets `validation.enabled`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::documents::ChunkingConfig;
use crate::validation::{DEFAULT_REFUSAL, DEFAULT_VALIDATORS};

/// Directory that marks a workspace.
pub const CONFIG_DIR: &str = ".teacherspet";

const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .teacherspet is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub tutor: TutorConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which embedding backend to run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX model via fastembed
    FastEmbed,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_backend")]
    pub provider: EmbeddingBackend,

    /// fastembed model name, or the remote model id
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Texts per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Base URL for the remote backend
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the remote API key
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Chunks pulled into each grounding context
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TutorConfig {
    #[serde(default = "default_tutor_model")]
    pub model: String,

    #[serde(default = "default_models_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_models_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_tutor_temperature")]
    pub temperature: f32,

    #[serde(default = "default_tutor_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Judge model ids
    #[serde(default = "default_validators")]
    pub validators: Vec<String>,

    #[serde(default = "default_models_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_models_key_env")]
    pub api_key_env: String,

    /// Per-judge timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_judge_temperature")]
    pub temperature: f32,

    #[serde(default = "default_judge_max_tokens")]
    pub max_tokens: usize,

    /// Shown instead of an answer that fails validation
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for every target without an override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target levels, e.g. `validation = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 { 1 }
fn default_index_path() -> PathBuf { PathBuf::from(".teacherspet/index") }
fn default_true() -> bool { true }
fn default_embedding_backend() -> EmbeddingBackend { EmbeddingBackend::FastEmbed }
fn default_embedding_model() -> String { "AllMiniLML6V2".to_string() }
fn default_batch_size() -> usize { crate::embedding::DEFAULT_BATCH_SIZE }
fn default_embedding_endpoint() -> String { "https://api.openai.com/v1".to_string() }
fn default_embedding_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_timeout_secs() -> u64 { 60 }
fn default_top_k() -> usize { crate::retrieval::DEFAULT_TOP_K }
fn default_tutor_model() -> String { "gpt-4.1-mini".to_string() }
fn default_models_endpoint() -> String { "https://models.inference.ai.azure.com".to_string() }
fn default_models_key_env() -> String { "GITHUB_TOKEN".to_string() }
fn default_tutor_temperature() -> f32 { 0.7 }
fn default_tutor_max_tokens() -> usize { 1024 }
fn default_system_prompt() -> String {
    "You are a helpful math tutor. Explain clearly and step-by-step.".to_string()
}
fn default_validators() -> Vec<String> {
    DEFAULT_VALIDATORS.iter().map(|m| m.to_string()).collect()
}
fn default_judge_temperature() -> f32 { 0.3 }
fn default_judge_max_tokens() -> usize { 10 }
fn default_refusal_message() -> String { DEFAULT_REFUSAL.to_string() }
fn default_log_level() -> String { "warn".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            tutor: TutorConfig::default(),
            validation: ValidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_backend(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            endpoint: default_embedding_endpoint(),
            api_key_env: default_embedding_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            model: default_tutor_model(),
            endpoint: default_models_endpoint(),
            api_key_env: default_models_key_env(),
            temperature: default_tutor_temperature(),
            max_tokens: default_tutor_max_tokens(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            validators: default_validators(),
            endpoint: default_models_endpoint(),
            api_key_env: default_models_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: default_judge_temperature(),
            max_tokens: default_judge_max_tokens(),
            refusal_message: default_refusal_message(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .teacherspet directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed("TP_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the workspace config by looking for a .teacherspet directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .teacherspet is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Index directory, resolved against the workspace root when relative.
    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.index_path.is_relative() => root.join(&self.index_path),
            _ => self.index_path.clone(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file under the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
