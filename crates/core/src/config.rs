use serde::{Deserialize, Serialize};

const FIVE_MIB: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite path or `sqlite:` URL.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Key the document list is stored under.
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Byte quota across all keys; 0 disables it.
    #[serde(default = "default_quota")]
    pub quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            key: default_storage_key(),
            quota_bytes: default_quota(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub name: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider(),
            chat_model: default_chat_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 0 disables the limit.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Keep file contents as a `data:` URI on the document so they survive a
    /// restart, instead of an ephemeral in-process handle.
    #[serde(default)]
    pub embed_file_data: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            embed_file_data: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_db_path() -> String {
    "data/docvault.db".to_string()
}
fn default_storage_key() -> String {
    "certvault-ai-documents".to_string()
}
fn default_quota() -> u64 {
    FIVE_MIB
}
fn default_provider() -> String {
    "openai".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_file_size() -> u64 {
    FIVE_MIB
}
fn default_debounce_ms() -> u64 {
    500
}

/// Loads configuration from a TOML file (or `config/default` when present)
/// with `DOCVAULT__SECTION__KEY` environment overrides on top.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("DOCVAULT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
