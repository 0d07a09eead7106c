use crate::llm::LlmSettings;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default Gemini API root.
const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Directory for uploaded documents
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub llm: LlmConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub dir: String,
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Load configuration.
    ///
    /// Priority: CLI flag (or its env var) > `GEMINI_*` env > `DOCCHAT_*` env
    /// > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 5001)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("server.max_body_bytes", 50 * 1024 * 1024)?
            .set_default("upload.dir", "uploads")?
            .set_default("llm.base_url", DEFAULT_LLM_BASE_URL)?
            .set_default("llm.model", "gemini-2.0-flash")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("log.json", false)?;

        // Explicit file must exist; the working-directory fallback is optional.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // E.g. DOCCHAT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("DOCCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            builder = builder.set_override("llm.api_key", key)?;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            builder = builder.set_override("llm.model", model)?;
        }

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(dir) = cli.upload_dir {
            builder = builder.set_override("upload.dir", dir)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validated settings for the completion client.
    pub fn llm_settings(&self) -> Result<LlmSettings, ConfigError> {
        let api_key = self
            .llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message(
                    "Missing API key: set GEMINI_API_KEY or llm.api_key".to_string(),
                )
            })?;

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Message("llm.model cannot be empty".to_string()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "llm.base_url cannot be empty".to_string(),
            ));
        }

        Ok(LlmSettings {
            base_url: self.llm.base_url.clone(),
            api_key,
            model: self.llm.model.clone(),
            timeout: Duration::from_secs(self.llm.timeout_secs),
        })
    }

    /// Overall per-request deadline enforced by the server.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
