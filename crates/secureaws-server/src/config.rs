use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use secureaws_assistant::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub openai: Option<OpenAiConfig>,
    pub generation_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("SECUREAWS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SECUREAWS_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("SECUREAWS_PORT must be a port number")?;
        let db_path = PathBuf::from(get("SECUREAWS_DB_PATH").unwrap_or_else(|| "secureaws.db".into()));
        let timeout_secs: u64 = get("SECUREAWS_GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("SECUREAWS_GENERATION_TIMEOUT_SECS must be a whole number of seconds")?;

        // Placeholder keys like "your-key-here" mean demo mode.
        let openai = get("OPENAI_API_KEY")
            .filter(|key| key.starts_with("sk-"))
            .map(|api_key| OpenAiConfig {
                api_key,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            });

        Ok(Self {
            host,
            port,
            db_path,
            openai,
            generation_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
