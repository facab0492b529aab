//! Server configuration.
//!
//! Loaded from `SIREN_*` environment variables; every knob has a local
//! development default so `siren-api` starts with nothing set.

use std::path::PathBuf;

use siren_core::error::{Error, Result};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default geocoding endpoint.
pub const DEFAULT_GEO_URL: &str = "https://nominatim.openstreetmap.org";

/// Assist (chatbot) settings.
#[derive(Debug, Clone)]
pub struct AssistSettings {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token for the endpoint.
    pub api_key: Option<String>,
    /// Model id.
    pub model: String,
    /// Token budget per reply.
    pub max_tokens: u32,
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            api_url: siren_assist::client::DEFAULT_API_URL.to_string(),
            api_key: None,
            model: siren_assist::client::DEFAULT_MODEL.to_string(),
            max_tokens: siren_assist::client::DEFAULT_MAX_TOKENS,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Development posture: pretty logs, permissive CORS.
    pub debug: bool,
    /// Geocoding endpoint base URL.
    pub geo_base_url: String,
    /// Optional knowledge base file; the embedded one is used otherwise.
    pub knowledge_path: Option<PathBuf>,
    /// Chatbot settings.
    pub assist: AssistSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            debug: true,
            geo_base_url: DEFAULT_GEO_URL.to_string(),
            knowledge_path: None,
            assist: AssistSettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SIREN_PORT`: listen port (default 8080)
    /// - `SIREN_DEBUG`: `true`/`false` (default true)
    /// - `SIREN_GEO_URL`: geocoding base URL
    /// - `SIREN_KNOWLEDGE_PATH`: knowledge base JSON file
    /// - `SIREN_ASSIST_URL`, `SIREN_ASSIST_API_KEY`, `SIREN_ASSIST_MODEL`,
    ///   `SIREN_ASSIST_MAX_TOKENS`: chatbot settings
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("SIREN_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::validation(format!("SIREN_PORT is not a port: {port}")))?;
        }
        if let Ok(debug) = std::env::var("SIREN_DEBUG") {
            config.debug = debug
                .parse()
                .map_err(|_| Error::validation(format!("SIREN_DEBUG is not a bool: {debug}")))?;
        }
        if let Ok(url) = std::env::var("SIREN_GEO_URL") {
            config.geo_base_url = url;
        }
        if let Ok(path) = std::env::var("SIREN_KNOWLEDGE_PATH") {
            config.knowledge_path = Some(PathBuf::from(path));
        }
        if let Ok(url) = std::env::var("SIREN_ASSIST_URL") {
            config.assist.api_url = url;
        }
        if let Ok(key) = std::env::var("SIREN_ASSIST_API_KEY") {
            config.assist.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("SIREN_ASSIST_MODEL") {
            config.assist.model = model;
        }
        if let Ok(max_tokens) = std::env::var("SIREN_ASSIST_MAX_TOKENS") {
            config.assist.max_tokens = max_tokens.parse().map_err(|_| {
                Error::validation(format!("SIREN_ASSIST_MAX_TOKENS is not a number: {max_tokens}"))
            })?;
        }

        Ok(config)
    }
}
