//! Configuration loading and parsing.
//!
//! Parses `stepmap.toml` (or an override path provided by the binary) into two
//! sections: `[session]` seeds the playground (initial document, tracked
//! position, default insert text and input limits) and `[explain]` configures
//! the explanation service (model id, endpoint, credential variable, timeout).
//!
//! Every field has a default so an absent or partial file is fine. Unknown
//! fields are ignored. A file that fails to parse falls back to defaults with a
//! warning rather than aborting startup. `Config::normalize` reconciles values
//! that only make sense together (an initial document longer than the allowed
//! maximum, a tracked position past its end) and logs each adjustment.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "stepmap.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_document")]
    pub document: String,
    #[serde(default = "SessionConfig::default_tracked")]
    pub tracked: usize,
    #[serde(default = "SessionConfig::default_insert_text")]
    pub insert_text: String,
    #[serde(default = "SessionConfig::default_max_document_len")]
    pub max_document_len: usize,
    #[serde(default = "SessionConfig::default_max_insert_len")]
    pub max_insert_len: usize,
    #[serde(default = "SessionConfig::default_uppercase")]
    pub uppercase: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            document: Self::default_document(),
            tracked: Self::default_tracked(),
            insert_text: Self::default_insert_text(),
            max_document_len: Self::default_max_document_len(),
            max_insert_len: Self::default_max_insert_len(),
            uppercase: Self::default_uppercase(),
        }
    }
}

impl SessionConfig {
    fn default_document() -> String {
        "HELLO".to_string()
    }
    const fn default_tracked() -> usize {
        2 // between E and L
    }
    fn default_insert_text() -> String {
        "XYZ".to_string()
    }
    const fn default_max_document_len() -> usize {
        10
    }
    const fn default_max_insert_len() -> usize {
        5
    }
    const fn default_uppercase() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ExplainConfig {
    #[serde(default = "ExplainConfig::default_model")]
    pub model: String,
    #[serde(default = "ExplainConfig::default_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the credential.
    #[serde(default = "ExplainConfig::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "ExplainConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            endpoint: Self::default_endpoint(),
            api_key_env: Self::default_api_key_env(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl ExplainConfig {
    fn default_model() -> String {
        "gemini-2.5-flash".to_string()
    }
    fn default_endpoint() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }
    fn default_api_key_env() -> String {
        "API_KEY".to_string()
    }
    const fn default_timeout_secs() -> u64 {
        30
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub explain: ExplainConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path: working directory first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("stepmap").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let mut cfg = if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Config {
                    raw: Some(content),
                    file,
                }
            }
            Err(e) => {
                warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    cfg.normalize();
    Ok(cfg)
}

impl Config {
    pub fn session(&self) -> &SessionConfig {
        &self.file.session
    }

    pub fn explain(&self) -> &ExplainConfig {
        &self.file.explain
    }

    /// Bring interdependent session values into agreement. Returns true when
    /// anything was adjusted.
    pub fn normalize(&mut self) -> bool {
        let s = &mut self.file.session;
        let mut changed = false;

        if s.max_document_len == 0 {
            info!(target: "config", "max_document_len_zero_reset");
            s.max_document_len = SessionConfig::default_max_document_len();
            changed = true;
        }
        if s.uppercase {
            let upper = s.document.to_uppercase();
            if upper != s.document {
                s.document = upper;
                changed = true;
            }
            let upper = s.insert_text.to_uppercase();
            if upper != s.insert_text {
                s.insert_text = upper;
                changed = true;
            }
        }
        let doc_len = s.document.chars().count();
        if doc_len > s.max_document_len {
            info!(
                target: "config",
                doc_len,
                max = s.max_document_len,
                "initial_document_truncated"
            );
            s.document = s.document.chars().take(s.max_document_len).collect();
            changed = true;
        }
        let insert_len = s.insert_text.chars().count();
        if insert_len > s.max_insert_len {
            info!(
                target: "config",
                insert_len,
                max = s.max_insert_len,
                "insert_text_truncated"
            );
            s.insert_text = s.insert_text.chars().take(s.max_insert_len).collect();
            changed = true;
        }
        let doc_len = s.document.chars().count();
        if s.tracked > doc_len {
            info!(
                target: "config",
                raw = s.tracked,
                clamped = doc_len,
                "tracked_position_clamped"
            );
            s.tracked = doc_len;
            changed = true;
        }
        changed
    }
}
