//! Optional TOML configuration file.
//!
//! Every field is optional; anything absent keeps its built-in default.  CLI
//! flags and environment variables are applied on top in `main.rs`.
//!
//! ```toml
//! [server]
//! host_bind = "0.0.0.0:24810"
//! viewer_addr = "127.0.0.1:24811"
//! log_level = "info"
//!
//! [protocol]
//! context_tag = "clovid_integration"
//! vqvpid = "viewport-1"
//!
//! [annotations]
//! default_shape_type = "fixed_arrow"
//! default_shape_color = -65281
//! settle_delay_ms = 100
//!
//! [[chrome_layout]]
//! subject = "sidebar_left"
//! action = "toggle"
//! ```
//!
//! A file that lists `[[chrome_layout]]` entries replaces the default layout
//! entirely; an empty list (`chrome_layout = []`) disables it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BridgeConfig, ChromeChange};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// An address field is not `ip:port`.
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub protocol: ProtocolSection,
    #[serde(default)]
    pub annotations: AnnotationSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_layout: Option<Vec<ChromeChange>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host_bind: Option<String>,
    pub viewer_addr: Option<String>,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolSection {
    pub context_tag: Option<String>,
    pub vqvpid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationSection {
    pub default_shape_type: Option<String>,
    pub default_shape_color: Option<i64>,
    pub settle_delay_ms: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host_bind: None,
            viewer_addr: None,
            log_level: default_log_level(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the file at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`] if
/// it is not valid TOML for this schema.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

pub fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

impl FileConfig {
    pub fn log_level(&self) -> &str {
        &self.server.log_level
    }

    /// Overlays the fields present in the file onto `config`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidAddress`] if an address does not parse.
    pub fn apply_to(&self, config: &mut BridgeConfig) -> Result<(), ConfigError> {
        if let Some(addr) = &self.server.host_bind {
            config.host_bind_addr = parse_addr("host_bind", addr)?;
        }
        if let Some(addr) = &self.server.viewer_addr {
            config.viewer_addr = parse_addr("viewer_addr", addr)?;
        }
        if let Some(tag) = &self.protocol.context_tag {
            config.context_tag = tag.clone();
        }
        if let Some(id) = &self.protocol.vqvpid {
            config.host_correlation_id = Some(id.clone());
        }
        if let Some(shape) = &self.annotations.default_shape_type {
            config.default_shape_type = shape.clone();
        }
        if let Some(color) = self.annotations.default_shape_color {
            config.default_shape_color = color;
        }
        if let Some(ms) = self.annotations.settle_delay_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(layout) = &self.chrome_layout {
            config.chrome_layout = layout.clone();
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
