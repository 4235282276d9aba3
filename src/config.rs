//! Configuration management for footerscan
//!
//! Configuration is loaded from `./config/footerscan.toml`. When that file is
//! absent the embedded template is used, so the template is the single place
//! defaults live.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::result_sink::OutputFormat;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/footerscan.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/footerscan.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid CSS selector in '{field}': {selector} ({error})")]
    InvalidSelector {
        field: String,
        selector: String,
        error: String,
    },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' must be greater than 0")]
    ZeroValue { field: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Pages rendered at the same time
    pub concurrency: usize,
    pub page_timeout_secs: u64,
    /// Readiness selector waited for before the footer query
    pub wait_selector: String,
}

impl ExtractionConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Rendering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chrome; scripts run and computed styles decide visibility
    Chrome,
    /// Plain HTTP fetch; footer found in the served HTML
    Static,
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererKind::Chrome => write!(f, "chrome"),
            RendererKind::Static => write!(f, "static"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    pub kind: RendererKind,
    pub max_browser_instances: usize,
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    /// None: sandbox on, except inside containers
    #[serde(default)]
    pub sandbox: Option<bool>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path`, falling back to the embedded defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::FileNotFound(_)) => Self::from_toml(DEFAULT_CONFIG),
            other => other,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("extraction.concurrency", self.extraction.concurrency as u64)?;
        non_zero("extraction.page_timeout_secs", self.extraction.page_timeout_secs)?;
        non_zero("renderer.max_browser_instances", self.renderer.max_browser_instances as u64)?;

        validate_selector("extraction.wait_selector", &self.extraction.wait_selector)?;

        if self.renderer.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "renderer.user_agent".to_string(),
            });
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.path".to_string(),
            });
        }

        Ok(())
    }

    /// Write the default configuration template to `path`
    pub fn write_default_config(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}

fn non_zero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroValue {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// The selector must be non-empty and parse as CSS.
pub fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::EmptyRequired {
            field: field.to_string(),
        });
    }
    scraper::Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
        error: e.to_string(),
    })?;
    Ok(())
}
