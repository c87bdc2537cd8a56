//! Launcher configuration
//!
//! Read from `$FLORAL_HOME/config.toml` (or `--config` / `FLORAL_CONFIG`).
//! Every key is optional; a missing default file means built-in defaults.
//! CLI flags are applied on top with [`FloralConfig::apply_overrides`].

use anyhow::{bail, Context, Result};
use floral_intent::{GatewayConfig, MatcherConfig, PipelineConfig, MAX_TOP_K};
use floral_mcp::McpServerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `$FLORAL_HOME/config.toml`
pub fn default_config_path() -> PathBuf {
    floral_logging::floral_home().join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloralConfig {
    pub taxonomy: TaxonomySection,
    pub matcher: MatcherSection,
    pub gateway: GatewaySection,
    pub synthesis: SynthesisSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxonomySection {
    /// External dataset replacing the bundled one.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score")]
    pub default_score: f64,
    #[serde(default = "default_saturation")]
    pub saturation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_true")]
    pub allow_synthesis: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// External synthesis collaborator. No command means synthesis is not
/// configured.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisSection {
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_top_k() -> usize {
    MatcherConfig::default().top_k
}

fn default_score() -> f64 {
    MatcherConfig::default().default_score
}

fn default_saturation() -> f64 {
    MatcherConfig::default().saturation
}

fn default_confidence_threshold() -> f64 {
    GatewayConfig::default().confidence_threshold
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_server_name() -> String {
    floral_mcp::server::DEFAULT_SERVER_NAME.to_string()
}

fn default_max_response_bytes() -> usize {
    floral_mcp::server::DEFAULT_MAX_RESPONSE_BYTES
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            default_score: default_score(),
            saturation: default_saturation(),
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            allow_synthesis: default_true(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub top_k: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub no_synthesis: bool,
}

impl FloralConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. The default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_path(&path)
                } else {
                    tracing::debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(top_k) = overrides.top_k {
            self.matcher.top_k = top_k;
        }
        if let Some(threshold) = overrides.confidence_threshold {
            self.gateway.confidence_threshold = threshold;
        }
        if overrides.no_synthesis {
            self.gateway.allow_synthesis = false;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.matcher.top_k == 0 {
            bail!("matcher.top_k must be at least 1");
        }
        if self.matcher.top_k > MAX_TOP_K {
            bail!("matcher.top_k must be at most {MAX_TOP_K}, got {}", self.matcher.top_k);
        }
        if !(0.0..=1.0).contains(&self.matcher.default_score) {
            bail!(
                "matcher.default_score must be within [0, 1], got {}",
                self.matcher.default_score
            );
        }
        if !self.matcher.saturation.is_finite() || self.matcher.saturation <= 0.0 {
            bail!(
                "matcher.saturation must be positive, got {}",
                self.matcher.saturation
            );
        }
        if !(0.0..=1.0).contains(&self.gateway.confidence_threshold) {
            bail!(
                "gateway.confidence_threshold must be within [0, 1], got {}",
                self.gateway.confidence_threshold
            );
        }
        if self.gateway.timeout_ms == 0 {
            bail!("gateway.timeout_ms must be positive");
        }
        if matches!(&self.synthesis.command, Some(cmd) if cmd.trim().is_empty()) {
            bail!("synthesis.command must not be empty");
        }
        if self.server.max_response_bytes == 0 {
            bail!("server.max_response_bytes must be positive");
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            matcher: MatcherConfig {
                top_k: self.matcher.top_k,
                default_score: self.matcher.default_score,
                saturation: self.matcher.saturation,
            },
            gateway: GatewayConfig {
                confidence_threshold: self.gateway.confidence_threshold,
                allow_synthesis: self.gateway.allow_synthesis,
                timeout: Duration::from_millis(self.gateway.timeout_ms),
            },
        }
    }

    pub fn server_config(&self) -> McpServerConfig {
        McpServerConfig {
            server_name: self.server.name.clone(),
            max_response_bytes: self.server.max_response_bytes,
            ..McpServerConfig::default()
        }
    }
}
