//! Build configuration.
//!
//! YAML-backed settings for the composition engine. Every field has a
//! default, so an empty document is a valid configuration:
//!
//! ```yaml
//! version: 1
//! palettes:
//!   discrete: set2
//! stats:
//!   bins: 20
//! field_matching: case_insensitive
//! suppress_warnings: [empty_panel]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::palette::{DEFAULT_CONTINUOUS, DEFAULT_DISCRETE};
use crate::warning::WarningKind;

/// Default palettes for scales that do not name one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Palette for discrete color/fill scales.
    #[serde(default = "default_discrete")]
    pub discrete: String,

    /// Palette for continuous color/fill scales.
    #[serde(default = "default_continuous")]
    pub continuous: String,
}

fn default_discrete() -> String {
    DEFAULT_DISCRETE.to_string()
}
fn default_continuous() -> String {
    DEFAULT_CONTINUOUS.to_string()
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self { discrete: default_discrete(), continuous: default_continuous() }
    }
}

/// Statistical transform defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatConfig {
    /// Number of bins for `bin`.
    #[serde(default = "default_bins")]
    pub bins: usize,

    /// Grid points for `density`.
    #[serde(default = "default_density_points")]
    pub density_points: usize,

    /// Grid points for `smooth`.
    #[serde(default = "default_smooth_points")]
    pub smooth_points: usize,

    /// LOESS neighborhood fraction.
    #[serde(default = "default_loess_span")]
    pub loess_span: f64,

    /// LOESS robustness iterations.
    #[serde(default)]
    pub loess_iterations: usize,

    /// Confidence level for the linear smoother band.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

fn default_bins() -> usize {
    30
}
fn default_density_points() -> usize {
    512
}
fn default_smooth_points() -> usize {
    80
}
fn default_loess_span() -> f64 {
    0.75
}
fn default_confidence_level() -> f64 {
    0.95
}

impl Default for StatConfig {
    fn default() -> Self {
        Self {
            bins: default_bins(),
            density_points: default_density_points(),
            smooth_points: default_smooth_points(),
            loess_span: default_loess_span(),
            loess_iterations: 0,
            confidence_level: default_confidence_level(),
        }
    }
}

/// How aesthetic names are matched against field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMatching {
    /// Case-sensitive exact match only.
    #[default]
    Exact,
    /// Fall back to a unique case-insensitive match.
    CaseInsensitive,
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Default palettes.
    #[serde(default)]
    pub palettes: PaletteConfig,

    /// Stat defaults.
    #[serde(default)]
    pub stats: StatConfig,

    /// Field-name matching mode.
    #[serde(default)]
    pub field_matching: FieldMatching,

    /// Seed for jitter positions that do not carry their own.
    #[serde(default)]
    pub jitter_seed: u64,

    /// Compute facet panels in parallel when the `parallel` feature is enabled.
    #[serde(default = "default_parallel_panels")]
    pub parallel_panels: bool,

    /// Warning kinds that are neither recorded nor logged.
    #[serde(default)]
    pub suppress_warnings: Vec<WarningKind>,

    /// Default plot width.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Default plot height.
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_version() -> u32 {
    1
}
fn default_parallel_panels() -> bool {
    true
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            palettes: PaletteConfig::default(),
            stats: StatConfig::default(),
            field_matching: FieldMatching::default(),
            jitter_seed: 0,
            parallel_panels: default_parallel_panels(),
            suppress_warnings: Vec::new(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails, or
    /// [`Error::ConfigInvalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml).map_err(|e| {
                let line = e.location().map_or(0, |l| l.line());
                Error::ConfigParse { line, message: e.to_string() }
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(Error::ConfigInvalid { key: key.to_string(), message: message.to_string() })
        };

        if self.stats.bins == 0 {
            return invalid("stats.bins", "must be at least 1");
        }
        if self.stats.density_points < 2 {
            return invalid("stats.density_points", "must be at least 2");
        }
        if self.stats.smooth_points < 2 {
            return invalid("stats.smooth_points", "must be at least 2");
        }
        if !(self.stats.loess_span > 0.0 && self.stats.loess_span <= 1.0) {
            return invalid("stats.loess_span", "must be in (0, 1]");
        }
        if !(self.stats.confidence_level > 0.0 && self.stats.confidence_level < 1.0) {
            return invalid("stats.confidence_level", "must be in (0, 1)");
        }
        if self.width == 0 || self.height == 0 {
            return invalid("width/height", "must be non-zero");
        }
        if self.palettes.discrete.is_empty() || self.palettes.continuous.is_empty() {
            return invalid("palettes", "palette names cannot be empty");
        }
        Ok(())
    }
}
