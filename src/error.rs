//! Error types for trueno-gg operations.
//!
//! Every variant here is fatal. Recoverable degradations are reported through
//! [`crate::warning::Warnings`] instead.

use std::io;
use thiserror::Error;

use crate::grammar::{Channel, GeomKind};

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while declaring or building a plot.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (config files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A field required by a facet or a positional channel is not in the dataset.
    #[error("field '{field}' not found for {context}; available fields: [{}]", available.join(", "))]
    MissingField {
        /// The field that was requested.
        field: String,
        /// Where the field was requested (facet, channel name).
        context: String,
        /// Field names present in the dataset.
        available: Vec<String>,
    },

    /// A geometry needs a positional channel that has no binding at all.
    #[error("geom_{geom} requires the '{channel}' aesthetic")]
    MissingChannel {
        /// The geometry kind.
        geom: GeomKind,
        /// The unbound channel.
        channel: Channel,
    },

    /// Palette name not present in the registry.
    #[error("unknown palette '{name}'; valid palettes: [{}]", available.join(", "))]
    UnknownPalette {
        /// Requested palette name.
        name: String,
        /// Registered palette names, sorted.
        available: Vec<String>,
    },

    /// Theme preset name not recognized.
    #[error("unknown theme '{name}'; valid themes: [{}]", available.join(", "))]
    UnknownTheme {
        /// Requested theme name.
        name: String,
        /// Known preset names.
        available: Vec<String>,
    },

    /// A facet key value contains the composite-key separator.
    #[error("facet value '{value}' of field '{field}' contains the reserved key separator")]
    FacetKeyCollision {
        /// Facet field.
        field: String,
        /// Offending value.
        value: String,
    },

    /// Facet declaration cannot produce a layout.
    #[error("invalid facet: {0}")]
    InvalidFacet(String),

    /// Plot has no geometry layers.
    #[error("no geometry layers specified")]
    NoLayers,

    /// Scale domain error (e.g., log of non-positive value, text on a continuous scale).
    #[error("scale domain error: {0}")]
    ScaleDomain(String),

    /// Color parsing error.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Why the value is invalid.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_palette_lists_alternatives() {
        let err = Error::UnknownPalette {
            name: "doesnotexist".to_string(),
            available: vec!["category10".to_string(), "viridis".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("doesnotexist"));
        assert!(msg.contains("category10, viridis"));
    }

    #[test]
    fn test_missing_field_display() {
        let err = Error::MissingField {
            field: "Species".to_string(),
            context: "facet".to_string(),
            available: vec!["species".to_string()],
        };
        assert!(err.to_string().contains("'Species'"));
        assert!(err.to_string().contains("[species]"));
    }

    #[test]
    fn test_missing_channel_display() {
        let err = Error::MissingChannel { geom: GeomKind::Point, channel: Channel::Y };
        assert_eq!(err.to_string(), "geom_point requires the 'y' aesthetic");
    }

    #[test]
    fn test_config_parse_display() {
        let err = Error::ConfigParse { line: 4, message: "bad".to_string() };
        assert!(err.to_string().contains("line 4"));
    }
}
