//! Recoverable degradations.
//!
//! Anything that does not stop a plot from building is recorded as a
//! [`Warning`] in a [`Warnings`] channel returned with the built scene, and
//! logged through `tracing`. Kinds listed in
//! [`Config::suppress_warnings`](crate::config::Config::suppress_warnings)
//! are neither stored nor logged.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recoverable problem found while building a plot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    /// A non-positional channel named a field the dataset does not contain.
    #[error("field '{field}' for channel '{channel}' not found; using default")]
    MissingField {
        /// Channel name.
        channel: String,
        /// Requested field.
        field: String,
    },

    /// An explicit literal equals an existing field name and stays literal.
    #[error("literal '{value}' on channel '{channel}' matches a field name; treated as literal")]
    AmbiguousAesthetic {
        /// Channel name.
        channel: String,
        /// Literal text.
        value: String,
    },

    /// A name was bound to a field by case-insensitive matching.
    #[error("'{requested}' on channel '{channel}' matched field '{field}' ignoring case")]
    CaseInsensitiveMatch {
        /// Channel name.
        channel: String,
        /// Name as written.
        requested: String,
        /// Field it bound to.
        field: String,
    },

    /// A style or theme option is not supported by the target it was applied to.
    #[error("option '{option}' is not supported by {target}; dropped")]
    IncompatibleStyleOption {
        /// Option name.
        option: String,
        /// Geometry or composite name.
        target: String,
    },

    /// A facet panel has no rows.
    #[error("panel '{panel}' has no data")]
    EmptyPanel {
        /// Panel label.
        panel: String,
    },

    /// Rows were excluded from a layer.
    #[error("layer {layer}: dropped {count} rows ({reason})")]
    DroppedRows {
        /// Layer index.
        layer: usize,
        /// Rows removed.
        count: usize,
        /// Why they were removed.
        reason: String,
    },

    /// A stat parameter was outside its usable range and was clamped.
    #[error("layer {layer}: {parameter} {requested} clamped to {used}")]
    ParameterClamped {
        /// Layer index.
        layer: usize,
        /// Parameter name.
        parameter: String,
        /// Value asked for.
        requested: f64,
        /// Value used.
        used: f64,
    },

    /// A literal cannot be used by its channel.
    #[error("literal '{value}' is not valid for channel '{channel}'; using default")]
    InvalidLiteral {
        /// Channel name.
        channel: String,
        /// Literal text.
        value: String,
    },
}

/// Discriminant of [`Warning`], used for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// [`Warning::MissingField`].
    MissingField,
    /// [`Warning::AmbiguousAesthetic`].
    AmbiguousAesthetic,
    /// [`Warning::CaseInsensitiveMatch`].
    CaseInsensitiveMatch,
    /// [`Warning::IncompatibleStyleOption`].
    IncompatibleStyleOption,
    /// [`Warning::EmptyPanel`].
    EmptyPanel,
    /// [`Warning::DroppedRows`].
    DroppedRows,
    /// [`Warning::ParameterClamped`].
    ParameterClamped,
    /// [`Warning::InvalidLiteral`].
    InvalidLiteral,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingField => "missing_field",
            Self::AmbiguousAesthetic => "ambiguous_aesthetic",
            Self::CaseInsensitiveMatch => "case_insensitive_match",
            Self::IncompatibleStyleOption => "incompatible_style_option",
            Self::EmptyPanel => "empty_panel",
            Self::DroppedRows => "dropped_rows",
            Self::ParameterClamped => "parameter_clamped",
            Self::InvalidLiteral => "invalid_literal",
        };
        f.write_str(name)
    }
}

impl Warning {
    /// The kind of this warning.
    #[must_use]
    pub fn kind(&self) -> WarningKind {
        match self {
            Self::MissingField { .. } => WarningKind::MissingField,
            Self::AmbiguousAesthetic { .. } => WarningKind::AmbiguousAesthetic,
            Self::CaseInsensitiveMatch { .. } => WarningKind::CaseInsensitiveMatch,
            Self::IncompatibleStyleOption { .. } => WarningKind::IncompatibleStyleOption,
            Self::EmptyPanel { .. } => WarningKind::EmptyPanel,
            Self::DroppedRows { .. } => WarningKind::DroppedRows,
            Self::ParameterClamped { .. } => WarningKind::ParameterClamped,
            Self::InvalidLiteral { .. } => WarningKind::InvalidLiteral,
        }
    }
}

/// Ordered collection of recorded warnings with per-kind suppression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings {
    items: Vec<Warning>,
    suppressed: BTreeSet<WarningKind>,
}

impl Warnings {
    /// Empty channel with nothing suppressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty channel suppressing the given kinds.
    #[must_use]
    pub fn with_suppressed(kinds: impl IntoIterator<Item = WarningKind>) -> Self {
        Self { items: Vec::new(), suppressed: kinds.into_iter().collect() }
    }

    /// Record a warning unless its kind is suppressed.
    pub fn push(&mut self, warning: Warning) {
        if self.suppressed.contains(&warning.kind()) {
            return;
        }
        tracing::warn!(kind = %warning.kind(), "{warning}");
        self.items.push(warning);
    }

    /// Record several warnings in order.
    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.push(warning);
        }
    }

    /// Whether a kind is suppressed.
    #[must_use]
    pub fn is_suppressed(&self, kind: WarningKind) -> bool {
        self.suppressed.contains(&kind)
    }

    /// Recorded warnings in order.
    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    /// Recorded warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.items.iter().filter(move |w| w.kind() == kind)
    }

    /// Number of recorded warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume into the recorded list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
