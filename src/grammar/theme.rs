//! Theme system for Grammar of Graphics.
//!
//! Controls the non-data visual appearance of plots. A theme is a bag of
//! named options; presets are starting bags and overrides are applied key by
//! key. Options are filtered against what the target composite accepts when
//! the plot is built, so a theme written for one geometry never breaks
//! another.

use std::collections::BTreeMap;

use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::grammar::geom::{GeomKind, StyleParams, StyleValue};
use crate::warning::Warning;

/// Preset names.
pub const PRESETS: [&str; 6] = ["grey", "minimal", "classic", "bw", "dark", "void"];

/// Options accepted by every panel composite.
pub const PANEL_OPTIONS: &[&str] = &[
    "panel.background",
    "panel.border",
    "grid.show",
    "grid.color",
    "grid.width",
    "axis.show",
    "axis.color",
    "axis.width",
    "axis.text.color",
    "strip.background",
    "strip.text.color",
];

/// Options accepted by the grid composite.
pub const GRID_OPTIONS: &[&str] =
    &["background", "margin", "text.color", "title.size", "legend.position", "font.family", "width", "height"];

/// Theme specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    name: Option<String>,
    options: StyleParams,
}

impl Theme {
    /// Empty theme with no preset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Theme from a preset name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTheme`] listing valid presets.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "grey" | "gray" => Ok(Self::grey()),
            "minimal" => Ok(Self::minimal()),
            "classic" => Ok(Self::classic()),
            "bw" => Ok(Self::bw()),
            "dark" => Ok(Self::dark()),
            "void" => Ok(Self::void()),
            _ => Err(Error::UnknownTheme {
                name: name.to_string(),
                available: PRESETS.iter().map(|p| (*p).to_string()).collect(),
            }),
        }
    }

    fn named(name: &str) -> Self {
        Self { name: Some(name.to_string()), options: StyleParams::new() }
    }

    fn base(name: &str, panel: Rgba, grid: Option<(Rgba, f64)>, axis: Rgba, text: Rgba, border: bool) -> Self {
        let theme = Self::named(name)
            .background(Rgba::WHITE)
            .panel_background(panel)
            .set("axis.color", axis)
            .set("axis.text.color", text)
            .set("text.color", text)
            .set("axis.width", 1.0)
            .set("panel.border", border)
            .margin(40);
        match grid {
            Some((color, width)) => theme.grid_color(color).set("grid.width", width).grid(true),
            None => theme.grid(false),
        }
    }

    /// Grey theme (ggplot2 default-like).
    #[must_use]
    pub fn grey() -> Self {
        let dark = Rgba::rgb(50, 50, 50);
        Self::base("grey", Rgba::rgb(235, 235, 235), Some((Rgba::WHITE, 1.0)), dark, dark, false)
    }

    /// Minimal theme with white background.
    #[must_use]
    pub fn minimal() -> Self {
        Self::base("minimal", Rgba::WHITE, Some((Rgba::rgb(220, 220, 220), 0.5)), Rgba::rgb(100, 100, 100), Rgba::BLACK, false)
            .set("axis.width", 0.5)
    }

    /// Black and white theme.
    #[must_use]
    pub fn bw() -> Self {
        Self::base("bw", Rgba::WHITE, Some((Rgba::rgb(200, 200, 200), 0.5)), Rgba::BLACK, Rgba::BLACK, true)
    }

    /// Classic theme with axis lines and no grid.
    #[must_use]
    pub fn classic() -> Self {
        Self::base("classic", Rgba::WHITE, None, Rgba::BLACK, Rgba::BLACK, false)
    }

    /// Dark theme.
    #[must_use]
    pub fn dark() -> Self {
        Self::base(
            "dark",
            Rgba::rgb(40, 40, 40),
            Some((Rgba::rgb(60, 60, 60), 0.5)),
            Rgba::rgb(180, 180, 180),
            Rgba::rgb(220, 220, 220),
            false,
        )
        .background(Rgba::rgb(30, 30, 30))
        .set("axis.width", 0.5)
    }

    /// Void theme: data only.
    #[must_use]
    pub fn void() -> Self {
        Self::named("void").grid(false).axis(false).set("panel.border", false).margin(10)
    }

    /// Preset name, if built from one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// All options.
    #[must_use]
    pub fn options(&self) -> &StyleParams {
        &self.options
    }

    /// One option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.options.get(key)
    }

    /// Set an option (last write wins).
    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// Set background color.
    #[must_use]
    pub fn background(self, color: Rgba) -> Self {
        self.set("background", color)
    }

    /// Set panel background color.
    #[must_use]
    pub fn panel_background(self, color: Rgba) -> Self {
        self.set("panel.background", color)
    }

    /// Set grid color.
    #[must_use]
    pub fn grid_color(self, color: Rgba) -> Self {
        self.set("grid.color", color)
    }

    /// Set margin.
    #[must_use]
    pub fn margin(self, margin: u32) -> Self {
        self.set("margin", f64::from(margin))
    }

    /// Show or hide grid.
    #[must_use]
    pub fn grid(self, show: bool) -> Self {
        self.set("grid.show", show)
    }

    /// Show or hide axis.
    #[must_use]
    pub fn axis(self, show: bool) -> Self {
        self.set("axis.show", show)
    }
}

/// Composite a set of theme options is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeTarget {
    /// A panel holding marks of one geometry.
    Panel(GeomKind),
    /// The assembled grid.
    Grid,
}

impl ThemeTarget {
    /// Whether the target accepts an option.
    #[must_use]
    pub fn supports(self, option: &str) -> bool {
        match self {
            ThemeTarget::Panel(kind) => {
                PANEL_OPTIONS.contains(&option) || kind.info().theme_options.contains(&option)
            }
            ThemeTarget::Grid => GRID_OPTIONS.contains(&option),
        }
    }

    /// Name used in warnings.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            ThemeTarget::Panel(kind) => format!("geom_{kind}"),
            ThemeTarget::Grid => "grid".to_string(),
        }
    }
}

/// Theme options split by target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTheme {
    /// Options for the assembled grid.
    pub grid: StyleParams,
    /// Options for every panel composite.
    pub panel: StyleParams,
    /// Geometry-specific options, per kind present in the plot.
    pub geoms: BTreeMap<GeomKind, StyleParams>,
}

/// Merges presets with overrides and filters options per target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeMerger;

impl ThemeMerger {
    /// Apply `overrides` on top of `base`, key by key.
    #[must_use]
    pub fn merge(base: &Theme, overrides: &Theme) -> Theme {
        let mut merged = base.clone();
        for (key, value) in &overrides.options {
            merged.options.insert(key.clone(), value.clone());
        }
        if overrides.name.is_some() {
            merged.name.clone_from(&overrides.name);
        }
        merged
    }

    /// Options of `options` that `target` accepts.
    fn filter(options: &StyleParams, target: ThemeTarget) -> StyleParams {
        options.iter().filter(|(key, _)| target.supports(key)).map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Split a theme across the grid, the panels and the geometries present.
    ///
    /// An option is dropped with a warning only when neither the grid, the
    /// panel composite nor any present geometry accepts it.
    #[must_use]
    pub fn resolve(theme: &Theme, geoms: &[GeomKind]) -> (ResolvedTheme, Vec<Warning>) {
        let mut resolved = ResolvedTheme {
            grid: Self::filter(&theme.options, ThemeTarget::Grid),
            panel: theme
                .options
                .iter()
                .filter(|(key, _)| PANEL_OPTIONS.contains(&key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            geoms: BTreeMap::new(),
        };
        for kind in geoms {
            let own: StyleParams = Self::filter(&theme.options, ThemeTarget::Panel(*kind))
                .into_iter()
                .filter(|(key, _)| !PANEL_OPTIONS.contains(&key.as_str()))
                .collect();
            if !own.is_empty() {
                resolved.geoms.insert(*kind, own);
            }
        }

        let warnings = theme
            .options
            .keys()
            .filter(|key| {
                !resolved.grid.contains_key(*key)
                    && !resolved.panel.contains_key(*key)
                    && !resolved.geoms.values().any(|own| own.contains_key(*key))
            })
            .map(|key| Warning::IncompatibleStyleOption { option: key.clone(), target: "plot".to_string() })
            .collect();
        (resolved, warnings)
    }
}
