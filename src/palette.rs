//! Named palette registry.
//!
//! Resolves a palette name to an ordered list of colors. Qualitative palettes
//! are consumed by discrete scales (`palette[i mod len]`); sequential and
//! diverging palettes provide the interpolation stops of continuous scales.
//!
//! Lookups of unknown names fail with [`Error::UnknownPalette`], which lists
//! every registered name. There is no fallback palette.

use std::collections::BTreeMap;

use crate::color::{Hsla, Rgba};
use crate::error::{Error, Result};

/// Default palette for discrete color/fill scales.
pub const DEFAULT_DISCRETE: &str = "category10";

/// Default palette for continuous color/fill scales.
pub const DEFAULT_CONTINUOUS: &str = "viridis";

/// Broad palette family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKind {
    /// Unordered categories.
    Qualitative,
    /// Low-to-high ramp.
    Sequential,
    /// Two ramps meeting at a neutral midpoint.
    Diverging,
}

/// A named, ordered color list.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: String,
    kind: PaletteKind,
    colors: Vec<Rgba>,
}

impl Palette {
    /// Create a palette.
    ///
    /// # Errors
    ///
    /// Returns an error if `colors` is empty.
    pub fn new(name: impl Into<String>, kind: PaletteKind, colors: Vec<Rgba>) -> Result<Self> {
        let name = name.into();
        if colors.is_empty() {
            return Err(Error::ScaleDomain(format!("palette '{name}' has no colors")));
        }
        Ok(Self { name, kind, colors })
    }

    /// Palette name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Palette family.
    #[must_use]
    pub fn kind(&self) -> PaletteKind {
        self.kind
    }

    /// Ordered colors.
    #[must_use]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Number of colors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; palettes cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for the `i`-th discrete level, cycling with period `len()`.
    #[must_use]
    pub fn cycle(&self, i: usize) -> Rgba {
        self.colors[i % self.colors.len()]
    }
}

/// Registry of named palettes.
///
/// Read-only once a plot is built; panels share it without synchronization.
#[derive(Debug, Clone)]
pub struct PaletteRegistry {
    palettes: BTreeMap<String, Palette>,
}

impl Default for PaletteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PaletteRegistry {
    /// Registry with no palettes.
    #[must_use]
    pub fn empty() -> Self {
        Self { palettes: BTreeMap::new() }
    }

    /// Registry containing the built-in palettes.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let builtin: [(&str, PaletteKind, Vec<Rgba>); 13] = [
            ("category10", PaletteKind::Qualitative, hex_list(&CATEGORY10)),
            ("set2", PaletteKind::Qualitative, hex_list(&SET2)),
            ("dark2", PaletteKind::Qualitative, hex_list(&DARK2)),
            ("ggplot2", PaletteKind::Qualitative, hex_list(&GGPLOT2)),
            ("hue", PaletteKind::Qualitative, hue_list(8)),
            ("viridis", PaletteKind::Sequential, hex_list(&VIRIDIS)),
            ("magma", PaletteKind::Sequential, hex_list(&MAGMA)),
            ("blues", PaletteKind::Sequential, hex_list(&BLUES)),
            ("greens", PaletteKind::Sequential, hex_list(&GREENS)),
            ("greys", PaletteKind::Sequential, vec![Rgba::rgb(247, 247, 247), Rgba::rgb(37, 37, 37)]),
            ("heat", PaletteKind::Sequential, hex_list(&HEAT)),
            ("red_blue", PaletteKind::Diverging, hex_list(&RED_BLUE)),
            ("brown_teal", PaletteKind::Diverging, hex_list(&BROWN_TEAL)),
        ];
        for (name, kind, colors) in builtin {
            registry.palettes.insert(name.to_string(), Palette { name: name.to_string(), kind, colors });
        }
        registry
    }

    /// Register (or replace) a palette.
    pub fn register(&mut self, palette: Palette) {
        self.palettes.insert(palette.name.clone(), palette);
    }

    /// Look up a palette by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPalette`] listing valid names.
    pub fn get(&self, name: &str) -> Result<&Palette> {
        self.palettes.get(name).ok_or_else(|| Error::UnknownPalette {
            name: name.to_string(),
            available: self.names(),
        })
    }

    /// Whether a palette is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.palettes.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.palettes.keys().cloned().collect()
    }
}

fn hex_list(values: &[u32]) -> Vec<Rgba> {
    values.iter().map(|&v| Rgba::from_u32(v)).collect()
}

/// Evenly spaced hues starting at 15 degrees.
fn hue_list(n: usize) -> Vec<Rgba> {
    (0..n).map(|i| Hsla::hsl(15.0 + 360.0 * i as f64 / n as f64, 0.65, 0.6).to_rgba()).collect()
}

const CATEGORY10: [u32; 10] = [
    0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f, 0xbcbd22,
    0x17becf,
];
const SET2: [u32; 8] = [0x66c2a5, 0xfc8d62, 0x8da0cb, 0xe78ac3, 0xa6d854, 0xffd92f, 0xe5c494, 0xb3b3b3];
const DARK2: [u32; 8] = [0x1b9e77, 0xd95f02, 0x7570b3, 0xe7298a, 0x66a61e, 0xe6ab02, 0xa6761d, 0x666666];
const GGPLOT2: [u32; 8] = [0xf8766d, 0xcd9600, 0x7cae00, 0x00be67, 0x00bfc4, 0x00a9ff, 0xc77cff, 0xff61cc];
const VIRIDIS: [u32; 5] = [0x440154, 0x3b528b, 0x21918c, 0x5ec962, 0xfde725];
const MAGMA: [u32; 5] = [0x000004, 0x51127c, 0xb73779, 0xfc8961, 0xfcfdbf];
const BLUES: [u32; 5] = [0xf7fbff, 0xc6dbef, 0x6baed6, 0x2171b5, 0x08306b];
const GREENS: [u32; 5] = [0xf7fcf5, 0xc7e9c0, 0x74c476, 0x238b45, 0x00441b];
const HEAT: [u32; 6] = [0x000000, 0x800000, 0xff0000, 0xff8000, 0xffff00, 0xffffff];
const RED_BLUE: [u32; 5] = [0xb2182b, 0xef8a62, 0xf7f7f7, 0x67a9cf, 0x2166ac];
const BROWN_TEAL: [u32; 5] = [0x8c510a, 0xd8b365, 0xf5f5f5, 0x5ab4ac, 0x01665e];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_required_families() {
        let registry = PaletteRegistry::builtin();
        assert_eq!(registry.get(DEFAULT_DISCRETE).unwrap().kind(), PaletteKind::Qualitative);
        assert_eq!(registry.get(DEFAULT_CONTINUOUS).unwrap().kind(), PaletteKind::Sequential);
        assert_eq!(registry.get("red_blue").unwrap().kind(), PaletteKind::Diverging);
        assert_eq!(registry.get("category10").unwrap().len(), 10);
    }

    #[test]
    fn test_unknown_palette_is_fatal_and_lists_names() {
        let registry = PaletteRegistry::builtin();
        match registry.get("doesnotexist") {
            Err(Error::UnknownPalette { name, available }) => {
                assert_eq!(name, "doesnotexist");
                assert!(available.contains(&"viridis".to_string()));
                assert!(available.windows(2).all(|w| w[0] <= w[1]));
            }
            other => panic!("expected UnknownPalette, got {other:?}"),
        }
    }

    #[test]
    fn test_palette_cycles() {
        let palette = Palette::new("two", PaletteKind::Qualitative, vec![Rgba::RED, Rgba::BLUE]).unwrap();
        assert_eq!(palette.cycle(0), Rgba::RED);
        assert_eq!(palette.cycle(1), Rgba::BLUE);
        assert_eq!(palette.cycle(2), Rgba::RED);
    }

    #[test]
    fn test_empty_palette_rejected() {
        assert!(Palette::new("none", PaletteKind::Qualitative, vec![]).is_err());
    }

    #[test]
    fn test_register_custom() {
        let mut registry = PaletteRegistry::empty();
        assert!(!registry.contains("brand"));
        registry.register(Palette::new("brand", PaletteKind::Qualitative, vec![Rgba::BLACK]).unwrap());
        assert!(registry.contains("brand"));
        assert_eq!(registry.names(), vec!["brand".to_string()]);
    }

    #[test]
    fn test_hue_palette_distinct() {
        let hue = PaletteRegistry::builtin().get("hue").unwrap().colors().to_vec();
        for (i, a) in hue.iter().enumerate() {
            for b in &hue[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
