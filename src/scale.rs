//! Continuous scale functions.
//!
//! These are the numeric primitives behind the trained scales in
//! [`crate::grammar::scales`]: a domain interval mapped onto a numeric range
//! or onto a list of color stops. Every mapping clamps to the domain, so
//! out-of-domain values land on the nearest endpoint and never extrapolate.

use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::palette::Palette;

/// Trait for scale functions that map domain values to range values.
pub trait Scale<D, R> {
    /// Transform a domain value to a range value.
    fn scale(&self, value: D) -> R;

    /// Get the domain extent.
    fn domain(&self) -> (D, D);

    /// Get the range extent.
    fn range(&self) -> (R, R);
}

/// Widen a degenerate interval so it can serve as a scale domain.
///
/// A zero-width domain (all values equal) becomes `value ± 0.5`.
#[must_use]
pub fn widen_degenerate(domain: (f64, f64)) -> (f64, f64) {
    if (domain.1 - domain.0).abs() < f64::EPSILON {
        (domain.0 - 0.5, domain.1 + 0.5)
    } else {
        domain
    }
}

/// Linear scale for continuous-to-continuous mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
}

impl LinearScale {
    /// Create a new linear scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is empty or not finite.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        if !domain.0.is_finite() || !domain.1.is_finite() {
            return Err(Error::ScaleDomain(format!("domain {domain:?} is not finite")));
        }
        if (domain.0 - domain.1).abs() < f64::EPSILON {
            return Err(Error::ScaleDomain("domain min and max cannot be equal".to_string()));
        }

        Ok(Self { domain_min: domain.0, domain_max: domain.1, range_min: range.0, range_max: range.1 })
    }

    /// Create a scale from data extent, skipping non-finite values.
    #[must_use]
    pub fn from_data(data: &[f64], range: (f64, f64)) -> Option<Self> {
        let (min, max) = extent(data)?;
        Self::new(widen_degenerate((min, max)), range).ok()
    }

    /// Position of `value` within the domain as a fraction in `[0, 1]`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.domain_min) / (self.domain_max - self.domain_min)).clamp(0.0, 1.0)
    }

    /// Invert the scale (range to domain).
    #[must_use]
    pub fn invert(&self, value: f64) -> f64 {
        let t = (value - self.range_min) / (self.range_max - self.range_min);
        self.domain_min + t * (self.domain_max - self.domain_min)
    }
}

impl Scale<f64, f64> for LinearScale {
    fn scale(&self, value: f64) -> f64 {
        let t = self.normalize(value);
        self.range_min + t * (self.range_max - self.range_min)
    }

    fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }
}

/// Logarithmic scale for continuous-to-continuous mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
    base: f64,
}

impl LogScale {
    /// Create a new logarithmic scale with base 10.
    ///
    /// # Errors
    ///
    /// Returns an error if domain contains non-positive values.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        Self::with_base(domain, range, 10.0)
    }

    /// Create a logarithmic scale with a custom base.
    ///
    /// # Errors
    ///
    /// Returns an error if domain contains non-positive values or base is invalid.
    pub fn with_base(domain: (f64, f64), range: (f64, f64), base: f64) -> Result<Self> {
        if domain.0 <= 0.0 || domain.1 <= 0.0 {
            return Err(Error::ScaleDomain("log scale domain must be positive".to_string()));
        }

        if base <= 0.0 || base == 1.0 {
            return Err(Error::ScaleDomain("log scale base must be positive and not 1".to_string()));
        }

        Ok(Self { domain_min: domain.0, domain_max: domain.1, range_min: range.0, range_max: range.1, base })
    }
}

impl Scale<f64, f64> for LogScale {
    fn scale(&self, value: f64) -> f64 {
        let log_min = self.domain_min.log(self.base);
        let log_max = self.domain_max.log(self.base);
        if (log_max - log_min).abs() < f64::EPSILON {
            return (self.range_min + self.range_max) / 2.0;
        }
        let log_val = value.max(f64::MIN_POSITIVE).log(self.base);

        let t = ((log_val - log_min) / (log_max - log_min)).clamp(0.0, 1.0);
        self.range_min + t * (self.range_max - self.range_min)
    }

    fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }
}

/// Color scale interpolating through ordered color stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    colors: Vec<Rgba>,
    domain_min: f64,
    domain_max: f64,
}

impl ColorScale {
    /// Create a new color scale.
    ///
    /// # Errors
    ///
    /// Returns an error if colors is empty or domain is invalid.
    pub fn new(colors: Vec<Rgba>, domain: (f64, f64)) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::ScaleDomain("color scale requires at least one color".to_string()));
        }

        if (domain.0 - domain.1).abs() < f64::EPSILON {
            return Err(Error::ScaleDomain("domain min and max cannot be equal".to_string()));
        }

        Ok(Self { colors, domain_min: domain.0, domain_max: domain.1 })
    }

    /// Color scale using a palette's colors as stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is invalid.
    pub fn from_palette(palette: &Palette, domain: (f64, f64)) -> Result<Self> {
        Self::new(palette.colors().to_vec(), domain)
    }

    /// Color stops.
    #[must_use]
    pub fn stops(&self) -> &[Rgba] {
        &self.colors
    }
}

impl Scale<f64, Rgba> for ColorScale {
    fn scale(&self, value: f64) -> Rgba {
        let t = ((value - self.domain_min) / (self.domain_max - self.domain_min)).clamp(0.0, 1.0);

        if self.colors.len() == 1 {
            return self.colors[0];
        }

        let segment_count = self.colors.len() - 1;
        let segment = (t * segment_count as f64).floor() as usize;
        let segment = segment.min(segment_count - 1);

        let local_t = t * segment_count as f64 - segment as f64;

        self.colors[segment].lerp(self.colors[segment + 1], local_t)
    }

    fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    fn range(&self) -> (Rgba, Rgba) {
        (*self.colors.first().unwrap_or(&Rgba::BLACK), *self.colors.last().unwrap_or(&Rgba::WHITE))
    }
}

/// Round-number tick positions inside `domain`, about `count` of them.
#[must_use]
pub fn breaks(domain: (f64, f64), count: usize) -> Vec<f64> {
    let (lo, hi) = if domain.0 <= domain.1 { domain } else { (domain.1, domain.0) };
    if count == 0 || !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if (hi - lo).abs() < f64::EPSILON {
        return vec![lo];
    }
    let step = nice_step((hi - lo) / count as f64);
    if step == 0.0 {
        return vec![lo, hi];
    }
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    let base = 10_f64.powf(raw.log10().floor());
    let nice = match raw / base {
        e if e >= 7.5 => 10.0,
        e if e >= 3.5 => 5.0,
        e if e >= 1.5 => 2.0,
        _ => 1.0,
    };
    nice * base
}

/// Finite min/max of a slice.
#[must_use]
pub fn extent(data: &[f64]) -> Option<(f64, f64)> {
    data.iter().copied().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteRegistry;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_scale() {
        let scale = LinearScale::new((0.0, 100.0), (0.0, 1.0)).expect("operation should succeed");
        assert_relative_eq!(scale.scale(0.0), 0.0);
        assert_relative_eq!(scale.scale(50.0), 0.5);
        assert_relative_eq!(scale.scale(100.0), 1.0);
    }

    #[test]
    fn test_linear_scale_clamps() {
        let scale = LinearScale::new((0.0, 10.0), (1.0, 6.0)).expect("operation should succeed");
        assert_relative_eq!(scale.scale(-5.0), 1.0);
        assert_relative_eq!(scale.scale(50.0), 6.0);
    }

    #[test]
    fn test_linear_scale_invert() {
        let scale = LinearScale::new((0.0, 100.0), (0.0, 1.0)).expect("operation should succeed");
        assert_relative_eq!(scale.invert(0.5), 50.0);
    }

    #[test]
    fn test_linear_scale_from_data_equal_values_widens() {
        let scale = LinearScale::from_data(&[5.0, 5.0, 5.0], (0.0, 1.0)).expect("operation should succeed");
        assert_eq!(scale.domain(), (4.5, 5.5));
        assert_relative_eq!(scale.scale(5.0), 0.5);
    }

    #[test]
    fn test_linear_scale_from_data_empty() {
        assert!(LinearScale::from_data(&[], (0.0, 1.0)).is_none());
        assert!(LinearScale::from_data(&[f64::NAN], (0.0, 1.0)).is_none());
    }

    #[test]
    fn test_linear_scale_rejects_bad_domain() {
        assert!(LinearScale::new((5.0, 5.0), (0.0, 1.0)).is_err());
        assert!(LinearScale::new((0.0, f64::INFINITY), (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_log_scale() {
        let scale = LogScale::new((1.0, 1000.0), (0.0, 3.0)).expect("operation should succeed");
        assert_relative_eq!(scale.scale(1.0), 0.0);
        assert_relative_eq!(scale.scale(10.0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(scale.scale(100.0), 2.0, epsilon = 1e-9);
        assert_relative_eq!(scale.scale(1000.0), 3.0, epsilon = 1e-9);
        assert_relative_eq!(scale.scale(0.0001), 0.0);
    }

    #[test]
    fn test_log_scale_invalid() {
        assert!(LogScale::new((-1.0, 100.0), (0.0, 1.0)).is_err());
        assert!(LogScale::new((0.0, 100.0), (0.0, 1.0)).is_err());
        assert!(LogScale::with_base((1.0, 100.0), (0.0, 1.0), 1.0).is_err());
        assert!(LogScale::with_base((1.0, 100.0), (0.0, 1.0), -2.0).is_err());
    }

    #[test]
    fn test_color_scale_clamping() {
        let scale = ColorScale::new(vec![Rgba::BLACK, Rgba::WHITE], (0.0, 1.0))
            .expect("color scale creation should succeed");
        assert_eq!(scale.scale(-1.0), Rgba::BLACK);
        assert_eq!(scale.scale(2.0), Rgba::WHITE);
        assert_eq!(scale.scale(0.5).r, 128);
    }

    #[test]
    fn test_color_scale_multi_segment_hits_stops() {
        let scale = ColorScale::new(vec![Rgba::RED, Rgba::GREEN, Rgba::BLUE], (0.0, 2.0))
            .expect("operation should succeed");
        assert_eq!(scale.scale(0.0), Rgba::RED);
        assert_eq!(scale.scale(1.0), Rgba::GREEN);
        assert_eq!(scale.scale(2.0), Rgba::BLUE);
    }

    #[test]
    fn test_color_scale_from_palette() {
        let registry = PaletteRegistry::builtin();
        let viridis = registry.get("viridis").expect("builtin palette");
        let scale = ColorScale::from_palette(viridis, (0.0, 10.0)).expect("operation should succeed");
        assert_eq!(scale.range(), (Rgba::from_u32(0x440154), Rgba::from_u32(0xfde725)));
    }

    #[test]
    fn test_color_scale_invalid() {
        assert!(ColorScale::new(vec![], (0.0, 1.0)).is_err());
        assert!(ColorScale::new(vec![Rgba::RED], (5.0, 5.0)).is_err());
    }

    #[test]
    fn test_extent_skips_non_finite() {
        assert_eq!(extent(&[3.0, f64::NAN, -1.0, 7.0]), Some((-1.0, 7.0)));
    }

    #[test]
    fn test_breaks_round_numbers() {
        assert_eq!(breaks((0.0, 10.0), 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let fractional = breaks((0.3, 0.9), 3);
        assert_eq!(fractional.len(), 3);
        assert_relative_eq!(fractional[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(fractional[2], 0.8, epsilon = 1e-12);
        assert_eq!(breaks((2.0, 2.0), 5), vec![2.0]);
        assert!(breaks((0.0, 1.0), 0).is_empty());
    }
}
