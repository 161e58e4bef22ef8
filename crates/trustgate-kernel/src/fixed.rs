//! Fixed-point representation of probabilities.
//!
//! A [`Scale`] `K` maps the real interval `[0, 1]` onto the integers
//! `[0, K]`. The decision inequality is evaluated entirely on these integers
//! so that rounding is explicit and identical on every platform.
//!
//! Quantization always rounds toward the restrictive side of the decision:
//! trust rounds down, while requirements, risk, and α round up. There is no
//! snapping to nearby grid points. A trust a hair below `0.63` quantizes to
//! `6299` at `K = 10_000`, never `6300`.

use crate::error::{Result, TrustError};

/// Largest supported scale. Keeps `b · α · r` comfortably inside `u128`.
pub const MAX_SCALE: u64 = 1_000_000;

/// Fixed-point resolution `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scale(u64);

impl Scale {
    /// Basis points: four decimal digits of trust resolution.
    pub const DEFAULT: Scale = Scale(10_000);

    /// Validates a scale.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] unless `1 <= k <= MAX_SCALE`.
    pub fn new(k: u64) -> Result<Self> {
        if (1..=MAX_SCALE).contains(&k) {
            Ok(Self(k))
        } else {
            Err(TrustError::config(format!(
                "fixed-point scale must be in 1..={MAX_SCALE}, got {k}"
            )))
        }
    }

    /// Returns `K`.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Quantizes a non-negative real, rounding down.
    ///
    /// Callers pass validated, finite, non-negative values.
    pub fn floor(self, value: f64) -> u64 {
        self.quantize(value, f64::floor)
    }

    /// Quantizes a non-negative real, rounding up.
    pub fn ceil(self, value: f64) -> u64 {
        self.quantize(value, f64::ceil)
    }

    /// Maps a raw fixed-point value back to the real line.
    pub fn to_real(self, raw: u64) -> f64 {
        raw as f64 / self.0 as f64
    }

    fn quantize(self, value: f64, round: fn(f64) -> f64) -> u64 {
        debug_assert!(
            value.is_finite() && value >= 0.0,
            "quantize expects a finite non-negative value, got {value}"
        );
        round(value.max(0.0) * self.0 as f64) as u64
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_scale_bounds() {
        assert!(Scale::new(0).is_err());
        assert!(Scale::new(MAX_SCALE + 1).is_err());
        assert_eq!(Scale::new(10).map(Scale::get), Ok(10));
    }

    #[test_case(0.3, 3, 3 ; "grid point")]
    #[test_case(0.35, 3, 4 ; "between grid points")]
    #[test_case(1.0, 10, 10 ; "upper bound")]
    #[test_case(0.0, 0, 0 ; "lower bound")]
    #[test_case(0.7, 7, 7 ; "product lands on grid")]
    fn test_quantize_k10(value: f64, floor: u64, ceil: u64) {
        let k = Scale::new(10).unwrap();
        assert_eq!(k.floor(value), floor);
        assert_eq!(k.ceil(value), ceil);
    }

    #[test]
    fn test_quantize_alpha_above_one() {
        let k = Scale::new(100).unwrap();
        assert_eq!(k.ceil(2.5), 250);
        assert_eq!(k.ceil(0.005), 1, "α rounds toward stricter");
    }

    #[test]
    fn test_trust_just_below_grid_point_rounds_down() {
        let k = Scale::DEFAULT;
        assert_eq!(k.floor(0.63 - 1e-12), 6_299);
        assert_eq!(k.ceil(0.1 + 1e-12), 1_001);
    }

    #[test]
    fn test_to_real() {
        let k = Scale::DEFAULT;
        assert!((k.to_real(6_300) - 0.63).abs() < 1e-12);
    }
}
