use rayon::prelude::*;
use thiserror::Error;

use crate::grid::is_valid;

/// sRGB 8-bit triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Fill for countries that have no data in the active change map.
pub const NO_DATA_FILL: Rgb = Rgb(238, 238, 238);

/// Inferno-equivalent sequential palette, evenly spaced stops over [0, 1].
/// Dark purple at the low end, bright yellow at the high end.
const INFERNO: [Rgb; 11] = [
    Rgb(0, 0, 4),
    Rgb(22, 11, 57),
    Rgb(66, 10, 104),
    Rgb(106, 23, 110),
    Rgb(147, 38, 103),
    Rgb(188, 55, 84),
    Rgb(221, 81, 58),
    Rgb(243, 120, 25),
    Rgb(252, 165, 10),
    Rgb(246, 215, 70),
    Rgb(252, 255, 164),
];

/// RdYlGn-equivalent diverging palette (ColorBrewer 11-class stops).
/// Red at t=0, neutral pale yellow at t=0.5, green at t=1.
const RD_YL_GN: [Rgb; 11] = [
    Rgb(165, 0, 38),
    Rgb(215, 48, 39),
    Rgb(244, 109, 67),
    Rgb(253, 174, 97),
    Rgb(254, 224, 139),
    Rgb(255, 255, 191),
    Rgb(217, 239, 139),
    Rgb(166, 217, 106),
    Rgb(102, 189, 99),
    Rgb(26, 152, 80),
    Rgb(0, 104, 55),
];

#[derive(Debug, Error, PartialEq)]
#[error("no valid samples to compute a color domain from")]
pub struct EmptyDomainError;

/// Value domain of the valid subset of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: f32,
    pub max: f32,
}

impl Domain {
    /// Min/max over values that are neither sentinel nor NaN.
    pub fn from_values(values: &[f32]) -> Result<Self, EmptyDomainError> {
        let (min, max) = values
            .par_iter()
            .copied()
            .filter(|v| is_valid(*v))
            .fold(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(alo, ahi), (blo, bhi)| (alo.min(blo), ahi.max(bhi)),
            );
        if min.is_infinite() {
            return Err(EmptyDomainError);
        }
        Ok(Self { min, max })
    }
}

/// Sample an evenly spaced palette at t in [0, 1] with linear interpolation.
fn sample_palette(palette: &[Rgb], t: f32) -> Rgb {
    // NaN passes through clamp and the casts below collapse it to black;
    // treat any non-finite position as the low end of the palette.
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (palette.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(palette.len() - 2);
    let frac = scaled - i as f32;
    let a = palette[i];
    let b = palette[i + 1];
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
    Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Sequential scale over a [min, max] domain: values normalize linearly
/// into [0, 1], clamp, and sample the inferno palette. Pure function of
/// (value, domain); no hidden state.
#[derive(Clone, Copy)]
pub struct SequentialScale {
    domain: Domain,
}

impl SequentialScale {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Normalized palette position of a value, clamped to [0, 1].
    pub fn position(&self, value: f32) -> f32 {
        let range = self.domain.max - self.domain.min;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.domain.min) / range).clamp(0.0, 1.0)
    }

    pub fn color_of(&self, value: f32) -> Rgb {
        sample_palette(&INFERNO, self.position(value))
    }

    /// Sample the palette directly at t in [0, 1] (legend gradient).
    pub fn sample(&self, t: f32) -> Rgb {
        sample_palette(&INFERNO, t)
    }
}

/// Three-point diverging scale anchored at {max, 0, min}: the positive
/// extreme maps to the red end, zero always to the neutral midpoint, and
/// the negative extreme to the green end, regardless of whether the domain
/// is symmetric around zero.
#[derive(Clone, Copy)]
pub struct DivergingScale {
    pos_extreme: f32,
    neg_extreme: f32,
}

impl DivergingScale {
    pub fn new(domain: Domain) -> Self {
        Self {
            pos_extreme: domain.max,
            neg_extreme: domain.min,
        }
    }

    pub fn position(&self, value: f32) -> f32 {
        if value >= 0.0 {
            if self.pos_extreme <= 0.0 {
                0.5
            } else {
                0.5 - 0.5 * (value / self.pos_extreme).clamp(0.0, 1.0)
            }
        } else if self.neg_extreme >= 0.0 {
            0.5
        } else {
            0.5 + 0.5 * (value / self.neg_extreme).clamp(0.0, 1.0)
        }
    }

    pub fn color_of(&self, value: f32) -> Rgb {
        sample_palette(&RD_YL_GN, self.position(value))
    }

    pub fn sample(&self, t: f32) -> Rgb {
        sample_palette(&RD_YL_GN, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SENTINEL;

    #[test]
    fn test_domain_ignores_sentinel_and_nan() {
        let values = [1.0, SENTINEL, 3.0, f32::NAN];
        let domain = Domain::from_values(&values).unwrap();
        assert_eq!(domain, Domain { min: 1.0, max: 3.0 });
    }

    #[test]
    fn test_domain_empty_when_all_invalid() {
        let values = [SENTINEL, f32::NAN, SENTINEL];
        assert_eq!(Domain::from_values(&values), Err(EmptyDomainError));
    }

    #[test]
    fn test_sequential_position_monotonic() {
        let scale = SequentialScale::new(Domain { min: 0.0, max: 10.0 });
        let mut prev = -1.0;
        for v in [0.0, 1.0, 2.5, 5.0, 7.5, 10.0] {
            let t = scale.position(v);
            assert!(t > prev, "position must increase along the palette axis");
            prev = t;
        }
    }

    #[test]
    fn test_sequential_clamps_outside_domain() {
        let scale = SequentialScale::new(Domain { min: 1.0, max: 3.0 });
        assert_eq!(scale.color_of(-99.0), scale.color_of(1.0));
        assert_eq!(scale.color_of(100.0), scale.color_of(3.0));
    }

    #[test]
    fn test_sequential_deterministic() {
        let scale = SequentialScale::new(Domain { min: 0.0, max: 1.0 });
        assert_eq!(scale.color_of(0.3), scale.color_of(0.3));
    }

    #[test]
    fn test_diverging_zero_is_neutral_for_asymmetric_domain() {
        let neutral = RD_YL_GN[5];
        let sym = DivergingScale::new(Domain { min: -10.0, max: 10.0 });
        let asym = DivergingScale::new(Domain { min: -3.0, max: 40.0 });
        assert_eq!(sym.color_of(0.0), neutral);
        assert_eq!(asym.color_of(0.0), neutral);
    }

    #[test]
    fn test_diverging_extremes() {
        let scale = DivergingScale::new(Domain { min: -3.0, max: 40.0 });
        assert_eq!(scale.color_of(40.0), RD_YL_GN[0]);
        assert_eq!(scale.color_of(-3.0), RD_YL_GN[10]);
    }

    #[test]
    fn test_palette_sampling_endpoints() {
        assert_eq!(sample_palette(&INFERNO, 0.0), INFERNO[0]);
        assert_eq!(sample_palette(&INFERNO, 1.0), INFERNO[10]);
        assert_eq!(sample_palette(&INFERNO, -5.0), INFERNO[0]);
    }

    #[test]
    fn test_palette_sampling_non_finite_maps_to_low_end() {
        assert_eq!(sample_palette(&INFERNO, f32::NAN), INFERNO[0]);
        assert_eq!(sample_palette(&INFERNO, f32::INFINITY), INFERNO[0]);
        let scale = SequentialScale::new(Domain { min: 1.0, max: 3.0 });
        assert_eq!(scale.sample(f32::NAN), scale.color_of(1.0));
    }
}
