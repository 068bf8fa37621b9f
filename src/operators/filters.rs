//! One-dimensional wavelet steps on periodic lines
//!
//! A line of even length `s` is split into `s/2` approximation coefficients
//! followed by `s/2` detail coefficients. Orthogonal families use a
//! periodised two-channel filter bank; B-spline families use CDF lifting.

use super::WaveletFamily;
use crate::array::Scalar;
use crate::config::WaveletConfig;
use crate::error::{Error, Result};

// CDF 9/7 lifting coefficients
const CDF97_A: f64 = -1.586134342;
const CDF97_B: f64 = -0.05298011854;
const CDF97_C: f64 = 0.8829110762;
const CDF97_D: f64 = 0.4435068522;
const CDF97_K: f64 = 1.149604398;

const D6: [f64; 6] = [
    0.33267055295008262,
    0.80689150931109258,
    0.45987750211849157,
    -0.13501102001025459,
    -0.08544127388202666,
    0.03522629188570954,
];

const D8: [f64; 8] = [
    0.23037781330889650,
    0.71484657055291565,
    0.63088076792985891,
    -0.02798376941685985,
    -0.18703481171909309,
    0.03084138183556076,
    0.03288301166688520,
    -0.01059740178506903,
];

/// Daubechies low-pass analysis filter with `len` taps
pub fn daubechies(len: usize) -> Option<Vec<f64>> {
    match len {
        2 => Some(vec![std::f64::consts::FRAC_1_SQRT_2; 2]),
        4 => {
            let s3 = 3f64.sqrt();
            let d = 4.0 * std::f64::consts::SQRT_2;
            Some(vec![(1.0 + s3) / d, (3.0 + s3) / d, (3.0 - s3) / d, (1.0 - s3) / d])
        }
        6 => Some(D6.to_vec()),
        8 => Some(D8.to_vec()),
        _ => None,
    }
}

/// Lifting scheme of a biorthogonal spline family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifting {
    /// CDF 5/3 (member 202)
    Cdf53,
    /// CDF 9/7 (member 404)
    Cdf97,
}

/// Periodic single-level transform of one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineFilter {
    Identity,
    Orthogonal {
        /// Low-pass taps
        low: Vec<f64>,
        /// High-pass taps, `g[k] = (-1)^k h[L-1-k]`
        high: Vec<f64>,
        offset: i64,
    },
    Spline { scheme: Lifting, offset: i64 },
}

impl LineFilter {
    pub fn from_config(config: &WaveletConfig) -> Result<Self> {
        let unsupported = |reason: String| Error::Config { key: "wavelet_member".to_string(), reason };
        let filter = match config.family {
            WaveletFamily::Identity => LineFilter::Identity,
            WaveletFamily::Haar | WaveletFamily::HaarCentered => {
                Self::orthogonal(vec![std::f64::consts::FRAC_1_SQRT_2; 2], config.family.is_centered())
            }
            WaveletFamily::Daubechies | WaveletFamily::DaubechiesCentered => {
                let low = daubechies(config.member)
                    .filter(|_| config.member >= 4)
                    .ok_or_else(|| unsupported(format!("no Daubechies filter with {} taps", config.member)))?;
                Self::orthogonal(low, config.family.is_centered())
            }
            WaveletFamily::BSpline | WaveletFamily::BSplineCentered => {
                let scheme = match config.member {
                    202 => Lifting::Cdf53,
                    404 => Lifting::Cdf97,
                    m => return Err(unsupported(format!("no B-spline member {}", m))),
                };
                let offset = if config.family.is_centered() { -1 } else { 0 };
                LineFilter::Spline { scheme, offset }
            }
        };
        Ok(filter)
    }

    fn orthogonal(low: Vec<f64>, centered: bool) -> Self {
        let len = low.len();
        let high = (0..len)
            .map(|k| if k % 2 == 0 { low[len - 1 - k] } else { -low[len - 1 - k] })
            .collect();
        let offset = if centered { -((len / 2) as i64) } else { 0 };
        LineFilter::Orthogonal { low, high, offset }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, LineFilter::Identity)
    }

    /// `line` becomes [approximation | detail]; `tmp` must be as long as `line`
    pub fn analyse<T: Scalar>(&self, line: &mut [T], tmp: &mut [T]) {
        let s = line.len();
        debug_assert!(s % 2 == 0 && tmp.len() >= s);
        match self {
            LineFilter::Identity => {}
            LineFilter::Orthogonal { low, high, offset } => {
                let half = s / 2;
                for i in 0..half {
                    let mut a = T::zero();
                    let mut d = T::zero();
                    for (k, (&h, &g)) in low.iter().zip(high.iter()).enumerate() {
                        let v = line[wrap(2 * i as i64 + k as i64 + offset, s)];
                        a += v * T::from_real(h);
                        d += v * T::from_real(g);
                    }
                    tmp[i] = a;
                    tmp[half + i] = d;
                }
                line.copy_from_slice(&tmp[..s]);
            }
            LineFilter::Spline { scheme, offset } => {
                let half = s / 2;
                let (even, odd) = tmp[..s].split_at_mut(half);
                for i in 0..half {
                    even[i] = line[wrap(2 * i as i64 + offset, s)];
                    odd[i] = line[wrap(2 * i as i64 + 1 + offset, s)];
                }
                match scheme {
                    Lifting::Cdf53 => {
                        predict(odd, even, -0.5);
                        update(even, odd, 0.25);
                    }
                    Lifting::Cdf97 => {
                        predict(odd, even, CDF97_A);
                        update(even, odd, CDF97_B);
                        predict(odd, even, CDF97_C);
                        update(even, odd, CDF97_D);
                        scale(even, CDF97_K);
                        scale(odd, 1.0 / CDF97_K);
                    }
                }
                line.copy_from_slice(&tmp[..s]);
            }
        }
    }

    /// Exact inverse of [`LineFilter::analyse`]
    pub fn synthesise<T: Scalar>(&self, line: &mut [T], tmp: &mut [T]) {
        let s = line.len();
        debug_assert!(s % 2 == 0 && tmp.len() >= s);
        match self {
            LineFilter::Identity => {}
            LineFilter::Orthogonal { low, high, offset } => {
                let half = s / 2;
                tmp[..s].iter_mut().for_each(|v| *v = T::zero());
                for i in 0..half {
                    let a = line[i];
                    let d = line[half + i];
                    for (k, (&h, &g)) in low.iter().zip(high.iter()).enumerate() {
                        tmp[wrap(2 * i as i64 + k as i64 + offset, s)] += a * T::from_real(h) + d * T::from_real(g);
                    }
                }
                line.copy_from_slice(&tmp[..s]);
            }
            LineFilter::Spline { scheme, offset } => {
                let half = s / 2;
                {
                    let (even, odd) = line.split_at_mut(half);
                    match scheme {
                        Lifting::Cdf53 => {
                            update(even, odd, -0.25);
                            predict(odd, even, 0.5);
                        }
                        Lifting::Cdf97 => {
                            scale(even, 1.0 / CDF97_K);
                            scale(odd, CDF97_K);
                            update(even, odd, -CDF97_D);
                            predict(odd, even, -CDF97_C);
                            update(even, odd, -CDF97_B);
                            predict(odd, even, -CDF97_A);
                        }
                    }
                }
                for i in 0..half {
                    tmp[wrap(2 * i as i64 + offset, s)] = line[i];
                    tmp[wrap(2 * i as i64 + 1 + offset, s)] = line[half + i];
                }
                line.copy_from_slice(&tmp[..s]);
            }
        }
    }
}

#[inline]
fn wrap(i: i64, s: usize) -> usize {
    i.rem_euclid(s as i64) as usize
}

/// odd[i] += c (even[i] + even[i+1])
fn predict<T: Scalar>(odd: &mut [T], even: &[T], c: f64) {
    let n = even.len();
    let c = T::from_real(c);
    for i in 0..n {
        odd[i] += c * (even[i] + even[(i + 1) % n]);
    }
}

/// even[i] += c (odd[i-1] + odd[i])
fn update<T: Scalar>(even: &mut [T], odd: &[T], c: f64) {
    let n = odd.len();
    let c = T::from_real(c);
    for i in 0..n {
        even[i] += c * (odd[(i + n - 1) % n] + odd[i]);
    }
}

fn scale<T: Scalar>(v: &mut [T], c: f64) {
    let c = T::from_real(c);
    v.iter_mut().for_each(|x| *x *= c);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(family: WaveletFamily, member: usize) -> WaveletConfig {
        WaveletConfig { family, member, min_level: 0 }
    }

    #[test]
    fn test_daubechies_orthonormal() {
        for len in [2, 4, 6, 8] {
            let h = daubechies(len).unwrap();
            let sum: f64 = h.iter().sum();
            let energy: f64 = h.iter().map(|v| v * v).sum();
            assert_abs_diff_eq!(sum, std::f64::consts::SQRT_2, epsilon = 1e-12);
            assert_abs_diff_eq!(energy, 1.0, epsilon = 1e-12);
            // double-shift orthogonality
            for shift in (2..len).step_by(2) {
                let c: f64 = (0..len - shift).map(|k| h[k] * h[k + shift]).sum();
                assert_abs_diff_eq!(c, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_haar_step() {
        let f = LineFilter::from_config(&config(WaveletFamily::Haar, 2)).unwrap();
        let mut line = vec![1.0, 3.0, 5.0, 5.0];
        let mut tmp = vec![0.0; 4];
        f.analyse(&mut line, &mut tmp);
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(line[0], 4.0 * r, epsilon = 1e-12);
        assert_abs_diff_eq!(line[1], 10.0 * r, epsilon = 1e-12);
        assert_abs_diff_eq!(line[2], -2.0 * r, epsilon = 1e-12);
        assert_abs_diff_eq!(line[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_every_family_inverts() {
        let cases = [
            (WaveletFamily::Haar, 2),
            (WaveletFamily::HaarCentered, 2),
            (WaveletFamily::Daubechies, 4),
            (WaveletFamily::Daubechies, 6),
            (WaveletFamily::DaubechiesCentered, 8),
            (WaveletFamily::BSpline, 202),
            (WaveletFamily::BSplineCentered, 404),
        ];
        let original: Vec<f64> = (0..16).map(|i| ((i * 7) % 11) as f64 - 3.0).collect();
        for (family, member) in cases {
            let f = LineFilter::from_config(&config(family, member)).unwrap();
            let mut line = original.clone();
            let mut tmp = vec![0.0; 16];
            f.analyse(&mut line, &mut tmp);
            f.synthesise(&mut line, &mut tmp);
            for (a, b) in line.iter().zip(&original) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_spline_detail_vanishes_on_linear_ramp() {
        // CDF 5/3 predicts linear signals exactly away from the wrap
        let f = LineFilter::from_config(&config(WaveletFamily::BSpline, 202)).unwrap();
        let mut line: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let mut tmp = vec![0.0; 8];
        f.analyse(&mut line, &mut tmp);
        for d in &line[4..7] {
            assert_abs_diff_eq!(*d, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unsupported_members() {
        assert!(LineFilter::from_config(&config(WaveletFamily::Daubechies, 5)).is_err());
        assert!(LineFilter::from_config(&config(WaveletFamily::BSpline, 4)).is_err());
        assert!(LineFilter::from_config(&config(WaveletFamily::Identity, 0)).unwrap().is_identity());
    }
}
