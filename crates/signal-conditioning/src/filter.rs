//! Butterworth Bandpass Filter
//!
//! First-order Butterworth bandpass designed by bilinear transform with
//! frequency pre-warping, applied forward and backward so the output has no
//! phase delay relative to the input.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FilterError;

/// Bandpass configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandpassConfig {
    /// Lower cutoff (Hz). 0.75 Hz = 45 bpm
    pub low_cutoff_hz: f64,
    /// Upper cutoff (Hz). 4.0 Hz = 240 bpm
    pub high_cutoff_hz: f64,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            low_cutoff_hz: 0.75,
            high_cutoff_hz: 4.0,
        }
    }
}

/// Transfer function coefficients, `a[0] == 1`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Design a first-order Butterworth bandpass for sampling rate `fs`.
    ///
    /// Cutoffs are normalized by the Nyquist frequency and pre-warped; the
    /// analog prototype `1 / (s + 1)` is shifted to the band and mapped to
    /// the z-plane with the bilinear transform.
    pub fn butterworth_bandpass(low_hz: f64, high_hz: f64, fs: f64) -> Result<Self, FilterError> {
        let nyquist = 0.5 * fs;
        let low = low_hz / nyquist;
        let high = high_hz / nyquist;

        if !(low > 0.0 && low < high && high < 1.0) {
            return Err(FilterError::InvalidCutoffs {
                low: low_hz,
                high: high_hz,
                fs,
            });
        }

        // Bilinear transform constant for normalized frequencies (fs = 2)
        let k = 4.0;
        let w1 = k * (std::f64::consts::PI * low / 2.0).tan();
        let w2 = k * (std::f64::consts::PI * high / 2.0).tan();
        let bw = w2 - w1;
        let w0_sq = w1 * w2;

        let a0 = k * k + bw * k + w0_sq;
        let gain = bw * k / a0;

        let coefficients = Self {
            b: vec![gain, 0.0, -gain],
            a: vec![1.0, 2.0 * (w0_sq - k * k) / a0, (k * k - bw * k + w0_sq) / a0],
        };

        if coefficients.b.iter().chain(&coefficients.a).any(|c| !c.is_finite()) {
            return Err(FilterError::Numerical("non-finite filter coefficients".into()));
        }
        Ok(coefficients)
    }

    /// Number of delay states
    pub fn order(&self) -> usize {
        self.a.len().max(self.b.len()) - 1
    }

    /// Steady-state initial conditions for a unit step input
    pub fn lfilter_zi(&self) -> Result<Vec<f64>, FilterError> {
        let n = self.order();
        if n == 0 {
            return Ok(Vec::new());
        }
        let (b, a) = self.padded();

        // (I - companion(a)^T) zi = b[1..] - a[1..] * b[0]
        let mut m = vec![vec![0.0; n]; n];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
            row[0] += a[i + 1];
            if i + 1 < n {
                row[i + 1] = -1.0;
            }
        }
        let rhs: Vec<f64> = (0..n).map(|i| b[i + 1] - a[i + 1] * b[0]).collect();

        solve(m, rhs)
    }

    fn padded(&self) -> (Vec<f64>, Vec<f64>) {
        let len = self.order() + 1;
        let mut b = self.b.clone();
        let mut a = self.a.clone();
        b.resize(len, 0.0);
        a.resize(len, 0.0);
        (b, a)
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>, FilterError> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(FilterError::Numerical("singular initial-condition system".into()));
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[row][row];
    }
    Ok(x)
}

/// Direct form II transposed IIR filter.
///
/// `zi` gives the initial delay states; zeros are used when it is `None`.
pub fn lfilter(coefficients: &FilterCoefficients, x: &[f64], zi: Option<&[f64]>) -> Vec<f64> {
    let n = coefficients.order();
    let (b, a) = coefficients.padded();
    let mut z = match zi {
        Some(initial) => {
            let mut z = initial.to_vec();
            z.resize(n, 0.0);
            z
        }
        None => vec![0.0; n],
    };

    let mut y = Vec::with_capacity(x.len());
    for &sample in x {
        let out = b[0] * sample + z.first().copied().unwrap_or(0.0);
        for i in 0..n {
            let next = if i + 1 < n { z[i + 1] } else { 0.0 };
            z[i] = b[i + 1] * sample + next - a[i + 1] * out;
        }
        y.push(out);
    }
    y
}

/// Forward-backward filtering with odd-reflection edge padding
pub fn filtfilt(coefficients: &FilterCoefficients, x: &[f64]) -> Result<Vec<f64>, FilterError> {
    let padlen = 3 * coefficients.a.len().max(coefficients.b.len());
    if x.len() <= padlen {
        return Err(FilterError::Numerical(format!(
            "input length {} must exceed pad length {}",
            x.len(),
            padlen
        )));
    }

    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));

    let zi = coefficients.lfilter_zi()?;

    let scaled: Vec<f64> = zi.iter().map(|z| z * ext[0]).collect();
    let mut forward = lfilter(coefficients, &ext, Some(&scaled));

    forward.reverse();
    let scaled: Vec<f64> = zi.iter().map(|z| z * forward[0]).collect();
    let mut backward = lfilter(coefficients, &forward, Some(&scaled));
    backward.reverse();

    let output = backward[padlen..padlen + n].to_vec();
    if output.iter().any(|v| !v.is_finite()) {
        return Err(FilterError::Numerical("non-finite filter output".into()));
    }
    Ok(output)
}

/// Shortest series a default filter accepts
pub const DEFAULT_MIN_SAMPLES: usize = 20;

/// Cardiac-band filter
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    config: BandpassConfig,
    min_samples: usize,
}

impl Default for BandpassFilter {
    fn default() -> Self {
        Self::new(BandpassConfig::default())
    }
}

impl BandpassFilter {
    pub fn new(config: BandpassConfig) -> Self {
        Self {
            config,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }

    /// Accept series of at least `min_samples`. Pipelines pass their gate
    /// minimum here so that one setting governs both checks.
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn config(&self) -> &BandpassConfig {
        &self.config
    }

    /// Check sampling rate against the upper cutoff (Nyquist guard)
    pub fn check_sampling_rate(&self, fs: f64) -> Result<(), FilterError> {
        if !fs.is_finite() || fs <= 2.0 * self.config.high_cutoff_hz {
            return Err(FilterError::SamplingRateTooLow {
                fs,
                high_cutoff: self.config.high_cutoff_hz,
            });
        }
        Ok(())
    }

    /// Design coefficients for `fs`
    pub fn design(&self, fs: f64) -> Result<FilterCoefficients, FilterError> {
        self.check_sampling_rate(fs)?;
        FilterCoefficients::butterworth_bandpass(self.config.low_cutoff_hz, self.config.high_cutoff_hz, fs)
    }

    /// Filter `signal` sampled at `fs`. Output has the same length as the input.
    pub fn apply(&self, signal: &[f64], fs: f64) -> Result<Vec<f64>, FilterError> {
        if signal.len() < self.min_samples {
            return Err(FilterError::TooShort {
                len: signal.len(),
                min: self.min_samples,
            });
        }

        let coefficients = self.design(fs).map_err(|e| {
            warn!("Bandpass design rejected: {}", e);
            e
        })?;
        debug!(
            "Bandpass {:.2}-{:.2} Hz at {:.2} Hz: b={:?} a={:?}",
            self.config.low_cutoff_hz, self.config.high_cutoff_hz, fs, coefficients.b, coefficients.a
        );

        filtfilt(&coefficients, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn sine(n: usize, fs: f64, freq: f64, amplitude: f64, baseline: f64) -> Vec<f64> {
        (0..n)
            .map(|i| baseline + amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_coefficients_at_30_fps() {
        let c = FilterCoefficients::butterworth_bandpass(0.75, 4.0, 30.0).unwrap();
        assert_eq!(c.b.len(), 3);
        assert_eq!(c.a.len(), 3);
        assert_eq!(c.a[0], 1.0);
        assert!((c.b[0] - 0.261512).abs() < 1e-5);
        assert_eq!(c.b[1], 0.0);
        assert_eq!(c.b[2], -c.b[0]);
        assert!((c.a[1] + 1.376972).abs() < 1e-5);
        assert!((c.a[2] - 0.476976).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_cutoffs() {
        assert!(matches!(
            FilterCoefficients::butterworth_bandpass(4.0, 0.75, 30.0),
            Err(FilterError::InvalidCutoffs { .. })
        ));
        assert!(matches!(
            FilterCoefficients::butterworth_bandpass(0.0, 4.0, 30.0),
            Err(FilterError::InvalidCutoffs { .. })
        ));
    }

    #[test]
    fn test_lfilter_zi_is_steady_state() {
        let c = FilterCoefficients::butterworth_bandpass(0.75, 4.0, 30.0).unwrap();
        let zi = c.lfilter_zi().unwrap();
        // A unit step started from the steady state stays at the DC response (0)
        let y = lfilter(&c, &[1.0; 50], Some(&zi));
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_constant_signal_filters_to_zero() {
        let filter = BandpassFilter::default();
        let out = filter.apply(&[100.0; 60], 30.0).unwrap();
        assert_eq!(out.len(), 60);
        assert!(out.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_in_band_sine_passes() {
        let filter = BandpassFilter::default();
        let input = sine(300, 30.0, 1.2, 5.0, 100.0);
        let out = filter.apply(&input, 30.0).unwrap();

        let mean = out.iter().sum::<f64>() / out.len() as f64;
        let max = out.iter().cloned().fold(f64::MIN, f64::max);
        assert!(mean.abs() < 1.0);
        assert!(max > 2.0 && max < 6.0);
    }

    #[test]
    fn test_out_of_band_sine_attenuated() {
        let filter = BandpassFilter::default();
        let in_band = filter.apply(&sine(300, 30.0, 1.5, 1.0, 0.0), 30.0).unwrap();
        let high = filter.apply(&sine(300, 30.0, 12.0, 1.0, 0.0), 30.0).unwrap();

        let energy = |v: &[f64]| v[50..250].iter().map(|x| x * x).sum::<f64>();
        assert!(energy(&high) < energy(&in_band) * 0.5);
    }

    #[test]
    fn test_short_signal_rejected() {
        let filter = BandpassFilter::default();
        assert_eq!(
            filter.apply(&[1.0; 15], 30.0),
            Err(FilterError::TooShort { len: 15, min: 20 })
        );
    }

    #[test]
    fn test_lowered_minimum_accepts_shorter_series() {
        let filter = BandpassFilter::default().with_min_samples(15);
        let output = filter.apply(&sine(16, 30.0, 1.2, 5.0, 100.0), 30.0).unwrap();
        assert_eq!(output.len(), 16);
        assert_eq!(
            filter.apply(&[1.0; 14], 30.0),
            Err(FilterError::TooShort { len: 14, min: 15 })
        );
    }

    #[test]
    fn test_filtfilt_pad_length_guard() {
        let c = FilterCoefficients::butterworth_bandpass(0.75, 4.0, 30.0).unwrap();
        assert!(matches!(filtfilt(&c, &[1.0; 9]), Err(FilterError::Numerical(_))));
        assert!(filtfilt(&c, &[1.0; 10]).is_ok());
    }

    #[test]
    fn test_five_fps_is_too_low() {
        let filter = BandpassFilter::default();
        assert!(matches!(
            filter.apply(&[1.0; 40], 5.0),
            Err(FilterError::SamplingRateTooLow { .. })
        ));
        // Exactly twice the upper cutoff is still rejected
        assert!(matches!(
            filter.apply(&[1.0; 40], 8.0),
            Err(FilterError::SamplingRateTooLow { .. })
        ));
    }

    #[test]
    fn test_non_finite_input_is_numerical_failure() {
        let filter = BandpassFilter::default();
        let mut input = sine(60, 30.0, 1.2, 1.0, 0.0);
        input[30] = f64::NAN;
        assert!(matches!(filter.apply(&input, 30.0), Err(FilterError::Numerical(_))));
    }

    proptest! {
        #[test]
        fn prop_length_preserved_and_deterministic(
            signal in prop::collection::vec(0.0f64..255.0, 20..200),
            fs in 8.5f64..120.0,
        ) {
            let filter = BandpassFilter::default();
            let first = filter.apply(&signal, fs).unwrap();
            let second = filter.apply(&signal, fs).unwrap();
            prop_assert_eq!(first.len(), signal.len());
            prop_assert_eq!(
                first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_low_sampling_rate_never_filters(
            signal in prop::collection::vec(0.0f64..255.0, 20..100),
            fs in 0.0f64..=8.0,
        ) {
            let filter = BandpassFilter::default();
            let is_too_low = matches!(filter.apply(&signal, fs), Err(FilterError::SamplingRateTooLow { .. }));
            prop_assert!(is_too_low);
        }
    }
}
