//! FFT-based Pulse Spectrum Analysis

use rustfft::{num_complex::Complex, FftPlanner};

/// Spectrum summary of a filtered signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFeatures {
    /// Strongest frequency inside the analysis band (Hz)
    pub dominant_frequency_hz: f64,
    /// Power inside the analysis band
    pub band_power: f64,
    /// Total spectral power (positive frequencies)
    pub total_power: f64,
}

impl SpectralFeatures {
    /// Dominant frequency expressed in beats per minute
    pub fn dominant_bpm(&self) -> f64 {
        self.dominant_frequency_hz * 60.0
    }

    /// Fraction of power inside the analysis band
    pub fn band_power_ratio(&self) -> f64 {
        if self.total_power > 0.0 {
            self.band_power / self.total_power
        } else {
            0.0
        }
    }
}

/// FFT analyzer restricted to a frequency band
pub struct SpectrumAnalyzer {
    /// FFT planner for efficient computation
    planner: FftPlanner<f64>,
    /// Analysis band (Hz)
    band: (f64, f64),
}

impl SpectrumAnalyzer {
    /// Create an analyzer for `band` = (low, high) in Hz
    pub fn new(band: (f64, f64)) -> Self {
        Self {
            planner: FftPlanner::new(),
            band,
        }
    }

    /// Apply Hamming window to reduce spectral leakage
    fn apply_hamming_window(signal: &mut [f64]) {
        let n = signal.len();
        if n < 2 {
            return;
        }
        for (i, value) in signal.iter_mut().enumerate() {
            let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            *value *= window;
        }
    }

    /// Analyze `signal` sampled at `sample_rate` Hz
    pub fn analyze(&mut self, signal: &[f64], sample_rate: f64) -> Option<SpectralFeatures> {
        if signal.len() < 2 || !(sample_rate > 0.0) {
            return None;
        }

        let n = signal.len();

        let mean = signal.iter().sum::<f64>() / n as f64;
        let mut windowed: Vec<f64> = signal.iter().map(|v| v - mean).collect();
        Self::apply_hamming_window(&mut windowed);

        let mut buffer: Vec<Complex<f64>> = windowed.iter().map(|&v| Complex::new(v, 0.0)).collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let freq_resolution = sample_rate / n as f64;
        let mut band_power = 0.0;
        let mut total_power = 0.0;
        let mut best: Option<(usize, f64)> = None;

        for (i, c) in buffer.iter().take(n / 2 + 1).enumerate() {
            let power = c.norm_sqr() / n as f64;
            total_power += power;

            let freq = i as f64 * freq_resolution;
            if freq >= self.band.0 && freq <= self.band.1 {
                band_power += power;
                if best.map_or(true, |(_, p)| power > p) {
                    best = Some((i, power));
                }
            }
        }

        let (peak, _) = best?;
        Some(SpectralFeatures {
            dominant_frequency_hz: peak as f64 * freq_resolution,
            band_power,
            total_power,
        })
    }
}
