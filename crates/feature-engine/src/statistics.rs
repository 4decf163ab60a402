//! Summary statistics of a filtered series

/// Population statistics of one series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticalFeatures {
    pub mean: f64,
    /// Population standard deviation (divides by n)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// `max - min`
    pub peak_to_peak: f64,
}

impl StatisticalFeatures {
    /// `None` for an empty series
    pub fn compute(samples: &[f64]) -> Option<Self> {
        let (&first, rest) = samples.split_first()?;
        let count = samples.len() as f64;

        let (min, max) = rest
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let mean = samples.iter().sum::<f64>() / count;
        let variance = samples.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / count;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            peak_to_peak: max - min,
        })
    }
}
