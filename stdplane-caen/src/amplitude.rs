//! Waveform amplitude estimation.
//!
//! The statistics are taken on sample magnitudes: the polarity comes from
//! whichever extremum is larger in magnitude, the baseline is the median
//! magnitude and the spread is the population standard deviation of the
//! magnitudes. A waveform counts as a signal only when its peak magnitude
//! exceeds [`SIGNIFICANCE`] times `baseline + stddev`.

/// Gate factor applied to `baseline + stddev`.
pub const SIGNIFICANCE: f64 = 3.0;

/// Amplitude estimate of one channel waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformAmplitude {
    /// Signed peak when the waveform passes the gate, `0` otherwise.
    pub amplitude: f64,
    /// Signed median magnitude.
    pub baseline: f64,
    /// `1.0` or `-1.0`.
    pub polarity: f64,
    /// Population standard deviation of the magnitudes.
    pub stddev: f64,
    /// Largest magnitude.
    pub peak: f64,
}

impl WaveformAmplitude {
    /// Whether the waveform passed the significance gate.
    #[must_use]
    pub fn is_signal(&self) -> bool {
        self.amplitude != 0.0
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Estimates the amplitude of a waveform.
///
/// NaN and infinite samples are ignored. Returns `None` when no finite
/// sample remains.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn estimate(samples: &[f64]) -> Option<WaveformAmplitude> {
    let samples: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return None;
    }

    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let polarity = if min.abs() > max.abs() { -1.0 } else { 1.0 };

    let mut magnitudes: Vec<f64> = samples.iter().map(|v| v.abs()).collect();
    magnitudes.sort_by(f64::total_cmp);

    let baseline = median(&magnitudes);
    let n = magnitudes.len() as f64;
    let mean = magnitudes.iter().sum::<f64>() / n;
    let variance = magnitudes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let peak = magnitudes[magnitudes.len() - 1];

    let amplitude = if peak > SIGNIFICANCE * (baseline + stddev) {
        peak * polarity
    } else {
        0.0
    };

    Some(WaveformAmplitude {
        amplitude,
        baseline: baseline * polarity,
        polarity,
        stddev,
        peak,
    })
}
