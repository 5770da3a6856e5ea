//! Magnitude response analysis for display
//!
//! The analyzer designs a scratch `MonoChain` from a snapshot and evaluates
//! the product of the active sections' magnitudes on a logarithmic frequency
//! axis. The scratch chain never processes audio, so nothing is shared with
//! the real-time path.

use crate::domain::audio::{ProcessSpec, Result};
use crate::domain::chain::MonoChain;
use crate::domain::dsp::gain_to_db;
use crate::domain::params::{ChainSettings, MAX_FREQUENCY, MIN_FREQUENCY};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Map a 0..1 proportion onto a logarithmic `min..max` axis
pub fn log_frequency(proportion: f64, min: f64, max: f64) -> f64 {
    min * (max / min).powf(proportion)
}

/// Frequency of bin `index` out of `bins` on the 20 Hz – 20 kHz display axis
pub fn bin_frequency(index: usize, bins: usize) -> f64 {
    log_frequency(
        index as f64 / bins as f64,
        f64::from(MIN_FREQUENCY),
        f64::from(MAX_FREQUENCY),
    )
}

/// Display axis for `bins` bins, low to high
pub fn frequency_axis(bins: usize) -> Vec<f64> {
    (0..bins).map(|i| bin_frequency(i, bins)).collect()
}

/// A computed response, ready for plotting or printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCurve {
    pub sample_rate: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes_db: Vec<f64>,
}

impl ResponseCurve {
    pub fn len(&self) -> usize {
        self.magnitudes_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes_db.is_empty()
    }

    /// `(frequency, dB)` pairs, low to high
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies_hz
            .iter()
            .copied()
            .zip(self.magnitudes_db.iter().copied())
    }

    /// Value of the bin closest to `freq` on the log axis
    pub fn nearest(&self, freq: f64) -> Option<f64> {
        self.points()
            .min_by(|(a, _), (b, _)| {
                let da = (a.ln() - freq.ln()).abs();
                let db = (b.ln() - freq.ln()).abs();
                da.total_cmp(&db)
            })
            .map(|(_, db)| db)
    }
}

/// Computes the aggregate magnitude response of a chain configuration
#[derive(Debug, Clone)]
pub struct ResponseAnalyzer {
    chain: MonoChain,
    sample_rate: f64,
}

impl ResponseAnalyzer {
    pub fn new(sample_rate: f64) -> Result<Self> {
        let spec = ProcessSpec::new(sample_rate, 1);
        let mut chain = MonoChain::new();
        chain.prepare(&spec)?;
        Ok(Self { chain, sample_rate })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Magnitude in dB at an arbitrary frequency
    pub fn magnitude_db_at(&mut self, settings: &ChainSettings, freq: f64) -> f64 {
        self.chain.update_from_settings(settings, self.sample_rate);
        gain_to_db(self.chain.magnitude_for_frequency(freq, self.sample_rate))
    }

    /// Fill `out` with one dB value per bin, without allocating
    pub fn compute_into(&mut self, settings: &ChainSettings, out: &mut [f64]) {
        self.chain.update_from_settings(settings, self.sample_rate);

        let bins = out.len();
        for (i, value) in out.iter_mut().enumerate() {
            let freq = bin_frequency(i, bins);
            *value = gain_to_db(self.chain.magnitude_for_frequency(freq, self.sample_rate));
        }

        trace!(
            "Response computed: {} bins, LC={}Hz/{}, P={:.1}dB@{}Hz Q={:.2}, HC={}Hz/{}",
            bins,
            settings.low_cut_freq,
            settings.low_cut_slope,
            settings.peak_gain_db,
            settings.peak_freq,
            settings.peak_q,
            settings.high_cut_freq,
            settings.high_cut_slope
        );
    }

    /// One dB value per bin, ordered low to high frequency
    pub fn compute(&mut self, settings: &ChainSettings, bins: usize) -> Vec<f64> {
        let mut out = vec![0.0; bins];
        self.compute_into(settings, &mut out);
        out
    }

    pub fn compute_curve(&mut self, settings: &ChainSettings, bins: usize) -> ResponseCurve {
        ResponseCurve {
            sample_rate: self.sample_rate,
            frequencies_hz: frequency_axis(bins),
            magnitudes_db: self.compute(settings, bins),
        }
    }
}
