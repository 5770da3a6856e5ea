//! Cascade filters and the per-channel filter chain
//!
//! A `MonoChain` is LowCut cascade → Peak section → HighCut cascade. Each
//! cascade owns four biquad sections and enables a prefix of them according
//! to the selected slope.
//!
//! The audio thread owns its chains exclusively (`&mut`), so a reconfiguration
//! always completes before the next sample is processed.

use crate::domain::audio::{ProcessSpec, Result};
use crate::domain::design;
use crate::domain::dsp::{BiquadCoeffs, BiquadSection};
use crate::domain::params::{ChainSettings, Slope, MAX_FREQUENCY};
use tracing::debug;

pub use crate::domain::design::MAX_CUT_SECTIONS;

/// Stage of a `MonoChain`, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

impl ChainPosition {
    pub const ALL: [ChainPosition; 3] = [
        ChainPosition::LowCut,
        ChainPosition::Peak,
        ChainPosition::HighCut,
    ];
}

// ============================================================================
// CASCADE FILTER
// ============================================================================

/// Four biquad sections in series, of which a slope-selected prefix is active
#[derive(Debug, Clone, PartialEq)]
pub struct CutFilter {
    sections: [BiquadSection; MAX_CUT_SECTIONS],
}

impl Default for CutFilter {
    /// Unity pass-through at 12 dB/Oct until the first `configure`
    fn default() -> Self {
        let mut filter = Self {
            sections: Default::default(),
        };
        filter.configure(&[BiquadCoeffs::default()], Slope::Db12);
        filter
    }
}

impl CutFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the first `slope.active_sections()` coefficient sets and bypass
    /// the remaining sections.
    ///
    /// A section that comes out of bypass starts from cleared state instead of
    /// whatever it held when it was last active.
    pub fn configure(&mut self, coefficients: &[BiquadCoeffs], slope: Slope) {
        let active = slope.active_sections();
        debug_assert!(
            coefficients.len() >= active,
            "{} coefficient sets for {slope}",
            coefficients.len()
        );

        for (i, section) in self.sections.iter_mut().enumerate() {
            match coefficients.get(i).filter(|_| i < active) {
                Some(coeffs) => {
                    if section.is_bypassed() {
                        section.reset();
                    }
                    section.set_coeffs(*coeffs);
                    section.set_bypassed(false);
                }
                None => section.set_bypassed(true),
            }
        }
    }

    /// Pass `x` through every section in index order
    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(x, |acc, section| section.process_sample(acc))
    }

    /// Number of non-bypassed sections
    pub fn active_count(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_bypassed()).count()
    }

    /// Out-of-range indices report bypassed
    pub fn is_section_bypassed(&self, index: usize) -> bool {
        self.sections.get(index).map_or(true, BiquadSection::is_bypassed)
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    /// Combined linear magnitude of the active sections
    pub fn magnitude(&self, freq: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.magnitude_for_frequency(freq, sample_rate))
            .product()
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

// ============================================================================
// FILTER CHAIN
// ============================================================================

/// LowCut → Peak → HighCut for a single channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonoChain {
    low_cut: CutFilter,
    peak: BiquadSection,
    high_cut: CutFilter,
}

impl MonoChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the processing setup and clear all filter state
    ///
    /// Must be called before the first sample after any sample-rate change.
    pub fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate(f64::from(MAX_FREQUENCY))?;
        self.reset();
        debug!(
            "Chain prepared: {} Hz, max block {}",
            spec.sample_rate, spec.maximum_block_size
        );
        Ok(())
    }

    /// Redesign every stage from one snapshot
    pub fn update_from_settings(&mut self, settings: &ChainSettings, sample_rate: f64) {
        for position in ChainPosition::ALL {
            self.update_position(position, settings, sample_rate);
        }
    }

    /// Redesign a single stage
    pub fn update_position(
        &mut self,
        position: ChainPosition,
        settings: &ChainSettings,
        sample_rate: f64,
    ) {
        match position {
            ChainPosition::LowCut => {
                let cut = design::low_cut_filter(settings, sample_rate);
                self.low_cut.configure(cut.as_slice(), settings.low_cut_slope);
            }
            ChainPosition::Peak => {
                self.peak.set_coeffs(design::peak_filter(settings, sample_rate));
            }
            ChainPosition::HighCut => {
                let cut = design::high_cut_filter(settings, sample_rate);
                self.high_cut.configure(cut.as_slice(), settings.high_cut_slope);
            }
        }
    }

    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        let x = self.low_cut.process_sample(x);
        let x = self.peak.process_sample(x);
        self.high_cut.process_sample(x)
    }

    /// Filter a block in place
    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(f64::from(*sample)) as f32;
        }
    }

    /// Product of the magnitudes of every active section at `freq`
    pub fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        ChainPosition::ALL
            .into_iter()
            .map(|position| self.stage_magnitude(position, freq, sample_rate))
            .product()
    }

    pub fn stage_magnitude(&self, position: ChainPosition, freq: f64, sample_rate: f64) -> f64 {
        match position {
            ChainPosition::LowCut => self.low_cut.magnitude(freq, sample_rate),
            ChainPosition::Peak => self.peak.magnitude_for_frequency(freq, sample_rate),
            ChainPosition::HighCut => self.high_cut.magnitude(freq, sample_rate),
        }
    }

    pub fn low_cut(&self) -> &CutFilter {
        &self.low_cut
    }

    pub fn peak(&self) -> &BiquadSection {
        &self.peak
    }

    pub fn high_cut(&self) -> &CutFilter {
        &self.high_cut
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }
}
