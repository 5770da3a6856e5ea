//! Stereo equalizer processor
//!
//! Two independent `MonoChain`s, one per channel, fed from a single parameter
//! snapshot taken at the top of every block. The hot path never allocates,
//! locks or logs; failures come back as plain `AudioError` values and leave
//! the audio untouched.

use crate::audio::param_store::ParameterStore;
use contour_core::domain::audio::{AudioError, ProcessSpec, Result};
use contour_core::domain::params::MAX_FREQUENCY;
use contour_core::domain::{Effect, MonoChain};
use std::sync::Arc;
use tracing::info;

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// Three-band parametric equalizer over two mono channels
#[derive(Debug)]
pub struct EqProcessor {
    store: Arc<ParameterStore>,
    chains: [MonoChain; 2],
    spec: Option<ProcessSpec>,
    bypassed: bool,
}

impl EqProcessor {
    pub const NAME: &'static str = "Contour EQ";

    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self {
            store,
            chains: [MonoChain::new(), MonoChain::new()],
            spec: None,
            bypassed: false,
        }
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    pub fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    /// Validate the host setup, clear all state and design initial coefficients
    ///
    /// A failed prepare leaves the processor unprepared, even if an earlier
    /// call succeeded.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        self.spec = None;
        let spec = ProcessSpec::new(sample_rate, max_block_size);
        spec.validate(f64::from(MAX_FREQUENCY))?;

        let settings = self.store.snapshot();
        for chain in &mut self.chains {
            chain.prepare(&spec)?;
            chain.update_from_settings(&settings, spec.sample_rate);
        }
        self.spec = Some(spec);

        info!(sample_rate, max_block_size, "Equalizer prepared");
        Ok(())
    }

    /// Left chain, for inspection
    pub fn left(&self) -> &MonoChain {
        &self.chains[LEFT]
    }

    /// Right chain, for inspection
    pub fn right(&self) -> &MonoChain {
        &self.chains[RIGHT]
    }

    /// Read one snapshot and reconfigure both chains from it
    fn begin_block(&mut self, len: usize) -> Result<()> {
        let spec = self.spec.ok_or(AudioError::NotPrepared)?;
        if len > spec.maximum_block_size {
            return Err(AudioError::BlockTooLarge {
                len,
                max: spec.maximum_block_size,
            });
        }

        let settings = self.store.snapshot();
        for chain in &mut self.chains {
            chain.update_from_settings(&settings, spec.sample_rate);
        }
        Ok(())
    }

    /// Process planar stereo in place
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        if left.len() != right.len() {
            return Err(AudioError::ChannelMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        self.begin_block(left.len())?;

        if self.bypassed {
            return Ok(());
        }

        let [left_chain, right_chain] = &mut self.chains;
        left_chain.process_block(left);
        right_chain.process_block(right);
        Ok(())
    }
}

impl Effect for EqProcessor {
    /// Process interleaved `L R L R ...` frames in place
    fn process(&mut self, buffer: &mut [f32]) -> Result<()> {
        if buffer.len() % 2 != 0 {
            return Err(AudioError::ChannelMismatch {
                left: buffer.len().div_ceil(2),
                right: buffer.len() / 2,
            });
        }
        self.begin_block(buffer.len() / 2)?;

        if self.bypassed {
            return Ok(());
        }

        let [left_chain, right_chain] = &mut self.chains;
        for frame in buffer.chunks_exact_mut(2) {
            frame[LEFT] = left_chain.process_sample(f64::from(frame[LEFT])) as f32;
            frame[RIGHT] = right_chain.process_sample(f64::from(frame[RIGHT])) as f32;
        }
        Ok(())
    }

    fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Leaving bypass clears filter state so stale history is never heard
    fn set_bypass(&mut self, bypass: bool) {
        if self.bypassed && !bypass {
            self.reset();
        }
        self.bypassed = bypass;
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
