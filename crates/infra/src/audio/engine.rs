//! Real-time audio engine thread
//!
//! This module provides the AudioEngine, which owns an `EqProcessor` on a
//! dedicated, named thread. Blocks arrive over a bounded crossbeam channel,
//! are processed in place and sent back on a second channel. The thread ends
//! when either side of the exchange hangs up.

use crate::audio::processor::EqProcessor;
use contour_core::domain::audio::{AudioError, Result};
use crossbeam::channel::{Receiver, Sender};
use serde::Serialize;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Name given to the audio thread
pub const AUDIO_THREAD_NAME: &str = "contour-audio";

/// One block of planar stereo audio
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StereoBlock {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBlock {
    /// Silent block of `len` frames
    pub fn silence(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
        }
    }

    pub fn from_channels(left: Vec<f32>, right: Vec<f32>) -> Self {
        Self { left, right }
    }

    /// Split `L R L R ...` samples into two channels
    pub fn from_interleaved(samples: &[f32]) -> Self {
        let (left, right) = samples.chunks_exact(2).map(|f| (f[0], f[1])).unzip();
        Self { left, right }
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }

    /// Frames in the block (the left channel's length)
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Counters reported when the audio thread finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngineStats {
    /// Blocks processed without error
    pub blocks_processed: u64,

    /// Frames processed, per channel
    pub samples_processed: u64,

    /// Blocks rejected by the processor and passed through unchanged
    pub processing_errors: u64,
}

/// Handle to a running audio thread
pub struct AudioEngine {
    handle: Option<JoinHandle<EngineStats>>,
}

impl AudioEngine {
    /// Spawn the audio thread
    ///
    /// The processor must already be prepared; the thread never reconfigures
    /// it beyond what the parameter store drives.
    pub fn start(
        processor: EqProcessor,
        inbound: Receiver<StereoBlock>,
        outbound: Sender<StereoBlock>,
    ) -> Result<Self> {
        let spec = processor.spec().ok_or(AudioError::NotPrepared)?;

        let handle = thread::Builder::new()
            .name(AUDIO_THREAD_NAME.to_string())
            .spawn(move || run_audio_loop(processor, inbound, outbound))
            .map_err(|e| AudioError::StreamError(format!("Failed to spawn audio thread: {e}")))?;

        info!(
            sample_rate = spec.sample_rate,
            max_block_size = spec.maximum_block_size,
            "Audio engine started"
        );

        Ok(Self {
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the audio thread to finish and collect its counters
    ///
    /// The thread finishes once every inbound sender has been dropped, so
    /// callers hang up their side before joining.
    pub fn join(mut self) -> Result<EngineStats> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| AudioError::StreamError("Audio engine already joined".to_string()))?;

        let stats = handle
            .join()
            .map_err(|_| AudioError::StreamError("Audio thread panicked".to_string()))?;

        info!(
            blocks = stats.blocks_processed,
            samples = stats.samples_processed,
            errors = stats.processing_errors,
            "Audio engine stopped"
        );
        Ok(stats)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Audio engine dropped without join, detaching audio thread");
        }
    }
}

fn run_audio_loop(
    mut processor: EqProcessor,
    inbound: Receiver<StereoBlock>,
    outbound: Sender<StereoBlock>,
) -> EngineStats {
    let mut stats = EngineStats::default();

    for mut block in inbound.iter() {
        match processor.process_block(&mut block.left, &mut block.right) {
            Ok(()) => {
                stats.blocks_processed += 1;
                stats.samples_processed += block.len() as u64;
            }
            Err(_) => stats.processing_errors += 1,
        }

        if outbound.send(block).is_err() {
            break;
        }
    }

    debug!(?stats, "Audio loop finished");
    stats
}
