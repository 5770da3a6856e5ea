//! Display-side response monitor
//!
//! Runs in the control context on a bounded refresh timer. It owns its own
//! `ResponseAnalyzer` (and therefore its own scratch chain), reads the
//! parameter store like the audio thread does, and never touches audio state.

use crate::audio::param_store::ParameterStore;
use contour_core::domain::audio::Result;
use contour_core::domain::response::frequency_axis;
use contour_core::domain::{ResponseAnalyzer, ResponseCurve};
use crossbeam::channel::{Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Recomputes the magnitude response when parameters change
#[derive(Debug)]
pub struct ResponseMonitor {
    store: Arc<ParameterStore>,
    analyzer: ResponseAnalyzer,
    magnitudes: Vec<f64>,
    computed: bool,
}

impl ResponseMonitor {
    pub fn new(store: Arc<ParameterStore>, sample_rate: f64) -> Result<Self> {
        Ok(Self {
            store,
            analyzer: ResponseAnalyzer::new(sample_rate)?,
            magnitudes: Vec::new(),
            computed: false,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.analyzer.sample_rate()
    }

    /// Recompute from a fresh snapshot, unconditionally
    pub fn compute_response(&mut self, bins: usize) -> &[f64] {
        let settings = self.store.snapshot();
        self.magnitudes.resize(bins, 0.0);
        self.analyzer.compute_into(&settings, &mut self.magnitudes);
        self.computed = true;
        &self.magnitudes
    }

    /// Recompute only if the store changed or the resolution did
    ///
    /// The store's change flag is consumed here, so a store should feed at
    /// most one monitor.
    pub fn refresh(&mut self, bins: usize) -> Option<&[f64]> {
        let changed = self.store.take_changed();
        if !changed && self.computed && bins == self.magnitudes.len() {
            return None;
        }
        Some(self.compute_response(bins))
    }

    /// Last computed magnitudes (empty before the first computation)
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Last computed magnitudes paired with their frequencies
    pub fn curve(&self) -> ResponseCurve {
        ResponseCurve {
            sample_rate: self.sample_rate(),
            frequencies_hz: frequency_axis(self.magnitudes.len()),
            magnitudes_db: self.magnitudes.clone(),
        }
    }

    /// Publish a curve on every tick that saw a change
    ///
    /// Stops when `shutdown` turns true or its sender is dropped, or when a
    /// publish finds the receiving side gone. Returns the number of curves
    /// published. A full channel drops the curve; the next change supersedes
    /// it anyway.
    pub async fn run(
        mut self,
        interval: Duration,
        bins: usize,
        sender: Sender<ResponseCurve>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(?interval, bins, "Response monitor started");
        let mut published = 0;

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if self.refresh(bins).is_none() {
                continue;
            }

            match sender.try_send(self.curve()) {
                Ok(()) => {
                    published += 1;
                    trace!(published, "Response curve published");
                }
                Err(TrySendError::Full(_)) => {
                    debug!("Display is behind, dropping response curve");
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        info!(published, "Response monitor stopped");
        published
    }
}
