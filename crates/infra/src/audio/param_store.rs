//! Lock-free parameter store
//!
//! Each of the seven parameters lives in its own cache-padded `AtomicU32`
//! holding the bits of an `f32`. Writers (control context) clamp and snap
//! before storing; readers (audio and display contexts) take a snapshot with
//! one relaxed load per field.
//!
//! A snapshot is atomic per field but not across fields, so a block may see
//! a mix of old and new values for a single block. The next block catches up.

use contour_core::domain::params::PARAM_COUNT;
use contour_core::domain::{ChainSettings, ParamId};
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, warn};

/// Shared parameter values, safe to read from the audio thread
pub struct ParameterStore {
    /// One cell per `ParamId::index`, padded to prevent false sharing
    values: [CachePadded<AtomicU32>; PARAM_COUNT],

    /// Set on every write, cleared by the display refresh
    changed: CachePadded<AtomicBool>,
}

impl ParameterStore {
    /// Store holding every parameter's declared default
    pub fn new() -> Self {
        Self {
            values: ParamId::ALL
                .map(|id| CachePadded::new(AtomicU32::new(id.spec().default.to_bits()))),
            changed: CachePadded::new(AtomicBool::new(true)),
        }
    }

    /// Store initialized from a snapshot (values still pass through `set`)
    pub fn with_settings(settings: &ChainSettings) -> Self {
        let store = Self::new();
        store.apply(settings);
        store
    }

    /// Write a plain value, returning what was actually stored
    ///
    /// Out-of-range values are clamped and snapped to the parameter's step.
    /// Non-finite values are rejected in favour of the default.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let spec = id.spec();
        let stored = if value.is_finite() {
            let snapped = spec.range.snap(value);
            if !spec.range.contains(value) {
                debug!(
                    param = id.key(),
                    requested = value,
                    stored = snapped,
                    "Clamped parameter write"
                );
            }
            snapped
        } else {
            warn!(param = id.key(), requested = value, "Rejected non-finite parameter write");
            spec.default
        };

        self.values[id.index()].store(stored.to_bits(), Ordering::Relaxed);
        self.changed.store(true, Ordering::Release);
        stored
    }

    /// Write a 0..1 normalized value (host automation style)
    pub fn set_normalized(&self, id: ParamId, proportion: f32) -> f32 {
        if !proportion.is_finite() {
            warn!(param = id.key(), proportion, "Rejected non-finite normalized write");
            return self.set(id, id.spec().default);
        }
        self.set(id, id.spec().range.from_normalized(proportion))
    }

    /// Current plain value
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Current value as a 0..1 proportion
    pub fn get_normalized(&self, id: ParamId) -> f32 {
        id.spec().range.to_normalized(self.get(id))
    }

    /// Read every field once; safe on the audio thread
    #[inline]
    pub fn snapshot(&self) -> ChainSettings {
        ChainSettings::from_values(&ParamId::ALL.map(|id| self.get(id)))
    }

    /// Write every field of a snapshot
    pub fn apply(&self, settings: &ChainSettings) {
        for id in ParamId::ALL {
            self.set(id, settings.value(id));
        }
    }

    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.set(id, id.spec().default);
        }
        debug!("Parameters reset to defaults");
    }

    /// Whether anything was written since the last call
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("settings", &self.snapshot())
            .finish()
    }
}
