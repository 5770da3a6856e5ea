//! Real-time audio boundary
//!
//! This module provides:
//! - `ParameterStore`: per-field atomic parameter cells
//! - `EqProcessor`: two mono chains fed from one snapshot per block
//! - `ResponseMonitor`: display-side response refresh
//! - `AudioEngine`: a named audio thread exchanging blocks over channels

pub mod engine;
pub mod monitor;
pub mod param_store;
pub mod processor;

pub use engine::{AudioEngine, EngineStats, StereoBlock};
pub use monitor::ResponseMonitor;
pub use param_store::ParameterStore;
pub use processor::EqProcessor;
