//! Domain entities and filter-design rules

pub mod audio;
pub mod chain;
pub mod config;
pub mod design;
pub mod dsp;
pub mod params;
pub mod response;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioError, ProcessSpec};
pub use chain::{ChainPosition, CutFilter, MonoChain, MAX_CUT_SECTIONS};
pub use config::{ConfigError, ContourConfig, DisplayConfig, EngineConfig};
pub use design::CutCoefficients;
pub use dsp::{db_to_gain, gain_to_db, BiquadCoeffs, BiquadSection, Effect};
pub use params::{ChainSettings, ParamId, ParamRange, ParamSpec, Slope};
pub use response::{ResponseAnalyzer, ResponseCurve};
