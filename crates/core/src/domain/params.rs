//! Parameter layout and the per-block parameter snapshot
//!
//! The engine declares its seven controls here, with their ranges, defaults
//! and display units. The store that owns the live values (see
//! `contour-infra`) enforces these ranges; the engine itself never clamps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest frequency any band can be tuned to (Hz)
pub const MIN_FREQUENCY: f32 = 20.0;
/// Highest frequency any band can be tuned to (Hz)
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Number of engine parameters
pub const PARAM_COUNT: usize = 7;

/// Skew applied to frequency ranges so the low end gets finer resolution
const FREQUENCY_SKEW: f32 = 0.25;

const SLOPE_LABELS: [&str; 4] = ["12 dB/Oct", "24 dB/Oct", "36 dB/Oct", "48 dB/Oct"];

// ============================================================================
// SLOPE
// ============================================================================

/// Steepness of a cut band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Choice index, 0 for 12 dB/Oct up to 3 for 48 dB/Oct
    pub fn index(self) -> usize {
        match self {
            Slope::Db12 => 0,
            Slope::Db24 => 1,
            Slope::Db36 => 2,
            Slope::Db48 => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map a raw choice value as held by the parameter store.
    ///
    /// The store only ever holds whole indices in `0..=3`; the mapping is
    /// total so the audio path has no failure case.
    pub fn from_choice(value: f32) -> Self {
        match value.round() as i32 {
            i32::MIN..=0 => Slope::Db12,
            1 => Slope::Db24,
            2 => Slope::Db36,
            _ => Slope::Db48,
        }
    }

    pub fn db_per_octave(self) -> u32 {
        12 * (self.index() as u32 + 1)
    }

    /// Number of cascade sections enabled at this slope
    pub fn active_sections(self) -> usize {
        self.index() + 1
    }

    /// Order of the Butterworth prototype realizing this slope
    pub fn butterworth_order(self) -> usize {
        2 * (self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        SLOPE_LABELS[self.index()]
    }
}

impl fmt::Display for Slope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// RANGES
// ============================================================================

/// Continuous range with optional snapping interval and skew
///
/// `skew < 1` spends more of the normalized range on the low end, which is
/// how frequency controls get their logarithmic feel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    /// Snapping interval, 0 for continuous
    pub step: f32,
    pub skew: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, step: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            step,
            skew,
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Snap to the nearest interval step, then clamp
    pub fn snap(&self, value: f32) -> f32 {
        let snapped = if self.step > 0.0 {
            self.min + ((value - self.min) / self.step).round() * self.step
        } else {
            value
        };
        self.clamp(snapped)
    }

    /// Plain value to 0..1 proportion
    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = (self.clamp(value) - self.min) / (self.max - self.min);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// 0..1 proportion to snapped plain value
    pub fn from_normalized(&self, proportion: f32) -> f32 {
        let mut proportion = proportion.clamp(0.0, 1.0);
        if self.skew != 1.0 && proportion > 0.0 {
            proportion = (proportion.ln() / self.skew).exp();
        }
        self.snap(self.min + (self.max - self.min) * proportion)
    }
}

// ============================================================================
// PARAMETER LAYOUT
// ============================================================================

/// The seven controls of the equalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamId {
    LowCutFreq,
    LowCutSlope,
    HighCutFreq,
    HighCutSlope,
    PeakFreq,
    PeakGain,
    PeakQuality,
}

/// Declared metadata for one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub range: ParamRange,
    pub default: f32,
    pub unit: &'static str,
    /// Labels for choice parameters, indexed by plain value
    pub choices: Option<&'static [&'static str]>,
}

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::LowCutFreq,
        ParamId::LowCutSlope,
        ParamId::HighCutFreq,
        ParamId::HighCutSlope,
        ParamId::PeakFreq,
        ParamId::PeakGain,
        ParamId::PeakQuality,
    ];

    /// Position in `ALL`, used as a storage slot
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name shown to the user
    pub fn name(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "LowCut Freq",
            ParamId::LowCutSlope => "LowCut Slope",
            ParamId::HighCutFreq => "HiCut Freq",
            ParamId::HighCutSlope => "HiCut Slope",
            ParamId::PeakFreq => "Peak Freq",
            ParamId::PeakGain => "Peak Gain",
            ParamId::PeakQuality => "Peak Quality",
        }
    }

    /// Stable machine key, as accepted by `FromStr`
    pub fn key(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "low-cut-freq",
            ParamId::LowCutSlope => "low-cut-slope",
            ParamId::HighCutFreq => "high-cut-freq",
            ParamId::HighCutSlope => "high-cut-slope",
            ParamId::PeakFreq => "peak-freq",
            ParamId::PeakGain => "peak-gain",
            ParamId::PeakQuality => "peak-quality",
        }
    }

    pub fn spec(self) -> ParamSpec {
        let frequency = ParamRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, FREQUENCY_SKEW);
        let slope = ParamRange::new(0.0, 3.0, 1.0, 1.0);

        let (range, default, unit, choices) = match self {
            ParamId::LowCutFreq => (frequency, MIN_FREQUENCY, "Hz", None),
            ParamId::HighCutFreq => (frequency, MAX_FREQUENCY, "Hz", None),
            ParamId::LowCutSlope | ParamId::HighCutSlope => {
                (slope, 0.0, "dB/Oct", Some(&SLOPE_LABELS[..]))
            }
            ParamId::PeakFreq => (frequency, 750.0, "Hz", None),
            ParamId::PeakGain => (ParamRange::new(-24.0, 24.0, 0.5, 1.0), 0.0, "dB", None),
            ParamId::PeakQuality => (ParamRange::new(0.1, 10.0, 0.05, 1.0), 1.0, "", None),
        };

        ParamSpec {
            id: self,
            range,
            default,
            unit,
            choices,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ParamId::ALL
            .into_iter()
            .find(|id| id.key() == s || id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown parameter: {s}"))
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable read of every control, taken once per block or display refresh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub low_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub high_cut_freq: f32,
    pub high_cut_slope: Slope,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_q: f32,
}

impl ChainSettings {
    /// Build a snapshot from raw store values, indexed by `ParamId::index`
    pub fn from_values(values: &[f32; PARAM_COUNT]) -> Self {
        Self {
            low_cut_freq: values[ParamId::LowCutFreq.index()],
            low_cut_slope: Slope::from_choice(values[ParamId::LowCutSlope.index()]),
            high_cut_freq: values[ParamId::HighCutFreq.index()],
            high_cut_slope: Slope::from_choice(values[ParamId::HighCutSlope.index()]),
            peak_freq: values[ParamId::PeakFreq.index()],
            peak_gain_db: values[ParamId::PeakGain.index()],
            peak_q: values[ParamId::PeakQuality.index()],
        }
    }

    /// Plain value of one field; slopes report their choice index
    pub fn value(&self, id: ParamId) -> f32 {
        match id {
            ParamId::LowCutFreq => self.low_cut_freq,
            ParamId::LowCutSlope => self.low_cut_slope.index() as f32,
            ParamId::HighCutFreq => self.high_cut_freq,
            ParamId::HighCutSlope => self.high_cut_slope.index() as f32,
            ParamId::PeakFreq => self.peak_freq,
            ParamId::PeakGain => self.peak_gain_db,
            ParamId::PeakQuality => self.peak_q,
        }
    }

    pub fn values(&self) -> [f32; PARAM_COUNT] {
        ParamId::ALL.map(|id| self.value(id))
    }

    /// Every field inside its declared range
    pub fn is_within_domain(&self) -> bool {
        ParamId::ALL
            .into_iter()
            .all(|id| id.spec().range.contains(self.value(id)))
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self::from_values(&ParamId::ALL.map(|id| id.spec().default))
    }
}
