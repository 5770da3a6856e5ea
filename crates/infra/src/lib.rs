//! Contour Infrastructure Layer
//!
//! Everything that crosses a thread boundary lives here: the lock-free
//! parameter store shared by the control and audio contexts, the stereo
//! processor driven by the audio thread, the response monitor driven by the
//! display timer, and a simulated audio engine thread.

pub mod audio;

pub use audio::*;
