//! Contour core: the filter-chain engine of a three-band parametric equalizer
//!
//! Everything in this crate is free of I/O on the audio path. Thread-shared
//! parameter storage and the audio/display drivers live in `contour-infra`.

pub mod domain;

pub use domain::*;
