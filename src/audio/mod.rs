//! Audio engine for expressive note synthesis.
//!
//! This module provides real-time oscillator synthesis with audio output
//! via rodio. Each sounding note owns one oscillator voice; frequency and
//! gain snap to freshly mapped values on every incoming event.

pub mod engine;

pub use engine::{SynthesisEngine, VoiceId, WaveShape};
