//! mpetui - A terminal-based MPE player and visualizer.
//!
//! This library provides the voice lifecycle engine for expressive
//! polyphonic note streams: allocation, parameter mapping, and debounced
//! release for both synthesizer voices and on-screen markers.

pub mod app;
pub mod audio;
pub mod dispatcher;
pub mod error;
pub mod mpe;
pub mod pool;
pub mod render;
pub mod ui;

// Re-export commonly used types
pub use audio::{SynthesisEngine, VoiceId, WaveShape};
pub use dispatcher::{Dispatcher, PlayerOptions};
pub use error::DeviceError;
pub use mpe::{DeviceFamily, NoteEvent, PortStatus, RELEASE_TIMEOUT};
pub use render::{Marker, PresentationEngine};
