//! Visual marker pool for on-screen note feedback.

pub mod engine;

pub use engine::{Marker, PresentationEngine};
