//! Pure parameter mapping from note events to synthesis and presentation
//! domains.
//!
//! Two independent projections of the same event: one into frequency and
//! amplitude for the oscillator bank, one into pixel-domain marker geometry
//! and style for the on-screen instrument. Both are stateless; the engines
//! decide when each projection is applied.

use super::{DeviceFamily, NoteEvent};

/// Converts a MIDI note number and per-note pitch bend to a frequency in Hz.
///
/// Standard equal-tempered mapping (A4 = 440 Hz at note 69) with the bend
/// added as a linear Hz offset scaled by 12. This is a deliberate
/// simplification of a true cents-based bend, kept for its characteristic
/// wide glide on keywave surfaces.
pub fn frequency_from_note(note: u8, pitch_bend: f32) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0) + pitch_bend * 12.0
}

/// Clamps a control value to the 0..1 range.
///
/// Mandatory on the synthesis amplitude path: controllers report pressure
/// slightly outside 0..1 and the gain stage must never see it raw. The
/// presentation opacity path intentionally does NOT use this.
pub fn limiter(output: f32) -> f32 {
    output.clamp(0.0, 1.0)
}

/// Fixed marker geometry, computed once when a note is first seen and kept
/// for the marker's whole life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerLayout {
    /// A keywave lane position on the Seaboard surface.
    Key {
        /// Horizontal position in px.
        left: f32,
    },
    /// A pad cell on the Lightpad grid.
    Pad {
        /// Horizontal position in px.
        left: f32,
        /// Vertical position in px, measured from the bottom edge.
        bottom: f32,
    },
}

/// Live marker style, overwritten on every event for the note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerStyle {
    /// Seaboard keywave style.
    Key {
        /// Vertical position in px (timbre sweeps the lane, pressure sinks it).
        top: f32,
        /// Blur radius in px.
        blur: f32,
        /// Uniform scale factor.
        scale: f32,
        /// Horizontal translation in px driven by pitch bend.
        shift_x: f32,
    },
    /// Lightpad pad style.
    Pad {
        /// Opacity; deliberately unclamped and may exceed 1.0.
        opacity: f32,
        /// Blur radius in px.
        blur: f32,
    },
}

impl MarkerStyle {
    /// Pressure-equivalent intensity of this style, used by the terminal
    /// renderer to pick a color weight.
    pub fn intensity(&self) -> f32 {
        match *self {
            MarkerStyle::Key { scale, .. } => scale - 1.0,
            MarkerStyle::Pad { opacity, .. } => (opacity - 0.35) / 0.65,
        }
    }
}

/// Seaboard key pitch in px within the 24-note repeating layout.
const KEY_PITCH: f32 = 30.0;

/// Lightpad cell pitch and gutter in px.
const PAD_PITCH: f32 = 75.0;
const PAD_GUTTER: f32 = 26.0;

/// Computes the fixed layout for a note on the given device family.
///
/// Returns `None` for unknown devices: their notes still sound but render
/// nothing, a routing decision rather than an error.
pub fn marker_layout(family: DeviceFamily, note: u8) -> Option<MarkerLayout> {
    match family {
        DeviceFamily::Seaboard => {
            let position = note % 24;
            // The surface repeats every 24 notes but has physical gaps where
            // no keywave exists; shift later notes past them.
            let offset = position
                + if position > 16 {
                    3
                } else if position > 11 {
                    2
                } else if position > 4 {
                    1
                } else {
                    0
                };
            Some(MarkerLayout::Key {
                left: 13.0 + (offset as f32 * KEY_PITCH) * 0.955,
            })
        }
        DeviceFamily::Lightpad => {
            let col = note % 4;
            let position = note % 60;
            let row = if position > 11 {
                3
            } else if position > 7 {
                2
            } else if position > 3 {
                1
            } else {
                0
            };
            Some(MarkerLayout::Pad {
                left: 12.0 + (PAD_PITCH + PAD_GUTTER) * col as f32,
                bottom: 12.0 + (PAD_PITCH + PAD_GUTTER) * row as f32,
            })
        }
        DeviceFamily::Unknown => None,
    }
}

/// Computes the live style for an event on the given device family.
pub fn marker_style(family: DeviceFamily, event: &NoteEvent) -> Option<MarkerStyle> {
    match family {
        DeviceFamily::Seaboard => Some(MarkerStyle::Key {
            top: 400.0 - 400.0 * event.timbre - 15.0 * (1.0 + event.pressure),
            blur: event.pressure,
            scale: 1.0 + event.pressure,
            shift_x: (800.0 / 50.0) * event.pitch_bend,
        }),
        DeviceFamily::Lightpad => Some(MarkerStyle::Pad {
            // No limiter here: the over-range glow when a pad is pressed
            // hard matches the hardware's own light response.
            opacity: 0.35 + 0.65 * event.pressure,
            blur: 5.0 * event.pressure,
        }),
        DeviceFamily::Unknown => None,
    }
}
