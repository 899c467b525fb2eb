//! MPE data structures for representing expressive note streams.
//!
//! This module provides the core types for per-note expression events,
//! the simulated device/port state, and the device family resolution used
//! to pick a presentation layout.

mod mapper;

pub use mapper::{
    frequency_from_note, limiter, marker_layout, marker_style, MarkerLayout, MarkerStyle,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a voice or marker survives without a refreshing event.
///
/// MPE controllers report every active note continuously, so silence for a
/// key is interpreted as note-off rather than requiring an explicit event.
pub const RELEASE_TIMEOUT: Duration = Duration::from_millis(100);

/// One active note's identity and continuous parameters for a single tick.
///
/// Events are produced fresh each input tick and are not owned long-term;
/// `note_number` is the stable key correlating events, voices, and markers
/// across ticks. Serialized as camelCase to match the upstream MPE note
/// object shape in the debug dump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// MIDI note number (0-127). Unique within a single batch.
    pub note_number: u8,

    /// Per-note pitch bend, roughly -1..1 from the controller.
    pub pitch_bend: f32,

    /// Per-note pressure (aftertouch), conceptually 0..1 but unclamped
    /// at the source.
    pub pressure: f32,

    /// Per-note timbre (slide position), conceptually 0..1.
    pub timbre: f32,
}

impl NoteEvent {
    /// Creates an event with the given identity and expression values.
    pub fn new(note_number: u8, pitch_bend: f32, pressure: f32, timbre: f32) -> Self {
        Self {
            note_number,
            pitch_bend,
            pressure,
            timbre,
        }
    }
}

/// Physical-layout family of the connected controller, resolved once from
/// the port name and then matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// Keywave-style surface, 24-note repeating layout ("Seaboard BLOCK").
    Seaboard,
    /// 4x4 pad grid ("Lightpad BLOCK").
    Lightpad,
    /// Anything else. Audio still plays; nothing is rendered.
    Unknown,
}

impl DeviceFamily {
    /// Resolves the family from a raw port name.
    ///
    /// Matches the exact device names after trimming whitespace, the same
    /// comparison the devices themselves advertise over Web MIDI.
    pub fn from_port_name(name: &str) -> Self {
        match name.trim() {
            "Seaboard BLOCK" => DeviceFamily::Seaboard,
            "Lightpad BLOCK" => DeviceFamily::Lightpad,
            _ => DeviceFamily::Unknown,
        }
    }
}

/// Whether the device itself is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Connected,
    Disconnected,
}

/// Whether the device's port is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortConnection {
    Open,
    Closed,
}

/// Snapshot of the connected device's port, written only by the input
/// adapter and read by the dispatcher to decide routing.
#[derive(Debug, Clone, PartialEq)]
pub struct PortStatus {
    /// Port name as advertised by the device.
    pub name: String,
    /// Device presence.
    pub state: PortState,
    /// Port usability.
    pub connection: PortConnection,
}

impl PortStatus {
    /// Creates a status for a connected, open port with the given name.
    pub fn connected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: PortState::Connected,
            connection: PortConnection::Open,
        }
    }

    /// Creates a status representing no usable device.
    pub fn disconnected() -> Self {
        Self {
            name: String::new(),
            state: PortState::Disconnected,
            connection: PortConnection::Closed,
        }
    }

    /// True when events from this port should reach the engines.
    pub fn is_live(&self) -> bool {
        self.state == PortState::Connected && self.connection == PortConnection::Open
    }

    /// Resolves the presentation family for this port.
    pub fn family(&self) -> DeviceFamily {
        DeviceFamily::from_port_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_port_name() {
        assert_eq!(
            DeviceFamily::from_port_name("Seaboard BLOCK"),
            DeviceFamily::Seaboard
        );
        assert_eq!(
            DeviceFamily::from_port_name("  Lightpad BLOCK "),
            DeviceFamily::Lightpad
        );
        assert_eq!(
            DeviceFamily::from_port_name("USB Keystation"),
            DeviceFamily::Unknown
        );
        assert_eq!(DeviceFamily::from_port_name(""), DeviceFamily::Unknown);
    }

    #[test]
    fn test_port_liveness() {
        let mut port = PortStatus::connected("Seaboard BLOCK");
        assert!(port.is_live());
        assert_eq!(port.family(), DeviceFamily::Seaboard);

        port.connection = PortConnection::Closed;
        assert!(!port.is_live());

        assert!(!PortStatus::disconnected().is_live());
    }

    #[test]
    fn test_note_event_serializes_camel_case() {
        let event = NoteEvent::new(60, 0.0, 0.5, 0.5);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"noteNumber\":60"));
        assert!(json.contains("\"pitchBend\""));
    }
}
