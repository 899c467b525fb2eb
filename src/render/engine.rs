//! Presentation engine for the marker pool.
//!
//! Mirrors the synthesis engine's lifecycle for visual markers: a marker is
//! created the first time a note number is seen, its live style is
//! overwritten on every event, and it is removed once its release deadline
//! passes. The pool and its deadlines are fully independent of the audio
//! side; an audio tail may outlive its marker or vice versa, but both
//! converge to absent under the same no-event rule.

use crate::mpe::{marker_layout, marker_style, DeviceFamily, MarkerLayout, MarkerStyle, NoteEvent};
use crate::mpe::RELEASE_TIMEOUT;
use crate::pool::VoicePool;
use std::time::Instant;

/// One on-screen element bound to a single note identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    /// Fixed geometry, computed once when the note is first seen.
    pub layout: MarkerLayout,
    /// Live style, overwritten on every event.
    pub style: MarkerStyle,
}

/// The presentation engine: one marker per visible note.
pub struct PresentationEngine {
    pool: VoicePool<Marker>,
}

impl Default for PresentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationEngine {
    /// Creates an engine with an empty marker pool.
    pub fn new() -> Self {
        Self {
            pool: VoicePool::new(RELEASE_TIMEOUT),
        }
    }

    /// Applies one note event for the given device family.
    ///
    /// Unknown families produce no marker at all; the note still sounds on
    /// the audio side. An existing marker keeps its initial layout and only
    /// takes the fresh live style.
    pub fn apply(&mut self, family: DeviceFamily, event: &NoteEvent, now: Instant) {
        let style = match marker_style(family, event) {
            Some(style) => style,
            None => return,
        };
        // Layout exists whenever style does; both are None only for Unknown.
        let layout = match marker_layout(family, event.note_number) {
            Some(layout) => layout,
            None => return,
        };

        let marker = self
            .pool
            .upsert(event.note_number, now, || Marker { layout, style });
        marker.style = style;
    }

    /// Removes every marker whose deadline has passed.
    pub fn reap(&mut self, now: Instant) {
        for (note, _) in self.pool.sweep(now) {
            tracing::debug!(note, "removing marker");
        }
    }

    /// Returns the marker for a note, if one is on screen.
    pub fn marker(&self, note: u8) -> Option<&Marker> {
        self.pool.get(note)
    }

    /// Number of markers currently on screen.
    pub fn visible_markers(&self) -> usize {
        self.pool.len()
    }

    /// Iterates over on-screen markers in arbitrary order.
    pub fn markers(&self) -> impl Iterator<Item = (u8, &Marker)> {
        self.pool.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_marker_created_for_known_family() {
        let mut engine = PresentationEngine::new();
        let t0 = Instant::now();

        engine.apply(DeviceFamily::Seaboard, &NoteEvent::new(60, 0.0, 0.5, 0.5), t0);

        assert_eq!(engine.visible_markers(), 1);
        let marker = engine.marker(60).unwrap();
        assert_eq!(
            marker.layout,
            MarkerLayout::Key {
                left: 13.0 + 14.0 * 30.0 * 0.955
            }
        );
        match marker.style {
            MarkerStyle::Key { top, .. } => assert_eq!(top, 177.5),
            other => panic!("expected key style, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_family_is_a_noop() {
        let mut engine = PresentationEngine::new();
        engine.apply(
            DeviceFamily::Unknown,
            &NoteEvent::new(60, 0.0, 0.5, 0.5),
            Instant::now(),
        );
        assert_eq!(engine.visible_markers(), 0);
    }

    #[test]
    fn test_layout_computed_once_style_updated() {
        let mut engine = PresentationEngine::new();
        let t0 = Instant::now();

        engine.apply(DeviceFamily::Lightpad, &NoteEvent::new(5, 0.0, 0.2, 0.0), t0);
        let initial_layout = engine.marker(5).unwrap().layout;

        // A later event with different params must not re-derive the layout.
        engine.apply(
            DeviceFamily::Lightpad,
            &NoteEvent::new(5, 0.5, 0.9, 1.0),
            t0 + Duration::from_millis(20),
        );

        assert_eq!(engine.visible_markers(), 1);
        let marker = engine.marker(5).unwrap();
        assert_eq!(marker.layout, initial_layout);
        match marker.style {
            MarkerStyle::Pad { opacity, blur } => {
                assert_eq!(opacity, 0.35 + 0.65 * 0.9);
                assert_eq!(blur, 4.5);
            }
            other => panic!("expected pad style, got {:?}", other),
        }
    }

    #[test]
    fn test_marker_debounce_and_removal() {
        let mut engine = PresentationEngine::new();
        let t0 = Instant::now();

        engine.apply(DeviceFamily::Seaboard, &NoteEvent::new(60, 0.0, 0.5, 0.5), t0);
        engine.apply(
            DeviceFamily::Seaboard,
            &NoteEvent::new(60, 0.0, 0.5, 0.5),
            t0 + Duration::from_millis(50),
        );

        engine.reap(t0 + Duration::from_millis(100));
        assert_eq!(engine.visible_markers(), 1);

        engine.reap(t0 + Duration::from_millis(200));
        assert_eq!(engine.visible_markers(), 0);
    }
}
