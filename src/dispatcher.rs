//! Batch routing from the input adapter to both engines.
//!
//! The dispatcher receives one decoded note-event batch per input tick and
//! forwards it to the synthesis and presentation engines iff the device
//! link is connected and open. Batches arriving over a dead link are
//! dropped outright: the stream is continuous, so buffering stale
//! expression data would only replay a disconnected instrument.

use crate::audio::SynthesisEngine;
use crate::mpe::{NoteEvent, PortStatus};
use crate::render::PresentationEngine;
use std::time::Instant;

/// Player configuration, consumed at initialization.
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    /// Oscillator waveform for new voices.
    pub wave_shape: crate::audio::WaveShape,
    /// Verbose per-event logging.
    pub debug: bool,
    /// Maintain a JSON dump of the current batch for the debug pane.
    pub debug_pane: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            wave_shape: crate::audio::WaveShape::default(),
            debug: false,
            debug_pane: true,
        }
    }
}

/// Routes note-event batches to the synthesis and presentation engines.
pub struct Dispatcher {
    options: PlayerOptions,
    port: PortStatus,
    audio: SynthesisEngine,
    visual: PresentationEngine,
    /// Pretty-printed JSON of the last non-empty batch, for the debug pane.
    debug_text: String,
}

impl Dispatcher {
    /// Creates a dispatcher with no device attached.
    pub fn new(options: PlayerOptions, audio: SynthesisEngine) -> Self {
        Self {
            options,
            port: PortStatus::disconnected(),
            audio,
            visual: PresentationEngine::new(),
            debug_text: String::new(),
        }
    }

    /// Updates the device/port state. Written only by the input adapter.
    pub fn set_port(&mut self, port: PortStatus) {
        if port != self.port {
            tracing::info!(name = %port.name, ?port.state, ?port.connection, "port state changed");
        }
        self.port = port;
    }

    /// Current device/port state.
    pub fn port(&self) -> &PortStatus {
        &self.port
    }

    /// Routes one tick's batch to both engines.
    ///
    /// Dropped without side effects when the link is not live. Within a
    /// batch the order of distinct notes is not significant; a duplicate
    /// note number resolves to its last observed value.
    pub fn dispatch(&mut self, batch: &[NoteEvent], now: Instant) {
        if !self.port.is_live() {
            if !batch.is_empty() {
                tracing::trace!(events = batch.len(), "dropping batch, link not live");
            }
            return;
        }

        let family = self.port.family();
        for event in batch {
            if self.options.debug {
                tracing::debug!(
                    note = event.note_number,
                    bend = event.pitch_bend,
                    pressure = event.pressure,
                    timbre = event.timbre,
                    "note event"
                );
            }
            self.audio.apply(event, now);
            self.visual.apply(family, event, now);
        }

        if self.options.debug_pane {
            self.debug_text = if batch.is_empty() {
                String::new()
            } else {
                serde_json::to_string_pretty(batch).unwrap_or_default()
            };
        }
    }

    /// Advances both engines' release timelines.
    ///
    /// Called every loop iteration so voices and markers are torn down even
    /// when no batches arrive at all.
    pub fn tick(&mut self, now: Instant) {
        self.audio.reap(now);
        self.visual.reap(now);
    }

    /// The synthesis engine (read access for the UI and tests).
    pub fn audio(&self) -> &SynthesisEngine {
        &self.audio
    }

    /// The presentation engine (read access for the UI and tests).
    pub fn visual(&self) -> &PresentationEngine {
        &self.visual
    }

    /// JSON dump of the last non-empty batch, empty when idle.
    pub fn debug_text(&self) -> &str {
        &self.debug_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WaveShape;
    use crate::mpe::{DeviceFamily, MarkerLayout, PortConnection, PortState};
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            PlayerOptions::default(),
            SynthesisEngine::headless(WaveShape::Sine),
        )
    }

    #[test]
    fn test_batches_dropped_without_live_link() {
        let mut dispatcher = dispatcher();
        let batch = [NoteEvent::new(60, 0.0, 0.5, 0.5)];
        let t0 = Instant::now();

        // No port at all.
        dispatcher.dispatch(&batch, t0);
        assert_eq!(dispatcher.audio().active_voices(), 0);
        assert_eq!(dispatcher.visual().visible_markers(), 0);

        // Disconnected device.
        let mut port = PortStatus::connected("Seaboard BLOCK");
        port.state = PortState::Disconnected;
        dispatcher.set_port(port);
        dispatcher.dispatch(&batch, t0);
        assert_eq!(dispatcher.audio().active_voices(), 0);

        // Connected but closed port.
        let mut port = PortStatus::connected("Seaboard BLOCK");
        port.connection = PortConnection::Closed;
        dispatcher.set_port(port);
        dispatcher.dispatch(&batch, t0);
        assert_eq!(dispatcher.audio().active_voices(), 0);
        assert_eq!(dispatcher.visual().visible_markers(), 0);
    }

    #[test]
    fn test_end_to_end_seaboard_scenario() {
        let mut dispatcher = dispatcher();
        dispatcher.set_port(PortStatus::connected("Seaboard BLOCK"));
        let t0 = Instant::now();

        dispatcher.dispatch(&[NoteEvent::new(60, 0.0, 0.5, 0.5)], t0);

        let frequency = dispatcher.audio().voice_frequency(60).unwrap();
        assert!((frequency - 440.0 * 2f32.powf(-9.0 / 12.0)).abs() < 1e-3);
        assert_eq!(dispatcher.audio().voice_gain(60), Some(0.5));

        let marker = dispatcher.visual().marker(60).unwrap();
        assert_eq!(
            marker.layout,
            MarkerLayout::Key {
                left: 13.0 + 14.0 * 30.0 * 0.955
            }
        );
    }

    #[test]
    fn test_unknown_device_sounds_but_renders_nothing() {
        let mut dispatcher = dispatcher();
        let port = PortStatus::connected("Some Other Controller");
        assert_eq!(port.family(), DeviceFamily::Unknown);
        dispatcher.set_port(port);

        dispatcher.dispatch(&[NoteEvent::new(60, 0.0, 0.5, 0.5)], Instant::now());

        assert_eq!(dispatcher.audio().active_voices(), 1);
        assert_eq!(dispatcher.visual().visible_markers(), 0);
    }

    #[test]
    fn test_sustained_note_lifecycle() {
        let mut dispatcher = dispatcher();
        dispatcher.set_port(PortStatus::connected("Lightpad BLOCK"));
        let t0 = Instant::now();

        dispatcher.dispatch(&[NoteEvent::new(48, 0.0, 0.6, 0.3)], t0);
        let id = dispatcher.audio().voice_id(48).unwrap();

        // Refreshed every 50ms for one second: always present, same voice.
        for step in 1..=20u64 {
            let now = t0 + Duration::from_millis(step * 50);
            dispatcher.tick(now);
            dispatcher.dispatch(&[NoteEvent::new(48, 0.0, 0.6, 0.3)], now);
            assert_eq!(dispatcher.audio().voice_id(48), Some(id));
            assert_eq!(dispatcher.visual().visible_markers(), 1);
        }

        // Stream stops: both pools converge to absent after the timeout.
        dispatcher.tick(t0 + Duration::from_millis(1100));
        assert_eq!(dispatcher.audio().active_voices(), 0);
        assert_eq!(dispatcher.visual().visible_markers(), 0);
    }

    #[test]
    fn test_duplicate_key_in_batch_takes_last_value() {
        let mut dispatcher = dispatcher();
        dispatcher.set_port(PortStatus::connected("Lightpad BLOCK"));

        dispatcher.dispatch(
            &[
                NoteEvent::new(60, 0.0, 0.2, 0.0),
                NoteEvent::new(60, 0.0, 0.8, 0.0),
            ],
            Instant::now(),
        );

        assert_eq!(dispatcher.audio().active_voices(), 1);
        assert_eq!(dispatcher.audio().voice_gain(60), Some(0.8));
    }

    #[test]
    fn test_debug_pane_dump() {
        let mut dispatcher = dispatcher();
        dispatcher.set_port(PortStatus::connected("Seaboard BLOCK"));
        let t0 = Instant::now();

        dispatcher.dispatch(&[NoteEvent::new(60, 0.0, 0.5, 0.5)], t0);
        assert!(dispatcher.debug_text().contains("\"noteNumber\": 60"));

        // An empty batch clears the dump.
        dispatcher.dispatch(&[], t0);
        assert!(dispatcher.debug_text().is_empty());
    }
}
