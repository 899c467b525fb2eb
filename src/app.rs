//! Application state and event handling.
//!
//! The app plays the role of the external input adapter: it simulates an
//! MPE instrument with the computer keyboard, owns the device/port state,
//! and hands decoded note-event batches to the dispatcher once per tick.
//! Terminal key auto-repeat keeps held notes refreshed, so releasing a key
//! lets the engines' 100ms debounce tear the note down naturally.

use crate::audio::SynthesisEngine;
use crate::dispatcher::{Dispatcher, PlayerOptions};
use crate::error::DeviceError;
use crate::mpe::{NoteEvent, PortConnection, PortState, PortStatus};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// Expression adjustment step per key press.
const EXPRESSION_STEP: f32 = 0.1;

/// Keyboard key to MIDI note mapping for the computer keyboard.
/// Uses a piano-like layout on QWERTY keyboards.
pub const KEYBOARD_MAP: [(char, u8); 25] = [
    // Lower row (Z-M) = C3 to B3
    ('z', 48), // C3
    ('s', 49), // C#3
    ('x', 50), // D3
    ('d', 51), // D#3
    ('c', 52), // E3
    ('v', 53), // F3
    ('g', 54), // F#3
    ('b', 55), // G3
    ('h', 56), // G#3
    ('n', 57), // A3
    ('j', 58), // A#3
    ('m', 59), // B3
    // Upper row (Q-U) = C4 to B4
    ('q', 60), // C4 (Middle C)
    ('2', 61), // C#4
    ('w', 62), // D4
    ('3', 63), // D#4
    ('e', 64), // E4
    ('r', 65), // F4
    ('5', 66), // F#4
    ('t', 67), // G4
    ('6', 68), // G#4
    ('y', 69), // A4
    ('7', 70), // A#4
    ('u', 71), // B4
    ('i', 72), // C5
];

/// Simulated device names cycled with Tab.
///
/// The third entry matches neither presentation family, demonstrating the
/// audio-only path for unknown controllers.
pub const DEVICE_PRESETS: [&str; 3] = ["Seaboard BLOCK", "Lightpad BLOCK", "Generic MPE Pad"];

/// Main application state.
pub struct App {
    /// Routes batches to the synthesis and presentation engines.
    pub dispatcher: Dispatcher,
    /// Events collected since the last pump.
    pending: Vec<NoteEvent>,
    /// Pressure applied to newly played notes. Deliberately allowed past
    /// 1.0 so the limiter/opacity asymmetry is visible from the keyboard.
    pub pressure: f32,
    /// Timbre (slide position) applied to newly played notes.
    pub timbre: f32,
    /// Pitch bend applied to newly played notes.
    pub pitch_bend: f32,
    /// Octave shift applied to the keyboard map.
    pub octave_offset: i8,
    /// Index into `DEVICE_PRESETS` for the simulated device.
    device_index: usize,
    /// Whether the debug pane is visible.
    pub show_debug: bool,
    /// Transient status message and when it was set.
    status: Option<(String, Instant)>,
    /// Set when the user asks to exit.
    pub should_quit: bool,
}

impl App {
    /// Creates the app with the first device preset connected and open.
    pub fn new(options: PlayerOptions, audio: SynthesisEngine) -> Self {
        let show_debug = options.debug_pane;
        let mut dispatcher = Dispatcher::new(options, audio);
        dispatcher.set_port(PortStatus::connected(DEVICE_PRESETS[0]));

        Self {
            dispatcher,
            pending: Vec::new(),
            pressure: 0.5,
            timbre: 0.5,
            pitch_bend: 0.0,
            octave_offset: 0,
            device_index: 0,
            show_debug,
            status: None,
            should_quit: false,
        }
    }

    /// Handles a key press from the terminal.
    pub fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.cycle_device(),
            KeyCode::Char('a') => self.toggle_connected(),
            KeyCode::Char('o') => self.toggle_open(),
            KeyCode::Char('p') => self.show_debug = !self.show_debug,
            KeyCode::Char('[') => self.adjust_pressure(-EXPRESSION_STEP),
            KeyCode::Char(']') => self.adjust_pressure(EXPRESSION_STEP),
            KeyCode::Char('k') => self.adjust_timbre(-EXPRESSION_STEP),
            KeyCode::Char('l') => self.adjust_timbre(EXPRESSION_STEP),
            KeyCode::Left => self.adjust_bend(-EXPRESSION_STEP),
            KeyCode::Right => self.adjust_bend(EXPRESSION_STEP),
            KeyCode::Down => self.pitch_bend = 0.0,
            KeyCode::Char(',') => self.octave_offset = (self.octave_offset - 1).max(-2),
            KeyCode::Char('.') => self.octave_offset = (self.octave_offset + 1).min(3),
            KeyCode::Char(ch) => self.on_note_key(ch),
            _ => {}
        }
    }

    /// Queues a note event if the character maps to a note.
    fn on_note_key(&mut self, ch: char) {
        let base = KEYBOARD_MAP
            .iter()
            .find(|(k, _)| *k == ch.to_ascii_lowercase())
            .map(|(_, note)| *note);

        if let Some(base) = base {
            let note = base as i16 + self.octave_offset as i16 * 12;
            if (0..=127).contains(&note) {
                self.pending.push(NoteEvent::new(
                    note as u8,
                    self.pitch_bend,
                    self.pressure,
                    self.timbre,
                ));
            }
        }
    }

    fn adjust_pressure(&mut self, delta: f32) {
        self.pressure = (self.pressure + delta).clamp(0.0, 1.2);
        self.set_status(format!("Pressure: {:.1}", self.pressure));
    }

    fn adjust_timbre(&mut self, delta: f32) {
        self.timbre = (self.timbre + delta).clamp(0.0, 1.0);
        self.set_status(format!("Timbre: {:.1}", self.timbre));
    }

    fn adjust_bend(&mut self, delta: f32) {
        self.pitch_bend = (self.pitch_bend + delta).clamp(-1.0, 1.0);
        self.set_status(format!("Pitch bend: {:+.1}", self.pitch_bend));
    }

    /// Switches the simulated device to the next preset.
    fn cycle_device(&mut self) {
        self.device_index = (self.device_index + 1) % DEVICE_PRESETS.len();
        let name = DEVICE_PRESETS[self.device_index];
        let current = self.dispatcher.port().clone();
        self.dispatcher.set_port(PortStatus {
            name: name.to_string(),
            ..current
        });
        self.set_status(format!("Device: {}", name));
    }

    /// Toggles device presence, as if the instrument were unplugged.
    fn toggle_connected(&mut self) {
        let mut port = self.dispatcher.port().clone();
        port.state = match port.state {
            PortState::Connected => PortState::Disconnected,
            PortState::Disconnected => PortState::Connected,
        };
        self.announce_port(port);
    }

    /// Toggles port usability while the device stays attached.
    fn toggle_open(&mut self) {
        let mut port = self.dispatcher.port().clone();
        port.connection = match port.connection {
            PortConnection::Open => PortConnection::Closed,
            PortConnection::Closed => PortConnection::Open,
        };
        self.announce_port(port);
    }

    /// Installs a new port state and surfaces the matching advisory.
    fn announce_port(&mut self, port: PortStatus) {
        let message = if port.is_live() {
            format!("{} connected", port.name)
        } else if port.state == PortState::Connected {
            // Connected-but-closed is the one state worth an advisory: the
            // device is present but unusable until manually restarted.
            DeviceError::PortClosed(port.name.clone()).to_string()
        } else {
            "Device disconnected".to_string()
        };
        self.dispatcher.set_port(port);
        self.set_status(message);
    }

    /// Delivers the tick's batch and advances the release timelines.
    ///
    /// Duplicate note numbers collected within the tick collapse to their
    /// last observed value before dispatch, keeping batches key-unique.
    pub fn pump(&mut self, now: Instant) {
        let batch = self.drain_batch();
        self.dispatcher.dispatch(&batch, now);
        self.dispatcher.tick(now);
    }

    /// Drains pending events into a batch with unique note numbers.
    fn drain_batch(&mut self) -> Vec<NoteEvent> {
        let mut batch: Vec<NoteEvent> = Vec::with_capacity(self.pending.len());
        for event in self.pending.drain(..) {
            if let Some(existing) = batch
                .iter_mut()
                .find(|e| e.note_number == event.note_number)
            {
                *existing = event;
            } else {
                batch.push(event);
            }
        }
        batch
    }

    /// Sets a transient status message.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    /// Clears the status message once it has been shown long enough.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, since)) = self.status {
            if since.elapsed() > STATUS_TIMEOUT {
                self.status = None;
            }
        }
    }

    /// Current status message, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(message, _)| message.as_str())
    }

    /// Name of the simulated device.
    pub fn device_name(&self) -> &str {
        DEVICE_PRESETS[self.device_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WaveShape;
    use crossterm::event::KeyModifiers;

    fn app() -> App {
        App::new(
            PlayerOptions::default(),
            SynthesisEngine::headless(WaveShape::Sine),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_note_key_reaches_engines() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q')); // Middle C
        app.pump(Instant::now());

        assert_eq!(app.dispatcher.audio().active_voices(), 1);
        assert!(app.dispatcher.audio().voice_id(60).is_some());
        assert_eq!(app.dispatcher.visual().visible_markers(), 1);
    }

    #[test]
    fn test_octave_offset_shifts_notes() {
        let mut app = app();
        press(&mut app, KeyCode::Char('.'));
        press(&mut app, KeyCode::Char('q'));
        app.pump(Instant::now());

        assert!(app.dispatcher.audio().voice_id(72).is_some());
        assert!(app.dispatcher.audio().voice_id(60).is_none());
    }

    #[test]
    fn test_duplicate_presses_collapse_to_one_event() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        app.adjust_pressure(EXPRESSION_STEP); // 0.6
        press(&mut app, KeyCode::Char('q'));
        app.pump(Instant::now());

        assert_eq!(app.dispatcher.audio().active_voices(), 1);
        // Last observed value for the tick wins.
        let gain = app.dispatcher.audio().voice_gain(60).unwrap();
        assert!((gain - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_disconnect_gates_dispatch() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a')); // unplug
        press(&mut app, KeyCode::Char('q'));
        app.pump(Instant::now());

        assert_eq!(app.dispatcher.audio().active_voices(), 0);
        assert_eq!(app.status(), Some("Device disconnected"));
    }

    #[test]
    fn test_closed_port_surfaces_advisory() {
        let mut app = app();
        press(&mut app, KeyCode::Char('o'));

        assert!(!app.dispatcher.port().is_live());
        let status = app.status().unwrap();
        assert!(status.contains("restart the device"));

        // Reopening resumes routing.
        press(&mut app, KeyCode::Char('o'));
        press(&mut app, KeyCode::Char('q'));
        app.pump(Instant::now());
        assert_eq!(app.dispatcher.audio().active_voices(), 1);
    }

    #[test]
    fn test_cycle_device_keeps_connection_state() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.device_name(), "Lightpad BLOCK");
        assert!(app.dispatcher.port().is_live());

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.device_name(), "Generic MPE Pad");
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.device_name(), "Seaboard BLOCK");
    }

    #[test]
    fn test_pressure_can_exceed_one_for_demo() {
        let mut app = app();
        for _ in 0..10 {
            press(&mut app, KeyCode::Char(']'));
        }
        assert!(app.pressure > 1.0);
        assert!(app.pressure <= 1.2);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
