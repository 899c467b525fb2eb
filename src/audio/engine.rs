//! Synthesis engine for the voice pool.
//!
//! Owns one oscillator voice per sounding note. Voices are created lazily
//! on the first event for a note number, refreshed (frequency and gain
//! snapped to the newly mapped values) on every subsequent event, and torn
//! down once the release deadline passes without a refresh.
//!
//! The oscillator bank is shared with the rodio playback thread behind a
//! mutex; everything else is owned by the engine on the main timeline.

use crate::mpe::{frequency_from_note, limiter, NoteEvent, RELEASE_TIMEOUT};
use crate::pool::VoicePool;
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Global counter for generating unique voice IDs.
static VOICE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an oscillator voice.
///
/// A note keeps the same ID from creation to release, so a continuously
/// refreshed note is observably one voice rather than a series of restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

impl VoiceId {
    /// Generates a new unique voice ID.
    fn new() -> Self {
        Self(VOICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value (for logging/debugging).
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Oscillator waveform, selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl WaveShape {
    /// Evaluates one cycle of the waveform at `phase` in [0, 1).
    fn sample(self, phase: f32) -> f32 {
        match self {
            WaveShape::Sine => (std::f32::consts::TAU * phase).sin(),
            WaveShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Sawtooth => 2.0 * phase - 1.0,
            WaveShape::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

impl FromStr for WaveShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sine" => Ok(WaveShape::Sine),
            "square" => Ok(WaveShape::Square),
            "saw" | "sawtooth" => Ok(WaveShape::Sawtooth),
            "triangle" => Ok(WaveShape::Triangle),
            other => Err(format!(
                "unknown wave shape '{}' (expected sine, square, saw, or triangle)",
                other
            )),
        }
    }
}

/// One sounding oscillator plus its gain stage.
struct Oscillator {
    shape: WaveShape,
    frequency: f32,
    gain: f32,
    /// Current position within the waveform cycle, in [0, 1).
    phase: f32,
}

impl Oscillator {
    fn new(shape: WaveShape) -> Self {
        Self {
            shape,
            frequency: 110.0,
            gain: 0.0,
            phase: 0.0,
        }
    }

    /// Produces the next sample and advances the phase.
    fn next_sample(&mut self) -> f32 {
        let sample = self.shape.sample(self.phase) * self.gain;
        self.phase = (self.phase + self.frequency / SAMPLE_RATE as f32).rem_euclid(1.0);
        sample
    }
}

/// The pool of sounding oscillators, shared with the audio thread.
///
/// Parameter updates and removal for a voice that has already been torn
/// down are no-ops, never faults.
#[derive(Default)]
struct OscillatorBank {
    voices: HashMap<VoiceId, Oscillator>,
}

impl OscillatorBank {
    /// Allocates and starts a new oscillator, returning its handle.
    fn create(&mut self, shape: WaveShape) -> VoiceId {
        let id = VoiceId::new();
        self.voices.insert(id, Oscillator::new(shape));
        id
    }

    fn set_frequency(&mut self, id: VoiceId, frequency: f32) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.frequency = frequency;
        }
    }

    fn set_gain(&mut self, id: VoiceId, gain: f32) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.gain = gain;
        }
    }

    /// Stops and deallocates a voice.
    fn remove(&mut self, id: VoiceId) {
        self.voices.remove(&id);
    }

    fn frequency_of(&self, id: VoiceId) -> Option<f32> {
        self.voices.get(&id).map(|v| v.frequency)
    }

    fn gain_of(&self, id: VoiceId) -> Option<f32> {
        self.voices.get(&id).map(|v| v.gain)
    }

    fn len(&self) -> usize {
        self.voices.len()
    }

    /// Renders one buffer of summed voices into the stereo buffers.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);
        for voice in self.voices.values_mut() {
            for i in 0..left.len() {
                let sample = voice.next_sample();
                left[i] += sample;
                right[i] += sample;
            }
        }
    }
}

/// Audio source that generates samples from the oscillator bank.
/// Implements rodio's Source trait for playback.
struct BankSource {
    /// The shared oscillator bank.
    bank: Arc<Mutex<OscillatorBank>>,
    /// Left channel buffer.
    left_buf: Vec<f32>,
    /// Right channel buffer.
    right_buf: Vec<f32>,
    /// Current position in the buffer.
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl BankSource {
    fn new(bank: Arc<Mutex<OscillatorBank>>) -> Self {
        Self {
            bank,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for BankSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        // Render a new buffer when we've exhausted the current one
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut bank) = self.bank.lock() {
                bank.render(&mut self.left_buf, &mut self.right_buf);
            } else {
                // Only fill with silence if we can't get the lock
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        // Advance to next channel/sample
        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for BankSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// The synthesis engine: one oscillator voice per sounding note.
///
/// Per-voice lifecycle: nonexistent until the first event for a note
/// number, active while events keep arriving, released once the deadline
/// passes without one. Any event while active re-arms the deadline.
pub struct SynthesisEngine {
    /// The oscillator bank (wrapped for sharing with the audio thread).
    bank: Arc<Mutex<OscillatorBank>>,
    /// Maps sounding note numbers to their voice handles.
    pool: VoicePool<VoiceId>,
    /// Waveform for newly created voices.
    shape: WaveShape,
    /// Audio output stream (must be kept alive). None when headless.
    _stream: Option<OutputStream>,
    /// Audio output handle for playback.
    _stream_handle: Option<OutputStreamHandle>,
}

impl SynthesisEngine {
    /// Creates an engine with live audio output.
    ///
    /// # Errors
    ///
    /// Returns an error if no audio output device is available or playback
    /// cannot be started.
    pub fn new(shape: WaveShape) -> Result<Self> {
        let bank = Arc::new(Mutex::new(OscillatorBank::default()));

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = BankSource::new(Arc::clone(&bank));
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        Ok(Self {
            bank,
            pool: VoicePool::new(RELEASE_TIMEOUT),
            shape,
            _stream: Some(stream),
            _stream_handle: Some(stream_handle),
        })
    }

    /// Creates an engine with no audio output.
    ///
    /// Voice lifecycle and parameter mapping behave identically; only the
    /// playback thread is absent. Used in tests and as the fallback when
    /// the host has no output device.
    pub fn headless(shape: WaveShape) -> Self {
        Self {
            bank: Arc::new(Mutex::new(OscillatorBank::default())),
            pool: VoicePool::new(RELEASE_TIMEOUT),
            shape,
            _stream: None,
            _stream_handle: None,
        }
    }

    /// Applies one note event: creates the voice if this note number is
    /// new, then snaps frequency and gain to the freshly mapped values.
    ///
    /// No ramps: expressive controllers stream updates continuously, so
    /// smoothing happens at the source and a scheduled glide would only
    /// fight the next event.
    pub fn apply(&mut self, event: &NoteEvent, now: Instant) {
        let frequency = frequency_from_note(event.note_number, event.pitch_bend);
        let gain = limiter(event.pressure);
        let shape = self.shape;

        if let Ok(mut bank) = self.bank.lock() {
            let id = *self
                .pool
                .upsert(event.note_number, now, || bank.create(shape));
            bank.set_frequency(id, frequency);
            bank.set_gain(id, gain);
        }
    }

    /// Releases every voice whose deadline has passed.
    pub fn reap(&mut self, now: Instant) {
        let expired = self.pool.sweep(now);
        if expired.is_empty() {
            return;
        }
        if let Ok(mut bank) = self.bank.lock() {
            for (note, id) in expired {
                tracing::debug!(note, voice = id.as_u64(), "releasing voice");
                bank.remove(id);
            }
        }
    }

    /// Returns the voice handle for a sounding note, if any.
    pub fn voice_id(&self, note: u8) -> Option<VoiceId> {
        self.pool.get(note).copied()
    }

    /// Number of currently sounding voices.
    pub fn active_voices(&self) -> usize {
        self.pool.len()
    }

    /// Current frequency of a sounding note's oscillator.
    pub fn voice_frequency(&self, note: u8) -> Option<f32> {
        let id = self.voice_id(note)?;
        self.bank.lock().ok()?.frequency_of(id)
    }

    /// Current gain of a sounding note's gain stage.
    pub fn voice_gain(&self, note: u8) -> Option<f32> {
        let id = self.voice_id(note)?;
        self.bank.lock().ok()?.gain_of(id)
    }

    /// Number of oscillators alive in the bank (tracks the pool).
    pub fn bank_size(&self) -> usize {
        self.bank.lock().map(|bank| bank.len()).unwrap_or(0)
    }
}
