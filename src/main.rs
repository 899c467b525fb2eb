//! mpetui - A terminal-based MPE player and visualizer.
//!
//! Connect an MPE-style expressive note stream and play some music. Each
//! active note drives one oscillator voice (pitch bend and pressure mapped
//! to frequency and gain) and one on-screen marker laid out for the
//! connected device family.
//!
//! The bundled input adapter simulates an instrument with the computer
//! keyboard: hold a note key and terminal auto-repeat keeps the note
//! alive; release it and the voice decays out of the pool 100ms later.
//!
//! # Usage
//!
//! ```bash
//! cargo run                     # sine voices, Seaboard layout
//! cargo run -- --wave saw       # pick an oscillator waveform
//! cargo run -- --no-audio       # visuals only
//! ```

mod app;
mod audio;
mod dispatcher;
mod error;
mod mpe;
mod pool;
mod render;
mod ui;

use app::App;
use audio::{SynthesisEngine, WaveShape};
use dispatcher::PlayerOptions;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

/// Command-line options for the application.
struct CliOptions {
    /// Player configuration handed to the dispatcher.
    player: PlayerOptions,
    /// Run without opening an audio output device.
    no_audio: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--wave <shape>` or `-w <shape>`: oscillator waveform
    /// - `--debug` or `-d`: verbose per-event logging
    /// - `--no-debug-pane`: start with the event pane hidden
    /// - `--no-audio`: skip audio output entirely
    /// - `--help` or `-h`: print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut player = PlayerOptions::default();
        let mut no_audio = false;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--wave" | "-w" => {
                    i += 1;
                    if i >= args.len() {
                        eprintln!("Error: --wave requires a shape argument");
                        std::process::exit(1);
                    }
                    player.wave_shape = match args[i].parse::<WaveShape>() {
                        Ok(shape) => shape,
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    };
                }
                "--debug" | "-d" => player.debug = true,
                "--no-debug-pane" => player.debug_pane = false,
                "--no-audio" => no_audio = true,
                "--help" | "-h" => {
                    eprintln!("mpetui - Terminal MPE player and visualizer");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS]",
                        args.first().unwrap_or(&"mpetui".to_string())
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -w, --wave SHAPE   Oscillator waveform: sine, square, saw, triangle");
                    eprintln!("  -d, --debug        Log every note event (RUST_LOG=debug)");
                    eprintln!("      --no-debug-pane  Start with the event pane hidden");
                    eprintln!("      --no-audio     Run without audio output");
                    eprintln!("  -h, --help         Print this help message");
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        Ok(Self { player, no_audio })
    }
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Open audio output, falling back to a headless engine so the visual
    // path still runs on hosts without a playback device.
    let engine = if cli.no_audio {
        SynthesisEngine::headless(cli.player.wave_shape)
    } else {
        match SynthesisEngine::new(cli.player.wave_shape) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!("Audio unavailable, continuing without sound: {:#}", e);
                SynthesisEngine::headless(cli.player.wave_shape)
            }
        }
    };

    let mut app = App::new(cli.player, engine);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    // Handle any errors from the main loop
    result
}

/// Puts the terminal into raw mode on the alternate screen.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
///
/// Every iteration is one input tick: collect key events into the pending
/// batch, dispatch it, and advance the release timelines. The 16ms poll
/// keeps voice teardown close to its 100ms deadline.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.clear_expired_status();

        // Draw UI
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with a short timeout so reaping stays timely
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Auto-repeat arrives as Press on most terminals and as
                    // Repeat where the enhanced keyboard protocol is active.
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat {
                        app.on_key(key);
                    }
                }
                _ => {}
            }
        }

        // Deliver this tick's batch and sweep expired voices/markers
        app.pump(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}
