//! Device-session error taxonomy.
//!
//! Every variant is terminal to the session from the core's perspective:
//! the player never retries access or reconnects on its own. If recovery is
//! wanted it belongs to the input adapter that owns the device.

use thiserror::Error;

/// Errors surfaced by the input-device side of a session.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The host has no MIDI input support at all. Fatal to this instance;
    /// there is nothing to retry.
    #[error("MIDI input is not supported on this host")]
    Unsupported,

    /// Requesting access to MIDI devices failed. Surfaced once, not
    /// retried automatically.
    #[error("access to MIDI devices was denied: {0}")]
    AccessDenied(String),

    /// The device reports connected but its port is closed. Surfaced as an
    /// advisory; a manual device restart is the only recovery.
    #[error("'{0}' is connected but its port is closed; restart the device to resume")]
    PortClosed(String),
}
