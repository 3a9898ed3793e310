//! funkspruch-voice – Sprach-Sitzung des Spielclients
//!
//! Verbindet Audio-Schicht und Protokoll zu einer Sitzung, die das Spiel
//! einmal pro Frame antreibt.
//!
//! ## Module
//! - [`session`] – Zustandsmaschine, gestufter Start, Tick
//! - [`transmit`] – Sendepfad im Capture-Callback
//! - [`mix`] – Mischpfad im Playback-Callback
//! - [`jitter_buffer`] – SPSC-Ring pro Peer
//! - [`peers`] – Decoder, Sequenzpruefung, Anwesenheit, Stummschaltung
//! - [`transport`] – Nicht-blockierender UDP-Socket zum Relay
//! - [`state`] – Atomics zwischen Hauptthread und Audio-Threads
//! - [`commands`] – Konsolenbefehle
//! - [`host`] – Schnittstelle zum Spiel

pub mod commands;
pub mod error;
pub mod host;
pub mod jitter_buffer;
pub mod mix;
pub mod peers;
pub mod session;
pub mod state;
pub mod transmit;
pub mod transport;

pub use commands::{ausfuehren, parse_command, CommandError, VoiceCommand};
pub use error::{InitFehler, VerbindungsFehler};
pub use host::GameHost;
pub use peers::{PeerPresence, PeerStatistik};
pub use session::{Session, SessionConfig, VoiceStatus, KEEPALIVE_INTERVALL};
pub use state::VoiceState;
pub use transport::relay_adresse;
