//! funkspruch-core – Gemeinsame Typen, Konfiguration und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! Funkspruch-Crates gemeinsam genutzt werden: Peer-Slots, Teams,
//! Sprachkanaele, die Modul-Konfiguration und die Installations-Kennung.

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use config::VoiceConfig;
pub use error::{FunkError, Result};
pub use identity::InstallId;
pub use types::{PeerSlot, SenderId, Team, VoiceChannel, MAX_PEERS};
