//! funkspruch-protocol – Sprachprotokoll zwischen Client und Relay
//!
//! Dieses Crate definiert die binaeren UDP-Pakete und die festen
//! Codec-Parameter, auf die sich Client und Relay verlassen.

pub mod codec;
pub mod voice;

pub use codec::{SpeechCodecConfig, FRAME_DAUER_MS, FRAME_SAMPLES, SAMPLE_RATE};
pub use voice::{
    AudioPacket, AuthPacket, ClientPacket, DebugPacket, KeepalivePacket, PacketError,
    PacketResult, PacketType, RelayAudioPacket, TeamUpdatePacket, MAX_DATAGRAMM_LAENGE,
    MAX_NUTZDATEN_LAENGE,
};
