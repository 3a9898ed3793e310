//! Codec-Konfiguration fuer die Sprachuebertragung
//!
//! Abtastrate und Frame-Dauer sind fest: beide Seiten rechnen mit 20 ms
//! Frames bei 48 kHz. Einstellbar sind nur Bitrate, Komplexitaet und DTX.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Abtastrate in Hz (Opus-Vollband)
pub const SAMPLE_RATE: u32 = 48_000;

/// Frame-Dauer in Millisekunden
pub const FRAME_DAUER_MS: u32 = 20;

/// Samples pro Kanal und Frame (48 kHz * 20 ms)
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE * FRAME_DAUER_MS / 1000) as usize;

/// Opus-Anwendungsmodus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    /// Optimiert fuer Sprachverstaendlichkeit
    #[default]
    Voip,
    /// Optimiert fuer allgemeine Audio-Qualitaet
    Audio,
    /// Minimale Verarbeitungsverzoegerung
    RestrictedLowdelay,
}

/// Ungueltige Codec-Parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecConfigError {
    #[error("Bitrate muss zwischen 6 und 510 kbps liegen (war: {0})")]
    Bitrate(u16),
    #[error("Komplexitaet muss zwischen 0 und 10 liegen (war: {0})")]
    Komplexitaet(u8),
}

/// Encoder-Parameter fuer ausgehende Sprache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechCodecConfig {
    /// Ziel-Bitrate in kbps (6–510)
    pub bitrate_kbps: u16,
    /// Komplexitaet (0–10, niedrig gehalten damit das Spiel nicht leidet)
    pub complexity: u8,
    /// Discontinuous Transmission (Stille wird kaum uebertragen)
    pub dtx_enabled: bool,
    /// Anwendungsmodus
    pub application: OpusApplication,
}

impl Default for SpeechCodecConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 24,
            complexity: 3,
            dtx_enabled: true,
            application: OpusApplication::Voip,
        }
    }
}

impl SpeechCodecConfig {
    /// Validiert die Konfiguration
    pub fn validieren(&self) -> Result<(), CodecConfigError> {
        if !(6..=510).contains(&self.bitrate_kbps) {
            return Err(CodecConfigError::Bitrate(self.bitrate_kbps));
        }
        if self.complexity > 10 {
            return Err(CodecConfigError::Komplexitaet(self.complexity));
        }
        Ok(())
    }

    /// Bitrate in Bit pro Sekunde
    pub fn bitrate_bps(&self) -> i32 {
        self.bitrate_kbps as i32 * 1000
    }
}
