//! Host-Konfiguration
//!
//! Eine TOML-Datei fuer alles: die Abschnitte des Sprachmoduls
//! (`[voice]`, `[audio]`, `[identity]`, `[logging]`) plus `[host]` und
//! `[codec]`. Fehlt die Datei, gelten die Standardwerte.

use serde::{Deserialize, Serialize};

use funkspruch_core::{FunkError, VoiceConfig};
use funkspruch_protocol::SpeechCodecConfig;

/// Vollstaendige Host-Konfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Konfiguration des Sprachmoduls
    #[serde(flatten)]
    pub funk: VoiceConfig,
    /// Simulierter Spielzustand
    pub host: HostEinstellungen,
    /// Encoder-Parameter
    pub codec: SpeechCodecConfig,
}

/// Simulierter Spielzustand des Headless-Hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostEinstellungen {
    /// Adresse des Spielservers (leer = nicht verbunden)
    pub server_address: String,
    /// Eigene Client-Nummer
    pub client_num: u32,
    /// Eigenes Team
    pub team: u8,
    /// Abstand zwischen zwei Ticks in Millisekunden
    pub tick_ms: u64,
    /// Bekannte Mitspieler (fuer voice_mute)
    pub players: Vec<Spieler>,
}

impl Default for HostEinstellungen {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:27960".into(),
            client_num: 0,
            team: 1,
            tick_ms: 20,
            players: Vec::new(),
        }
    }
}

/// Name und Slot eines Mitspielers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spieler {
    pub name: String,
    pub slot: u8,
}

impl HostConfig {
    /// Parst und prueft eine Konfiguration
    pub fn aus_toml(inhalt: &str) -> Result<Self, FunkError> {
        let mut config: Self = toml::from_str(inhalt)?;
        config.validieren()?;
        Ok(config)
    }

    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self, FunkError> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(FunkError::Io(e)),
        }
    }

    pub fn validieren(&mut self) -> Result<(), FunkError> {
        self.funk.validieren()?;
        self.codec
            .validieren()
            .map_err(|e| FunkError::konfiguration(e.to_string()))?;
        self.host.tick_ms = self.host.tick_ms.clamp(5, 100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardwerte() {
        let config = HostConfig::default();
        assert!(config.funk.voice.enabled);
        assert_eq!(config.host.server_address, "127.0.0.1:27960");
        assert_eq!(config.host.tick_ms, 20);
        assert_eq!(config.codec.bitrate_kbps, 24);
    }

    #[test]
    fn vollstaendige_datei() {
        let toml = r#"
            [voice]
            enabled = true
            output_volume = 0.5
            relay_port_offset = 2

            [audio]
            input_device = "USB"

            [logging]
            level = "debug"

            [host]
            server_address = "10.0.0.5:27960"
            client_num = 4
            team = 2
            players = [
                { name = "Hans", slot = 3 },
                { name = "Big Bob", slot = 12 },
            ]

            [codec]
            bitrate_kbps = 32
        "#;
        let config = HostConfig::aus_toml(toml).unwrap();
        assert_eq!(config.funk.voice.output_volume, 0.5);
        assert_eq!(config.funk.voice.relay_port_offset, 2);
        assert_eq!(config.funk.audio.input(), Some("USB"));
        assert_eq!(config.funk.logging.level, "debug");
        assert_eq!(config.host.client_num, 4);
        assert_eq!(config.host.players.len(), 2);
        assert_eq!(config.host.players[1].slot, 12);
        assert_eq!(config.codec.bitrate_kbps, 32);
        assert_eq!(config.codec.complexity, 3);
    }

    #[test]
    fn tick_wird_begrenzt() {
        let config = HostConfig::aus_toml("[host]\ntick_ms = 1000\n").unwrap();
        assert_eq!(config.host.tick_ms, 100);
    }

    #[test]
    fn ungueltige_bitrate_ist_fehler() {
        assert!(HostConfig::aus_toml("[codec]\nbitrate_kbps = 2\n").is_err());
    }

    #[test]
    fn fehlende_datei_ergibt_standard() {
        let config = HostConfig::laden("/nicht/vorhanden/funkspruch.toml").unwrap();
        assert_eq!(config, HostConfig::default());
    }
}
