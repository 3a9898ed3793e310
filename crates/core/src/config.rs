//! Modul-Konfiguration
//!
//! Wird vom Host aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass das Sprachmodul ohne Konfigurationsdatei
//! lauffaehig ist. Werte ausserhalb des gueltigen Bereichs werden beim
//! Laden begrenzt statt abgelehnt.

use serde::{Deserialize, Serialize};

use crate::error::{FunkError, Result};

/// Standard-Abstand des Relay-Ports zum Port des Spielservers
pub const STANDARD_RELAY_PORT_OFFSET: u16 = 1;

/// Vollstaendige Konfiguration des Sprachmoduls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Sprach-Einstellungen (Lautstaerke, Anzeige, Relay)
    pub voice: SprachEinstellungen,
    /// Geraete-Auswahl
    pub audio: GeraeteEinstellungen,
    /// Persistente Installations-Kennung
    pub identity: IdentitaetsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Sprach-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprachEinstellungen {
    /// Sprachmodul aktiviert
    pub enabled: bool,
    /// Ausgabe-Lautstaerke (0.0..=2.0, 1.0 = normal)
    pub output_volume: f32,
    /// Mikrofon-Verstaerkung (0.0..=4.0, 1.0 = unveraendert)
    pub input_gain: f32,
    /// Pegelanzeige einblenden
    pub show_meter: bool,
    /// Sprechanzeigen ueber Spielern einblenden
    pub show_indicators: bool,
    /// Abstand des Relay-Ports zum Spielserver-Port
    pub relay_port_offset: u16,
}

impl Default for SprachEinstellungen {
    fn default() -> Self {
        Self {
            enabled: true,
            output_volume: 1.0,
            input_gain: 1.0,
            show_meter: true,
            show_indicators: true,
            relay_port_offset: STANDARD_RELAY_PORT_OFFSET,
        }
    }
}

/// Geraete-Auswahl (leer = Systemstandard)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeraeteEinstellungen {
    /// Name (oder Namensteil) des Eingabegeraets
    pub input_device: String,
    /// Name (oder Namensteil) des Ausgabegeraets
    pub output_device: String,
}

impl GeraeteEinstellungen {
    /// Eingabegeraet als Option (leerer Name = Standardgeraet)
    pub fn input(&self) -> Option<&str> {
        non_empty(&self.input_device)
    }

    /// Ausgabegeraet als Option (leerer Name = Standardgeraet)
    pub fn output(&self) -> Option<&str> {
        non_empty(&self.output_device)
    }
}

/// Persistente Installations-Kennung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitaetsEinstellungen {
    /// Datei, in der die Kennung gespeichert wird
    pub file: String,
}

impl Default for IdentitaetsEinstellungen {
    fn default() -> Self {
        Self {
            file: "funkspruch.id".into(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl VoiceConfig {
    /// Parst eine Konfiguration aus einem TOML-String und begrenzt die Werte
    pub fn aus_toml(inhalt: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(inhalt)?;
        config.validieren()?;
        Ok(config)
    }

    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
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

    /// Begrenzt Lautstaerke und Verstaerkung und prueft die uebrigen Werte
    pub fn validieren(&mut self) -> Result<()> {
        self.voice.output_volume = clamp_finite(self.voice.output_volume, 0.0, 2.0, 1.0);
        self.voice.input_gain = clamp_finite(self.voice.input_gain, 0.0, 4.0, 1.0);

        if self.voice.relay_port_offset == 0 {
            return Err(FunkError::konfiguration(
                "relay_port_offset muss groesser als 0 sein",
            ));
        }
        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(FunkError::konfiguration(format!(
                "Unbekanntes Log-Level: {}",
                self.logging.level
            )));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(FunkError::konfiguration(format!(
                "Unbekanntes Log-Format: {}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn clamp_finite(wert: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if wert.is_finite() {
        wert.clamp(min, max)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let mut cfg = VoiceConfig::default();
        assert!(cfg.voice.enabled);
        assert_eq!(cfg.voice.relay_port_offset, 1);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [voice]
            output_volume = 0.5
            show_meter = false

            [audio]
            input_device = "USB"
        "#;
        let cfg = VoiceConfig::aus_toml(toml).unwrap();
        assert!((cfg.voice.output_volume - 0.5).abs() < f32::EPSILON);
        assert!(!cfg.voice.show_meter);
        assert_eq!(cfg.audio.input(), Some("USB"));
        assert_eq!(cfg.audio.output(), None);
        // Nicht angegebene Felder behalten Standardwerte
        assert!((cfg.voice.input_gain - 1.0).abs() < f32::EPSILON);
        assert_eq!(cfg.identity.file, "funkspruch.id");
    }

    #[test]
    fn werte_werden_begrenzt() {
        let toml = r#"
            [voice]
            output_volume = 9.0
            input_gain = -3.0
        "#;
        let cfg = VoiceConfig::aus_toml(toml).unwrap();
        assert!((cfg.voice.output_volume - 2.0).abs() < f32::EPSILON);
        assert!(cfg.voice.input_gain.abs() < f32::EPSILON);
    }

    #[test]
    fn relay_offset_null_abgelehnt() {
        let result = VoiceConfig::aus_toml("[voice]\nrelay_port_offset = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn unbekanntes_log_level_abgelehnt() {
        let result = VoiceConfig::aus_toml("[logging]\nlevel = \"verbose\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn ungueltiges_toml_ist_fehler() {
        let result = VoiceConfig::aus_toml("[voice\nenabled = ");
        assert!(matches!(result, Err(FunkError::KonfigurationParsen(_))));
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let cfg = VoiceConfig::laden("/nicht/vorhanden/funkspruch.toml").unwrap();
        assert_eq!(cfg, VoiceConfig::default());
    }
}
