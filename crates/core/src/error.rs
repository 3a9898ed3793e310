//! Fehlertypen fuer Funkspruch
//!
//! Zentraler Fehler-Enum fuer Konfiguration, Identitaet und Verbindung.
//! Die uebrigen Crates definieren eigene Fehler und konvertieren bei Bedarf.

use thiserror::Error;

/// Globaler Result-Alias fuer Funkspruch
pub type Result<T> = std::result::Result<T, FunkError>;

/// Alle Fehler, die ausserhalb des Echtzeit-Pfads auftreten koennen
#[derive(Debug, Error)]
pub enum FunkError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Adresse nicht aufloesbar: {0}")]
    Adresse(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Konfigurationsdatei ungueltig: {0}")]
    KonfigurationParsen(#[from] toml::de::Error),

    // --- Identitaet ---
    #[error("Ungueltige Installations-Kennung: {0}")]
    UngueltigeKennung(String),

    // --- Ein-/Ausgabe ---
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl FunkError {
    /// Erstellt einen Konfigurationsfehler aus einer beliebigen Nachricht
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler das Netzwerk betrifft
    pub fn ist_netzwerkfehler(&self) -> bool {
        matches!(self, Self::Verbindung(_) | Self::Adresse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = FunkError::Adresse("nirgendwo:27960".into());
        assert_eq!(e.to_string(), "Adresse nicht aufloesbar: nirgendwo:27960");
    }

    #[test]
    fn netzwerkfehler_erkennung() {
        assert!(FunkError::Verbindung("test".into()).ist_netzwerkfehler());
        assert!(FunkError::Adresse("test".into()).ist_netzwerkfehler());
        assert!(!FunkError::konfiguration("test").ist_netzwerkfehler());
    }

    #[test]
    fn io_fehler_konvertierung() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "weg");
        let e: FunkError = io.into();
        assert!(e.to_string().starts_with("IO-Fehler"));
    }
}
