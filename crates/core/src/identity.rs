//! Persistente Installations-Kennung
//!
//! Jede Installation meldet sich beim Relay mit einer festen Kennung aus
//! 32 Hex-Zeichen (UUID v4 ohne Bindestriche). Die Kennung wird beim ersten
//! Start erzeugt und in einer Datei abgelegt.

use std::path::Path;

use uuid::Uuid;

use crate::error::{FunkError, Result};

/// Laenge der Kennung in Zeichen (ohne Null-Terminator)
pub const KENNUNG_LAENGE: usize = 32;

/// Installations-Kennung (32 ASCII-Hex-Zeichen, Kleinbuchstaben)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallId(String);

impl InstallId {
    /// Erzeugt eine neue zufaellige Kennung
    pub fn generieren() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parst und validiert eine gespeicherte Kennung
    pub fn parsen(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.len() != KENNUNG_LAENGE || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FunkError::UngueltigeKennung(text.to_string()));
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    /// Laedt die Kennung aus `pfad` oder erzeugt und speichert eine neue.
    ///
    /// Eine unlesbare oder ungueltige Datei wird ueberschrieben.
    pub fn laden_oder_erzeugen(pfad: impl AsRef<Path>) -> Result<Self> {
        let pfad = pfad.as_ref();
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => match Self::parsen(&inhalt) {
                Ok(id) => return Ok(id),
                Err(e) => {
                    tracing::warn!(pfad = %pfad.display(), fehler = %e, "Kennung ungueltig, erzeuge neue");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FunkError::Io(e)),
        }

        let id = Self::generieren();
        std::fs::write(pfad, id.as_str())?;
        tracing::info!(pfad = %pfad.display(), "Neue Installations-Kennung gespeichert");
        Ok(id)
    }

    /// Wie [`laden_oder_erzeugen`](Self::laden_oder_erzeugen), faellt bei
    /// Fehlern aber auf eine fluechtige Kennung zurueck
    pub fn laden_oder_fluechtig(pfad: impl AsRef<Path>) -> Self {
        Self::laden_oder_erzeugen(pfad.as_ref()).unwrap_or_else(|e| {
            tracing::warn!(fehler = %e, "Kennung nicht speicherbar, verwende fluechtige Kennung");
            Self::generieren()
        })
    }

    /// Gibt die Kennung als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Gibt die Kennung als Bytes zurueck (ohne Null-Terminator)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for InstallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generierte_kennung_ist_gueltig() {
        let id = InstallId::generieren();
        assert_eq!(id.as_str().len(), KENNUNG_LAENGE);
        assert!(InstallId::parsen(id.as_str()).is_ok());
    }

    #[test]
    fn parsen_lehnt_falsche_laenge_ab() {
        assert!(InstallId::parsen("abc").is_err());
        assert!(InstallId::parsen(&"a".repeat(33)).is_err());
    }

    #[test]
    fn parsen_lehnt_nicht_hex_ab() {
        assert!(InstallId::parsen(&"z".repeat(32)).is_err());
    }

    #[test]
    fn parsen_normalisiert_grossbuchstaben() {
        let id = InstallId::parsen(&"ABCDEF0123456789".repeat(2)).unwrap();
        assert_eq!(id.as_str(), "abcdef0123456789abcdef0123456789");
    }

    #[test]
    fn kennung_bleibt_ueber_neustarts_erhalten() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let pfad = dir.path().join("funkspruch.id");

        let erste = InstallId::laden_oder_erzeugen(&pfad).unwrap();
        let zweite = InstallId::laden_oder_erzeugen(&pfad).unwrap();
        assert_eq!(erste, zweite);
    }

    #[test]
    fn kaputte_datei_wird_ersetzt() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let pfad = dir.path().join("funkspruch.id");
        std::fs::write(&pfad, "kaputt").unwrap();

        let id = InstallId::laden_oder_erzeugen(&pfad).unwrap();
        let gespeichert = std::fs::read_to_string(&pfad).unwrap();
        assert_eq!(gespeichert, id.as_str());
    }

    #[test]
    fn fluechtig_bei_unschreibbarem_pfad() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let pfad = dir.path().join("gibt/es/nicht/funkspruch.id");
        let id = InstallId::laden_oder_fluechtig(&pfad);
        assert_eq!(id.as_str().len(), KENNUNG_LAENGE);
    }
}
