//! Fehlertypen fuer die Audio-Schicht

use thiserror::Error;

use funkspruch_protocol::codec::CodecConfigError;

/// Alle moeglichen Fehler der Audio-Schicht
///
/// `Opus` und `PufferZuKlein` tragen keine Strings, damit sie im
/// Echtzeit-Pfad ohne Allokation entstehen koennen.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Opus-Fehler: {0}")]
    Opus(#[from] audiopus::Error),

    #[error("Ungueltige Codec-Konfiguration: {0}")]
    Konfiguration(#[from] CodecConfigError),

    #[error("Ausgabepuffer zu klein: {0} Bytes")]
    PufferZuKlein(usize),
}

impl AudioError {
    /// Stream-Fehler aus einem beliebigen cpal-Fehler
    pub(crate) fn stream(e: impl std::fmt::Display) -> Self {
        Self::StreamFehler(e.to_string())
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
