//! Fehlertypen der Sprach-Sitzung

use thiserror::Error;

use funkspruch_audio::AudioError;
use funkspruch_core::FunkError;

/// Fehler beim gestuften Start der Sitzung
///
/// Jede Variante benennt die Stufe, die gescheitert ist. Die Sitzung
/// bleibt danach fuer die gesamte Prozesslaufzeit deaktiviert.
#[derive(Debug, Error)]
pub enum InitFehler {
    #[error("Sprachmodul in der Konfiguration deaktiviert")]
    Deaktiviert,

    #[error("Netzwerk-Initialisierung fehlgeschlagen: {0}")]
    Netzwerk(#[source] FunkError),

    #[error("Codec-Initialisierung fehlgeschlagen: {0}")]
    Codec(#[source] AudioError),

    #[error("Audio-Initialisierung fehlgeschlagen: {0}")]
    Audio(#[source] AudioError),
}

/// Fehler beim Verbindungsaufbau zum Relay
#[derive(Debug, Error)]
pub enum VerbindungsFehler {
    #[error("Sitzung ist deaktiviert")]
    Deaktiviert,

    #[error(transparent)]
    Funk(#[from] FunkError),
}
