//! Audio-Backend-Abstraktion
//!
//! Die Sitzung kennt nur diese Traits. `CpalBackend` verbindet sie mit der
//! echten Hardware, Tests setzen ein geskriptetes Backend ein.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::StreamTrait;
use cpal::Stream;
use tracing::{info, warn};

use crate::capture::open_capture_stream;
use crate::device::{load_cpal_input_device, load_cpal_output_device};
use crate::error::{AudioError, AudioResult};
use crate::frame::{MonoFrame, StereoFrame};
use crate::playback::open_playback_stream;

/// Empfaengt jeden vollstaendigen Mikrofon-Frame (Echtzeit-Thread)
///
/// Implementierungen duerfen weder allokieren noch sperren noch loggen.
pub trait FrameSink: Send + 'static {
    fn capture_frame(&mut self, frame: &MonoFrame);
}

/// Liefert jeden Wiedergabe-Frame (Echtzeit-Thread)
///
/// Muss `frame` immer vollstaendig beschreiben.
pub trait FrameSource: Send + 'static {
    fn fill_frame(&mut self, frame: &mut StereoFrame);
}

/// Laufende Streams; Drop beendet sie
pub trait ActiveStreams {
    /// Gibt es eine Aufnahme? (sonst nur Zuhoeren)
    fn has_capture(&self) -> bool;

    /// Anzahl der vom Treiber gemeldeten Stream-Fehler
    fn stream_errors(&self) -> u32;
}

/// Oeffnet Aufnahme und Wiedergabe
pub trait AudioBackend {
    /// Startet die Streams
    ///
    /// Fehlt die Wiedergabe, ist das ein Fehler. Fehlt die Aufnahme, laufen
    /// die Streams ohne sie weiter (`has_capture() == false`).
    fn open(
        &mut self,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
    ) -> AudioResult<Box<dyn ActiveStreams>>;
}

/// Backend fuer die System-Audiogeraete via cpal
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    input: Option<String>,
    output: Option<String>,
}

impl CpalBackend {
    /// `None` waehlt jeweils das Standardgeraet
    pub fn new(input: Option<&str>, output: Option<&str>) -> Self {
        Self {
            input: input.map(str::to_string),
            output: output.map(str::to_string),
        }
    }
}

struct CpalStreams {
    _output: Stream,
    input: Option<Stream>,
    fehler: Arc<AtomicU32>,
}

impl ActiveStreams for CpalStreams {
    fn has_capture(&self) -> bool {
        self.input.is_some()
    }

    fn stream_errors(&self) -> u32 {
        self.fehler.load(Ordering::Relaxed)
    }
}

impl AudioBackend for CpalBackend {
    fn open(
        &mut self,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
    ) -> AudioResult<Box<dyn ActiveStreams>> {
        let fehler = Arc::new(AtomicU32::new(0));

        let output_device = load_cpal_output_device(self.output.as_deref())?;
        let output = open_playback_stream(&output_device, source, Arc::clone(&fehler))?;

        let input = match load_cpal_input_device(self.input.as_deref())
            .and_then(|device| open_capture_stream(&device, sink, Arc::clone(&fehler)))
        {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(fehler = %e, "Keine Aufnahme moeglich, nur Zuhoeren");
                None
            }
        };

        output.play().map_err(AudioError::stream)?;
        let input = aufnahme_starten(input, |stream: &Stream| stream.play());

        info!(aufnahme = input.is_some(), "Audio-Streams gestartet");
        Ok(Box::new(CpalStreams {
            _output: output,
            input,
            fehler,
        }))
    }
}

/// Startet die Aufnahme; scheitert das, geht es ohne sie weiter
fn aufnahme_starten<S, E: std::fmt::Display>(
    stream: Option<S>,
    play: impl FnOnce(&S) -> Result<(), E>,
) -> Option<S> {
    let stream = stream?;
    match play(&stream) {
        Ok(()) => Some(stream),
        Err(e) => {
            warn!(fehler = %e, "Aufnahme-Stream startet nicht, nur Zuhoeren");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Attrappe;

    #[test]
    fn gestartete_aufnahme_bleibt() {
        let ergebnis = aufnahme_starten(Some(Attrappe), |_| Ok::<(), String>(()));
        assert!(ergebnis.is_some());
    }

    #[test]
    fn fehlgeschlagener_start_ergibt_nur_zuhoeren() {
        let ergebnis = aufnahme_starten(Some(Attrappe), |_| Err("Geraet belegt"));
        assert!(ergebnis.is_none());
    }

    #[test]
    fn ohne_aufnahme_wird_nichts_gestartet() {
        let mut aufgerufen = false;
        let ergebnis = aufnahme_starten(None::<Attrappe>, |_| {
            aufgerufen = true;
            Ok::<(), String>(())
        });
        assert!(ergebnis.is_none());
        assert!(!aufgerufen);
    }
}
