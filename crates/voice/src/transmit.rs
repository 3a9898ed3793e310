//! Sendepfad (Capture-Callback)
//!
//! Laeuft fuer jeden vollen 20-ms-Mikrofon-Frame im Audio-Thread:
//! Verstaerkung, Pegel, Opus-Kodierung, Paketierung, Senden. Alle Puffer
//! liegen im Handler selbst; Fehler werden nur gezaehlt.

use std::net::UdpSocket;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use funkspruch_audio::mixer::verstaerken;
use funkspruch_audio::{spitzenpegel, FrameSink, MonoFrame, OpusEncoder, STILLE_MONO};
use funkspruch_protocol::{AudioPacket, MAX_DATAGRAMM_LAENGE, MAX_NUTZDATEN_LAENGE};

use crate::state::VoiceShared;

/// Ziel der ausgehenden Pakete
///
/// Abstraktion ueber den Socket, damit der Pfad ohne Netzwerk testbar ist.
pub trait PaketZiel: Send + 'static {
    fn senden(&mut self, daten: &[u8]) -> std::io::Result<()>;
}

impl PaketZiel for Arc<UdpSocket> {
    fn senden(&mut self, daten: &[u8]) -> std::io::Result<()> {
        self.send(daten).map(|_| ())
    }
}

/// Capture-Handler: kodiert und sendet, solange gesendet wird
pub struct TransmitPath<Z: PaketZiel> {
    encoder: OpusEncoder,
    ziel: Z,
    shared: Arc<VoiceShared>,
    sequenz: u32,
    pcm: MonoFrame,
    nutzdaten: [u8; MAX_NUTZDATEN_LAENGE],
    paket: [u8; MAX_DATAGRAMM_LAENGE],
}

impl<Z: PaketZiel> TransmitPath<Z> {
    pub fn new(encoder: OpusEncoder, ziel: Z, shared: Arc<VoiceShared>) -> Self {
        Self {
            encoder,
            ziel,
            shared,
            sequenz: 0,
            pcm: STILLE_MONO,
            nutzdaten: [0; MAX_NUTZDATEN_LAENGE],
            paket: [0; MAX_DATAGRAMM_LAENGE],
        }
    }

    /// Naechste Sequenznummer
    pub fn sequenz(&self) -> u32 {
        self.sequenz
    }
}

impl<Z: PaketZiel> FrameSink for TransmitPath<Z> {
    fn capture_frame(&mut self, frame: &MonoFrame) {
        if !self.shared.sendet() {
            self.shared.eingangspegel_setzen(0);
            return;
        }

        self.pcm = *frame;
        verstaerken(&mut self.pcm, self.shared.eingangs_gain_q8());
        self.shared.eingangspegel_setzen(spitzenpegel(&self.pcm));

        let n = match self.encoder.encode_into(&self.pcm, &mut self.nutzdaten) {
            Ok(n) => n,
            Err(_) => {
                self.shared.kodierfehler.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let paket = AudioPacket {
            sender: self.shared.sender_id(),
            sequence: self.sequenz,
            channel: self.shared.kanal(),
            payload: &self.nutzdaten[..n],
        };
        let laenge = match paket.encode_into(&mut self.paket) {
            Ok(laenge) => laenge,
            Err(_) => {
                self.shared.kodierfehler.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        self.sequenz = self.sequenz.wrapping_add(1);
        self.shared.sequenz.store(self.sequenz, Ordering::Relaxed);

        match self.ziel.senden(&self.paket[..laenge]) {
            Ok(()) => self.shared.gesendet.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.shared.sendefehler.fetch_add(1, Ordering::Relaxed),
        };
    }
}
