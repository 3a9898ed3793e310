//! Opus Encoder/Decoder Wrapper
//!
//! Kapselt audiopus mit festen Frames: der Encoder nimmt genau einen
//! Mono-Frame, der Decoder liefert genau einen Stereo-Frame. Beide
//! schreiben in Puffer des Aufrufers und allokieren beim Kodieren nicht.

use audiopus::{
    coder::{Decoder, Encoder},
    Application, Bitrate, Channels, SampleRate,
};
use tracing::debug;

use crate::error::{AudioError, AudioResult};
use crate::frame::{MonoFrame, StereoFrame, FRAME_SAMPLES, STEREO_KANAELE};
use funkspruch_protocol::codec::{OpusApplication, SpeechCodecConfig};

/// OPUS_SET_DTX_REQUEST (audiopus 0.2 hat keinen eigenen Setter)
const OPUS_SET_DTX_REQUEST: i32 = 4016;

/// Opus-Encoder fuer das lokale Mikrofon (mono, 48 kHz, 20 ms)
pub struct OpusEncoder {
    encoder: Encoder,
    config: SpeechCodecConfig,
}

impl OpusEncoder {
    /// Erstellt einen neuen Encoder mit der gegebenen Konfiguration
    pub fn new(config: SpeechCodecConfig) -> AudioResult<Self> {
        config.validieren()?;

        let mut encoder = Encoder::new(
            SampleRate::Hz48000,
            Channels::Mono,
            application_to_audiopus(config.application),
        )?;
        encoder.set_bitrate(Bitrate::BitsPerSecond(config.bitrate_bps()))?;
        encoder.set_complexity(config.complexity)?;
        if config.dtx_enabled {
            encoder.set_encoder_ctl_request(OPUS_SET_DTX_REQUEST, 1)?;
        }

        debug!(
            bitrate_kbps = config.bitrate_kbps,
            complexity = config.complexity,
            dtx = config.dtx_enabled,
            "OpusEncoder erstellt"
        );

        Ok(Self { encoder, config })
    }

    /// Kodiert einen Frame nach `out` und gibt die Laenge der Nutzdaten zurueck
    ///
    /// Ein Fehler bedeutet: dieser Frame wird nicht gesendet.
    pub fn encode_into(&mut self, pcm: &MonoFrame, out: &mut [u8]) -> AudioResult<usize> {
        if out.is_empty() {
            return Err(AudioError::PufferZuKlein(0));
        }
        Ok(self.encoder.encode(pcm, out)?)
    }

    /// Gibt die aktuelle Konfiguration zurueck
    pub fn config(&self) -> &SpeechCodecConfig {
        &self.config
    }
}

/// Opus-Decoder fuer einen entfernten Spieler (stereo, 48 kHz)
pub struct OpusDecoder {
    decoder: Decoder,
}

impl OpusDecoder {
    /// Erstellt einen neuen Decoder
    pub fn new() -> AudioResult<Self> {
        let decoder = Decoder::new(SampleRate::Hz48000, Channels::Stereo)?;
        Ok(Self { decoder })
    }

    /// Dekodiert ein Paket in `out`
    ///
    /// Liefert die Anzahl dekodierter Samples pro Kanal. Ist das Paket
    /// kuerzer als ein Frame, wird der Rest mit Stille aufgefuellt.
    pub fn decode_into(&mut self, payload: &[u8], out: &mut StereoFrame) -> AudioResult<usize> {
        let dekodiert = self
            .decoder
            .decode(Some(payload), &mut out[..], false)?
            .min(FRAME_SAMPLES);
        out[dekodiert * STEREO_KANAELE..].fill(0);
        Ok(dekodiert)
    }
}

fn application_to_audiopus(app: OpusApplication) -> Application {
    match app {
        OpusApplication::Voip => Application::Voip,
        OpusApplication::Audio => Application::Audio,
        OpusApplication::RestrictedLowdelay => Application::LowDelay,
    }
}
