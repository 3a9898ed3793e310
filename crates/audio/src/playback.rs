//! Audio-Playback via cpal
//!
//! `FrameVerteiler` holt pro 20 ms einen Stereo-Frame vom `FrameSource`
//! und verteilt ihn auf Treiber-Puffer beliebiger Groesse. Mono-Geraete
//! bekommen den Mittelwert, weitere Kanaele Stille.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, Stream};
use tracing::debug;

use crate::backend::FrameSource;
use crate::device::stream_config_48k;
use crate::error::{AudioError, AudioResult};
use crate::frame::{StereoFrame, FRAME_SAMPLES, STILLE_STEREO};

/// Verteilt volle Frames auf Treiber-Puffer (ohne Allokation)
pub struct FrameVerteiler<S: FrameSource + ?Sized> {
    frame: StereoFrame,
    position: usize,
    source: Box<S>,
}

impl<S: FrameSource + ?Sized> FrameVerteiler<S> {
    pub fn new(source: Box<S>) -> Self {
        Self {
            frame: STILLE_STEREO,
            position: FRAME_SAMPLES,
            source,
        }
    }

    fn naechstes_paar(&mut self) -> (i16, i16) {
        if self.position == FRAME_SAMPLES {
            self.source.fill_frame(&mut self.frame);
            self.position = 0;
        }
        let i = self.position * 2;
        self.position += 1;
        (self.frame[i], self.frame[i + 1])
    }

    /// Fuellt einen interleaved Treiber-Puffer vollstaendig
    pub fn fill_interleaved<T: Copy>(
        &mut self,
        data: &mut [T],
        kanaele: usize,
        stille: T,
        konvertieren: impl Fn(i16) -> T,
    ) {
        for gruppe in data.chunks_exact_mut(kanaele.max(1)) {
            let (links, rechts) = self.naechstes_paar();
            match gruppe {
                [mono] => *mono = konvertieren(((links as i32 + rechts as i32) / 2) as i16),
                [l, r, rest @ ..] => {
                    *l = konvertieren(links);
                    *r = konvertieren(rechts);
                    rest.fill(stille);
                }
                [] => {}
            }
        }
    }
}

pub(crate) fn i16_zu_f32(s: i16) -> f32 {
    s as f32 / i16::MAX as f32
}

pub(crate) fn i16_zu_u16(s: i16) -> u16 {
    (s as i32 + 32_768) as u16
}

/// Oeffnet einen (noch pausierten) Playback-Stream auf dem Geraet
pub fn open_playback_stream(
    device: &Device,
    source: Box<dyn FrameSource>,
    fehler: Arc<AtomicU32>,
) -> AudioResult<Stream> {
    let supported = stream_config_48k(
        device
            .supported_output_configs()
            .map_err(AudioError::stream)?,
        2,
    )?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let kanaele = config.channels as usize;

    let mut verteiler = FrameVerteiler::new(source);
    let err_fn = move |_err| {
        fehler.fetch_add(1, Ordering::Relaxed);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _| verteiler.fill_interleaved(data, kanaele, 0.0, i16_zu_f32),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _| verteiler.fill_interleaved(data, kanaele, 0, |s| s),
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _| {
                verteiler.fill_interleaved(data, kanaele, 32_768, i16_zu_u16)
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {other:?}"
            )))
        }
    }
    .map_err(AudioError::stream)?;

    debug!(kanaele, format = ?sample_format, "Playback-Stream geoeffnet");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Liefert Frames mit fortlaufendem Wert, links positiv, rechts negativ
    struct Zaehler(i16);

    impl FrameSource for Zaehler {
        fn fill_frame(&mut self, frame: &mut StereoFrame) {
            self.0 += 1;
            for paar in frame.chunks_exact_mut(2) {
                paar[0] = self.0;
                paar[1] = -self.0;
            }
        }
    }

    #[test]
    fn frames_werden_ueber_puffergrenzen_verteilt() {
        let mut v = FrameVerteiler::new(Box::new(Zaehler(0)));
        let mut puffer = vec![0i16; 700 * 2];
        v.fill_interleaved(&mut puffer, 2, 0, |s| s);
        assert_eq!(&puffer[..2], &[1, -1]);
        v.fill_interleaved(&mut puffer, 2, 0, |s| s);
        // 960 - 700 = 260 Paare aus Frame 1, danach Frame 2
        assert_eq!(&puffer[518..522], &[1, -1, 2, -2][..]);
    }

    #[test]
    fn mono_geraet_bekommt_mittelwert() {
        let mut v = FrameVerteiler::new(Box::new(Zaehler(0)));
        let mut puffer = [99i16; 16];
        v.fill_interleaved(&mut puffer, 1, 0, |s| s);
        assert!(puffer.iter().all(|&s| s == 0));
    }

    #[test]
    fn zusaetzliche_kanaele_sind_still() {
        let mut v = FrameVerteiler::new(Box::new(Zaehler(0)));
        let mut puffer = [99i16; 12];
        v.fill_interleaved(&mut puffer, 4, 0, |s| s);
        assert_eq!(&puffer[..4], &[1, -1, 0, 0]);
        assert_eq!(&puffer[8..], &[1, -1, 0, 0]);
    }

    #[test]
    fn sample_konvertierung() {
        assert!((i16_zu_f32(i16::MAX) - 1.0).abs() < f32::EPSILON);
        assert_eq!(i16_zu_f32(0), 0.0);
        assert_eq!(i16_zu_u16(0), 32_768);
        assert_eq!(i16_zu_u16(i16::MIN), 0);
        assert_eq!(i16_zu_u16(i16::MAX), u16::MAX);
    }
}
