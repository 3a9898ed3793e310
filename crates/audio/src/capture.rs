//! Mikrofon-Capture via cpal
//!
//! Der Treiber liefert Puffer beliebiger Groesse. `FrameBlocker` sammelt
//! daraus exakte 20-ms-Mono-Frames und reicht jeden vollen Frame an den
//! `FrameSink` weiter. Mehrkanal-Geraete werden auf Kanal 0 reduziert.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, Stream};
use tracing::debug;

use crate::backend::FrameSink;
use crate::device::stream_config_48k;
use crate::error::{AudioError, AudioResult};
use crate::frame::{MonoFrame, FRAME_SAMPLES, STILLE_MONO};

/// Sammelt Treiber-Samples zu vollen Frames (ohne Allokation)
pub struct FrameBlocker<S: FrameSink + ?Sized> {
    frame: MonoFrame,
    fuellstand: usize,
    sink: Box<S>,
}

impl<S: FrameSink + ?Sized> FrameBlocker<S> {
    pub fn new(sink: Box<S>) -> Self {
        Self {
            frame: STILLE_MONO,
            fuellstand: 0,
            sink,
        }
    }

    /// Verarbeitet einen interleaved Treiber-Puffer
    pub fn push_interleaved<T: Copy>(
        &mut self,
        data: &[T],
        kanaele: usize,
        konvertieren: impl Fn(T) -> i16,
    ) {
        for gruppe in data.chunks_exact(kanaele.max(1)) {
            self.frame[self.fuellstand] = konvertieren(gruppe[0]);
            self.fuellstand += 1;
            if self.fuellstand == FRAME_SAMPLES {
                self.sink.capture_frame(&self.frame);
                self.fuellstand = 0;
            }
        }
    }
}

pub(crate) fn f32_zu_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub(crate) fn u16_zu_i16(s: u16) -> i16 {
    (s as i32 - 32_768) as i16
}

/// Oeffnet einen (noch pausierten) Capture-Stream auf dem Geraet
pub fn open_capture_stream(
    device: &Device,
    sink: Box<dyn FrameSink>,
    fehler: Arc<AtomicU32>,
) -> AudioResult<Stream> {
    let supported = stream_config_48k(
        device
            .supported_input_configs()
            .map_err(AudioError::stream)?,
        1,
    )?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let kanaele = config.channels as usize;

    let mut blocker = FrameBlocker::new(sink);
    let err_fn = move |_err| {
        fehler.fetch_add(1, Ordering::Relaxed);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _| blocker.push_interleaved(data, kanaele, f32_zu_i16),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _| blocker.push_interleaved(data, kanaele, |s| s),
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _| blocker.push_interleaved(data, kanaele, u16_zu_i16),
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

    debug!(kanaele, format = ?sample_format, "Capture-Stream geoeffnet");
    Ok(stream)
}
