//! Audio-Geraete-Enumeration und -Auswahl
//!
//! Geraete werden ueber einen (Teil-)Namen gewaehlt, Gross-/Kleinschreibung
//! spielt keine Rolle. Ohne Namen gilt das Standardgeraet des Systems.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SupportedStreamConfig, SupportedStreamConfigRange};
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};
use crate::frame::SAMPLE_RATE;

/// Ein Audio-Geraet fuer Auflistungen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Anzeigename des Geraets
    pub name: String,
    /// Unterstuetzt das Geraet 48 kHz?
    pub unterstuetzt_48k: bool,
}

/// Listet alle verfuegbaren Eingabegeraete auf
pub fn list_input_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host.input_devices().map_err(AudioError::stream)?;

    let result: Vec<_> = devices
        .filter_map(|d| match device_to_audio_device(&d, true) {
            Ok(ad) => Some(ad),
            Err(e) => {
                warn!("Eingabegeraet konnte nicht gelesen werden: {}", e);
                None
            }
        })
        .collect();
    debug!("Gefundene Eingabegeraete: {}", result.len());
    Ok(result)
}

/// Listet alle verfuegbaren Ausgabegeraete auf
pub fn list_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(AudioError::stream)?;

    let result: Vec<_> = devices
        .filter_map(|d| match device_to_audio_device(&d, false) {
            Ok(ad) => Some(ad),
            Err(e) => {
                warn!("Ausgabegeraet konnte nicht gelesen werden: {}", e);
                None
            }
        })
        .collect();
    debug!("Gefundene Ausgabegeraete: {}", result.len());
    Ok(result)
}

/// Laedt ein cpal-Device fuer die Aufnahme
pub fn load_cpal_input_device(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet),
        Some(n) => {
            let devices = host.input_devices().map_err(AudioError::stream)?;
            find_by_name(devices, n)
        }
    }
}

/// Laedt ein cpal-Device fuer die Wiedergabe
pub fn load_cpal_output_device(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or(AudioError::KeinStandardAusgabegeraet),
        Some(n) => {
            let devices = host.output_devices().map_err(AudioError::stream)?;
            find_by_name(devices, n)
        }
    }
}

fn find_by_name(mut devices: impl Iterator<Item = Device>, name: &str) -> AudioResult<Device> {
    devices
        .find(|d| d.name().map(|n| name_passt(&n, name)).unwrap_or(false))
        .ok_or_else(|| AudioError::GeraetNichtGefunden(name.to_string()))
}

/// Teilstring-Vergleich ohne Beachtung der Gross-/Kleinschreibung
pub fn name_passt(geraet: &str, gesucht: &str) -> bool {
    geraet.to_lowercase().contains(&gesucht.to_lowercase())
}

/// Waehlt eine 48-kHz-Konfiguration, bevorzugt mit `kanaele` Kanaelen
pub(crate) fn stream_config_48k(
    ranges: impl Iterator<Item = SupportedStreamConfigRange>,
    kanaele: u16,
) -> AudioResult<SupportedStreamConfig> {
    ranges
        .filter(|c| {
            c.min_sample_rate().0 <= SAMPLE_RATE && c.max_sample_rate().0 >= SAMPLE_RATE
        })
        .min_by_key(|c| c.channels().abs_diff(kanaele))
        .map(|c| c.with_sample_rate(cpal::SampleRate(SAMPLE_RATE)))
        .ok_or_else(|| {
            AudioError::StreamFehler(format!("Geraet unterstuetzt keine {SAMPLE_RATE} Hz"))
        })
}

fn device_to_audio_device(device: &Device, eingabe: bool) -> AudioResult<AudioDevice> {
    let name = device.name().map_err(AudioError::stream)?;
    let unterstuetzt_48k = if eingabe {
        device
            .supported_input_configs()
            .map(|r| stream_config_48k(r, 1).is_ok())
            .unwrap_or(false)
    } else {
        device
            .supported_output_configs()
            .map(|r| stream_config_48k(r, 2).is_ok())
            .unwrap_or(false)
    };
    Ok(AudioDevice {
        name,
        unterstuetzt_48k,
    })
}
