//! Eingangspegel fuer die Pegelanzeige

/// Amplitude, die einem Pegel von 100 entspricht
///
/// Liegt unter Vollaussteuerung, damit normale Sprache die Anzeige fuellt.
pub const PEGEL_REFERENZ: i32 = 16_384;

/// Spitzenpegel eines Frames als Wert 0..=100
pub fn spitzenpegel(samples: &[i16]) -> u8 {
    let spitze = samples
        .iter()
        .map(|&s| (s as i32).abs())
        .max()
        .unwrap_or(0);
    (spitze * 100 / PEGEL_REFERENZ).min(100) as u8
}
