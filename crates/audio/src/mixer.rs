//! Misch-Arithmetik
//!
//! Ganzzahliges Mischen mit festen Regeln:
//! - Akkumulation in `i32`, saettigend (kein Ueberlauf, auch bei vielen Sprechern)
//! - Verstaerkung als Q8-Festkomma (256 = 1.0), multipliziert in `i64`
//! - Hartes Clipping auf den `i16`-Bereich am Ende
//!
//! Ohne Beitraege liefert das Rendern explizit Stille.

use crate::frame::{StereoFrame, STEREO_FRAME_LAENGE};

/// Q8-Wert fuer Verstaerkung 1.0
pub const Q8_EINS: i32 = 256;

/// Feste Aufholverstaerkung nach dem Mischen (x1.5)
pub const MAKEUP_GAIN_Q8: i32 = 384;

/// Groesste zulaessige Q8-Verstaerkung (x16)
pub const MAX_GAIN_Q8: i32 = 16 * Q8_EINS;

/// Wandelt eine Gleitkomma-Verstaerkung in Q8 um (negativ oder NaN = 0)
pub fn gain_to_q8(gain: f32) -> i32 {
    if !gain.is_finite() || gain <= 0.0 {
        return 0;
    }
    ((gain * Q8_EINS as f32).round() as i32).min(MAX_GAIN_Q8)
}

/// Gesamtverstaerkung der Wiedergabe: Aufholverstaerkung mal Lautstaerke
pub fn ausgabe_gain_q8(lautstaerke: f32) -> i32 {
    (MAKEUP_GAIN_Q8 * gain_to_q8(lautstaerke) / Q8_EINS).min(MAX_GAIN_Q8)
}

/// Begrenzt einen Wert hart auf den `i16`-Bereich
pub fn clip_i16(wert: i64) -> i16 {
    wert.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Wendet eine Q8-Verstaerkung auf einen Wert an
pub fn skalieren(wert: i32, gain_q8: i32) -> i16 {
    clip_i16(wert as i64 * gain_q8 as i64 / Q8_EINS as i64)
}

/// Verstaerkt Samples in-place (Mikrofon-Gain), mit Clipping
pub fn verstaerken(samples: &mut [i16], gain_q8: i32) {
    if gain_q8 == Q8_EINS {
        return;
    }
    for s in samples.iter_mut() {
        *s = skalieren(*s as i32, gain_q8);
    }
}

/// Akkumulator fuer einen Stereo-Frame
pub struct MixBuffer {
    summe: [i32; STEREO_FRAME_LAENGE],
    beitraege: usize,
}

impl MixBuffer {
    pub fn new() -> Self {
        Self {
            summe: [0; STEREO_FRAME_LAENGE],
            beitraege: 0,
        }
    }

    /// Setzt den Akkumulator fuer den naechsten Frame zurueck
    pub fn leeren(&mut self) {
        self.summe.fill(0);
        self.beitraege = 0;
    }

    /// Addiert einen Frame (saettigend)
    pub fn akkumulieren(&mut self, frame: &StereoFrame) {
        for (acc, &s) in self.summe.iter_mut().zip(frame.iter()) {
            *acc = acc.saturating_add(s as i32);
        }
        self.beitraege += 1;
    }

    /// Anzahl der addierten Frames seit dem letzten `leeren`
    pub fn beitraege(&self) -> usize {
        self.beitraege
    }

    /// Schreibt die verstaerkte, geclippte Summe nach `out`
    pub fn rendern(&self, gain_q8: i32, out: &mut StereoFrame) {
        if self.beitraege == 0 {
            out.fill(0);
            return;
        }
        for (o, &acc) in out.iter_mut().zip(self.summe.iter()) {
            *o = skalieren(acc, gain_q8);
        }
    }
}

impl Default for MixBuffer {
    fn default() -> Self {
        Self::new()
    }
}
