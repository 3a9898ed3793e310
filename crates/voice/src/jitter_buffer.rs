//! Jitter Buffer pro Peer
//!
//! Kleiner SPSC-Ring fester Kapazitaet fuer dekodierte Stereo-Frames.
//! Die Hauptschleife schreibt (nach dem Dekodieren), der
//! Wiedergabe-Callback liest. Ist der Ring voll, wird der NEUE Frame
//! verworfen; bereits gepuffertes Audio bleibt unangetastet.
//!
//! ## Eigenschaften
//! - Speicher wird einmalig beim Erstellen reserviert
//! - Lesen und Schreiben sind lock-free und allokationsfrei
//! - Reihenfolge ist FIFO

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use funkspruch_audio::StereoFrame;

/// Frames pro Peer (5 x 20 ms = 100 ms Puffer)
pub const JITTER_KAPAZITAET: usize = 5;

/// Erstellt einen Ring und liefert Schreib- und Leseseite
pub fn jitter_buffer(kapazitaet: usize) -> (JitterWriter, JitterReader) {
    let kapazitaet = kapazitaet.max(1);
    let (prod, cons) = HeapRb::<StereoFrame>::new(kapazitaet).split();
    (JitterWriter { prod }, JitterReader { cons })
}

/// Schreibseite (Hauptschleife)
pub struct JitterWriter {
    prod: HeapProd<StereoFrame>,
}

impl JitterWriter {
    /// Legt einen Frame ab. `false` wenn der Ring voll war (Frame verworfen).
    pub fn push(&mut self, frame: &StereoFrame) -> bool {
        self.prod.try_push(*frame).is_ok()
    }

    /// Aktuell gepufferte Frames
    pub fn fuellstand(&self) -> usize {
        self.prod.occupied_len()
    }
}

/// Leseseite (Wiedergabe-Callback)
pub struct JitterReader {
    cons: HeapCons<StereoFrame>,
}

impl JitterReader {
    /// Entnimmt den aeltesten Frame
    pub fn pop(&mut self) -> Option<StereoFrame> {
        self.cons.try_pop()
    }

    /// Verwirft alle gepufferten Frames und gibt deren Anzahl zurueck
    pub fn leeren(&mut self) -> usize {
        let mut verworfen = 0;
        while self.cons.try_pop().is_some() {
            verworfen += 1;
        }
        verworfen
    }

    pub fn fuellstand(&self) -> usize {
        self.cons.occupied_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkspruch_audio::STEREO_FRAME_LAENGE;

    fn frame(wert: i16) -> StereoFrame {
        [wert; STEREO_FRAME_LAENGE]
    }

    #[test]
    fn reihenfolge_ist_fifo() {
        let (mut w, mut r) = jitter_buffer(JITTER_KAPAZITAET);
        for i in 1..=3 {
            assert!(w.push(&frame(i)));
        }
        for i in 1..=3 {
            assert_eq!(r.pop().unwrap()[0], i);
        }
        assert!(r.pop().is_none());
    }

    #[test]
    fn sechster_frame_wird_verworfen() {
        let (mut w, mut r) = jitter_buffer(JITTER_KAPAZITAET);
        for i in 1..=5 {
            assert!(w.push(&frame(i)));
        }
        assert!(!w.push(&frame(6)), "Sechster Frame muss verworfen werden");
        assert_eq!(w.fuellstand(), 5);

        // Die ersten fuenf bleiben unveraendert erhalten
        for i in 1..=5 {
            assert_eq!(r.pop().unwrap(), frame(i));
        }
        assert!(r.pop().is_none());
    }

    #[test]
    fn fuellstand_nie_ueber_kapazitaet() {
        let (mut w, mut r) = jitter_buffer(JITTER_KAPAZITAET);
        // Gemischte Folge aus Schreiben und Lesen
        for runde in 0..50i16 {
            for _ in 0..(runde % 4) {
                w.push(&frame(runde));
                assert!(w.fuellstand() <= JITTER_KAPAZITAET);
            }
            if runde % 3 == 0 {
                r.pop();
            }
            assert!(r.fuellstand() <= JITTER_KAPAZITAET);
        }
    }

    #[test]
    fn leeren_verwirft_alles() {
        let (mut w, mut r) = jitter_buffer(JITTER_KAPAZITAET);
        w.push(&frame(1));
        w.push(&frame(2));
        assert_eq!(r.leeren(), 2);
        assert_eq!(r.fuellstand(), 0);
        assert!(w.push(&frame(3)));
        assert_eq!(r.pop().unwrap()[0], 3);
    }

    #[test]
    fn lesen_und_schreiben_ueber_threads() {
        let (mut w, mut r) = jitter_buffer(JITTER_KAPAZITAET);
        let leser = std::thread::spawn(move || {
            let mut letzte = 0i16;
            let mut gelesen = 0;
            while gelesen < 100 {
                if let Some(f) = r.pop() {
                    assert!(f[0] > letzte, "FIFO ueber Threads verletzt");
                    letzte = f[0];
                    gelesen += 1;
                }
            }
        });
        let mut i = 1i16;
        while i <= 100 {
            if w.push(&frame(i)) {
                i += 1;
            }
        }
        leser.join().unwrap();
    }
}
