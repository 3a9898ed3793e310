//! Wiedergabepfad (Playback-Callback)
//!
//! Nimmt pro 20-ms-Tick von jedem hoerbaren Peer hoechstens einen Frame,
//! summiert in den `MixBuffer` und schreibt das verstaerkte, geclippte
//! Ergebnis. Ringe stummer oder inaktiver Peers werden geleert, damit
//! nach dem Entstummen kein altes Audio nachklingt. Wurde ein Slot neu
//! vergeben, wird sein Ring vor allem anderen geleert und quittiert.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use funkspruch_audio::{FrameSource, MixBuffer, StereoFrame};
use funkspruch_core::types::PeerSlot;

use crate::jitter_buffer::JitterReader;
use crate::state::VoiceShared;

/// Playback-Handler: besitzt die Leseseiten aller Jitter-Ringe
pub struct MixSource {
    readers: Vec<JitterReader>,
    mix: MixBuffer,
    shared: Arc<VoiceShared>,
}

impl MixSource {
    /// Erwartet genau eine Leseseite pro Slot, in Slot-Reihenfolge
    pub fn new(readers: Vec<JitterReader>, shared: Arc<VoiceShared>) -> Self {
        Self {
            readers,
            mix: MixBuffer::new(),
            shared,
        }
    }
}

impl FrameSource for MixSource {
    fn fill_frame(&mut self, frame: &mut StereoFrame) {
        self.mix.leeren();

        for (slot, reader) in PeerSlot::all().zip(self.readers.iter_mut()) {
            if self.shared.ring_leeren_angefordert(slot) {
                reader.leeren();
                self.shared.ring_geleert(slot);
                continue;
            }
            if !self.shared.peer_hoerbar(slot) {
                reader.leeren();
                continue;
            }
            if let Some(peer_frame) = reader.pop() {
                self.mix.akkumulieren(&peer_frame);
            }
        }

        if self.mix.beitraege() > 0 {
            self.shared.gemischte_frames.fetch_add(1, Ordering::Relaxed);
        }
        self.mix.rendern(self.shared.ausgabe_gain_q8(), frame);
    }
}
