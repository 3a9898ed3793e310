//! Peer-Tabelle (Hauptschleife)
//!
//! Verwaltet pro Slot den lazily erzeugten Decoder, die Schreibseite des
//! Jitter-Rings, die Sequenz-Pruefung und die Anwesenheitsdaten
//! (spricht / stumm / Zeitstempel).
//!
//! ## Sequenznummern
//! Pakete mit bereits gesehener oder aelterer Sequenznummer werden
//! verworfen (Vergleich mit Wrap-Around). Luecken zaehlen als verlorene
//! Frames; es gibt weder Umsortierung noch Verschleierung.
//!
//! ## Neuvergabe eines Slots
//! `peer_getrennt` setzt Decoder und Sequenz zurueck. Liegen noch Frames
//! im Ring, fordert die Tabelle das Leeren bei der Leseseite an und legt
//! fuer den Slot nichts ab, bis der Mixer quittiert hat. So hoert man
//! vom neuen Spieler nie Audio des alten.
//!
//! ## Stummschaltung
//! Stumm gilt pro Slot. Verlaesst ein Spieler das Spiel, wird der Slot
//! wieder hoerbar. Beim Trennen vom Relay (auch vor jedem Verbinden)
//! bleiben die Stumm-Markierungen erhalten.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use funkspruch_audio::{OpusDecoder, StereoFrame, STILLE_STEREO};
use funkspruch_core::types::{PeerSlot, MAX_PEERS};
use funkspruch_protocol::RelayAudioPacket;

use crate::jitter_buffer::JitterWriter;
use crate::state::VoiceShared;

/// Ein Peer gilt als sprechend, solange sein letztes Paket hoechstens so alt ist
pub const SPRECH_FENSTER: Duration = Duration::from_millis(500);

/// Nach dieser Pause wird eine scheinbar alte Sequenz als neuer Strom akzeptiert
/// (der Absender hat z.B. neu gestartet)
pub const STROM_NEUSTART: Duration = Duration::from_secs(2);

/// Anwesenheitsdaten eines Peers (nur lesend fuer die Anzeige)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerPresence {
    /// Lokal stummgeschaltet
    pub muted: bool,
    /// Paket innerhalb der letzten 500 ms (einmal pro Tick neu berechnet)
    pub talking: bool,
    /// Beginn der aktuellen Sprechphase
    pub talking_since: Option<Instant>,
    /// Zeitpunkt des letzten gueltigen Pakets
    pub last_packet: Option<Instant>,
}

/// Zaehler eines Peers fuer den Statusbericht
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStatistik {
    pub empfangen: u64,
    pub verloren: u64,
    pub veraltet: u64,
    pub dekodierfehler: u64,
    pub puffer_voll: u64,
    pub gepuffert: usize,
}

/// Ergebnis der Verarbeitung eines Relay-Audio-Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Empfang {
    /// Dekodiert und im Jitter-Ring abgelegt
    Gepuffert,
    /// Duplikat oder aelter als das zuletzt akzeptierte Paket
    Veraltet,
    /// Peer ist stumm; nicht dekodiert
    Stumm,
    /// Decoder fehlgeschlagen; Frame gilt als verloren
    Dekodierfehler,
    /// Ring voll; neuer Frame verworfen
    PufferVoll,
    /// Slot wurde neu vergeben, der alte Ring ist noch nicht geleert
    RingWirdGeleert,
}

struct Peer {
    decoder: Option<OpusDecoder>,
    writer: JitterWriter,
    letzte_sequenz: Option<u32>,
    praesenz: PeerPresence,
    statistik: PeerStatistik,
}

impl Peer {
    fn new(writer: JitterWriter) -> Self {
        Self {
            decoder: None,
            writer,
            letzte_sequenz: None,
            praesenz: PeerPresence::default(),
            statistik: PeerStatistik::default(),
        }
    }

    /// Setzt alles ausser dem Ring zurueck (den leert die Leseseite)
    fn zuruecksetzen(&mut self) {
        self.decoder = None;
        self.letzte_sequenz = None;
        self.praesenz = PeerPresence::default();
        self.statistik = PeerStatistik::default();
    }
}

/// Prueft ob `seq` aelter als `referenz` ist (mit Wrap-Around)
pub fn ist_sequenz_alt(seq: u32, referenz: u32) -> bool {
    seq.wrapping_sub(referenz) > u32::MAX / 2
}

/// Alle entfernten Spieler
pub struct PeerTable {
    peers: Vec<Peer>,
    shared: Arc<VoiceShared>,
    frame: StereoFrame,
}

impl PeerTable {
    /// Erwartet genau eine Schreibseite pro Slot
    pub fn new(writers: Vec<JitterWriter>, shared: Arc<VoiceShared>) -> Self {
        debug_assert_eq!(writers.len(), MAX_PEERS);
        Self {
            peers: writers.into_iter().map(Peer::new).collect(),
            shared,
            frame: STILLE_STEREO,
        }
    }

    fn peer(&self, slot: PeerSlot) -> &Peer {
        &self.peers[slot.index()]
    }

    fn peer_mut(&mut self, slot: PeerSlot) -> &mut Peer {
        &mut self.peers[slot.index()]
    }

    /// Verarbeitet ein gueltig geparstes Relay-Audio-Paket
    pub fn paket_empfangen(&mut self, paket: &RelayAudioPacket<'_>, jetzt: Instant) -> Empfang {
        let slot = paket.from;
        let shared = &self.shared;
        let frame = &mut self.frame;
        let peer = &mut self.peers[slot.index()];

        if let Some(letzte) = peer.letzte_sequenz {
            let pause = peer
                .praesenz
                .last_packet
                .map(|t| jetzt.saturating_duration_since(t))
                .unwrap_or(Duration::MAX);
            let alt = paket.sequence == letzte || ist_sequenz_alt(paket.sequence, letzte);
            if alt && pause < STROM_NEUSTART {
                peer.statistik.veraltet += 1;
                trace!(%slot, seq = paket.sequence, letzte, "Veraltetes Paket verworfen");
                return Empfang::Veraltet;
            }
            if !alt {
                let luecke = paket.sequence.wrapping_sub(letzte).wrapping_sub(1);
                peer.statistik.verloren += luecke as u64;
            }
        }

        peer.letzte_sequenz = Some(paket.sequence);
        peer.praesenz.last_packet = Some(jetzt);
        peer.statistik.empfangen += 1;
        shared.peer_aktiv_setzen(slot, true);

        if peer.praesenz.muted {
            return Empfang::Stumm;
        }
        if shared.ring_leeren_angefordert(slot) {
            trace!(%slot, seq = paket.sequence, "Ring des Slots wird noch geleert");
            return Empfang::RingWirdGeleert;
        }

        let decoder = match &mut peer.decoder {
            Some(decoder) => decoder,
            empty => match OpusDecoder::new() {
                Ok(decoder) => {
                    debug!(%slot, "Decoder erstellt");
                    empty.insert(decoder)
                }
                Err(e) => {
                    debug!(%slot, fehler = %e, "Decoder konnte nicht erstellt werden");
                    peer.statistik.dekodierfehler += 1;
                    return Empfang::Dekodierfehler;
                }
            },
        };

        if decoder.decode_into(paket.payload, frame).is_err() {
            peer.statistik.dekodierfehler += 1;
            return Empfang::Dekodierfehler;
        }

        if peer.writer.push(frame) {
            Empfang::Gepuffert
        } else {
            peer.statistik.puffer_voll += 1;
            Empfang::PufferVoll
        }
    }

    /// Berechnet `talking` einmal pro Tick neu
    pub fn aktualisieren(&mut self, jetzt: Instant) {
        for peer in &mut self.peers {
            let p = &mut peer.praesenz;
            let spricht = p
                .last_packet
                .is_some_and(|t| jetzt.saturating_duration_since(t) <= SPRECH_FENSTER);
            if spricht && !p.talking {
                p.talking_since = Some(jetzt);
            } else if !spricht {
                p.talking_since = None;
            }
            p.talking = spricht;
        }
    }

    /// Schaltet einen Peer lokal stumm oder wieder hoerbar
    pub fn stumm_setzen(&mut self, slot: PeerSlot, stumm: bool) {
        self.peer_mut(slot).praesenz.muted = stumm;
        self.shared.peer_stumm_setzen(slot, stumm);
    }

    /// Gibt Decoder und Zustand eines Slots frei (Spieler hat das Spiel verlassen)
    pub fn peer_getrennt(&mut self, slot: PeerSlot) {
        self.slot_freigeben(slot);
        self.shared.peer_stumm_setzen(slot, false);
    }

    /// Setzt alle Slots zurueck (Verbindung getrennt); stumm bleibt stumm
    pub fn alle_zuruecksetzen(&mut self) {
        for slot in PeerSlot::all() {
            let stumm = self.peer(slot).praesenz.muted;
            self.slot_freigeben(slot);
            self.peer_mut(slot).praesenz.muted = stumm;
        }
    }

    fn slot_freigeben(&mut self, slot: PeerSlot) {
        let peer = self.peer_mut(slot);
        peer.zuruecksetzen();
        // Ein leerer Ring braucht keine Quittung
        let alte_frames = peer.writer.fuellstand() > 0;
        self.shared.peer_aktiv_setzen(slot, false);
        if alte_frames {
            self.shared.ring_leeren_anfordern(slot);
        }
    }

    pub fn praesenz(&self, slot: PeerSlot) -> PeerPresence {
        self.peer(slot).praesenz
    }

    /// Hat der Slot einen Decoder? (nur fuer Diagnose und Tests)
    pub fn hat_decoder(&self, slot: PeerSlot) -> bool {
        self.peer(slot).decoder.is_some()
    }

    pub fn statistik(&self, slot: PeerSlot) -> PeerStatistik {
        let peer = self.peer(slot);
        PeerStatistik {
            gepuffert: peer.writer.fuellstand(),
            ..peer.statistik
        }
    }

    /// Slots, die im letzten Tick als sprechend galten
    pub fn sprechende(&self) -> impl Iterator<Item = PeerSlot> + '_ {
        PeerSlot::all().filter(|s| self.peer(*s).praesenz.talking)
    }
}
