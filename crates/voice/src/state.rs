//! Sitzungszustand und gemeinsamer Atomics-Block
//!
//! `VoiceShared` ist der einzige Zustand, den Hauptschleife und
//! Audio-Callbacks gemeinsam lesen und schreiben (neben den Jitter-Ringen).
//! Alle Felder sind Atomics, damit die Echtzeit-Pfade nie sperren.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicU8, Ordering};

use funkspruch_audio::mixer::Q8_EINS;
use funkspruch_core::types::{PeerSlot, SenderId, VoiceChannel, MAX_PEERS};

// ---------------------------------------------------------------------------
// VoiceState
// ---------------------------------------------------------------------------

/// Zustand der Sprach-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoiceState {
    /// Start fehlgeschlagen oder abgeschaltet; bleibt bis Prozessende
    Disabled = 0,
    /// Bereit, sendet nicht
    Idle = 1,
    /// Verbindungsaufbau zum Relay laeuft
    Connecting = 2,
    /// Mikrofon wird gesendet
    Transmitting = 3,
    /// Verbindungsaufbau gescheitert
    Error = 4,
}

impl VoiceState {
    fn from_u8(wert: u8) -> Self {
        match wert {
            1 => Self::Idle,
            2 => Self::Connecting,
            3 => Self::Transmitting,
            4 => Self::Error,
            _ => Self::Disabled,
        }
    }

    /// Anzeigename fuer Status-Ausgaben
    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Transmitting => "transmitting",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for VoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// VoiceShared
// ---------------------------------------------------------------------------

/// Zustand, der zwischen Hauptschleife und Audio-Threads geteilt wird
pub struct VoiceShared {
    zustand: AtomicU8,
    kanal: AtomicU8,
    verbunden: AtomicBool,
    sender_id: AtomicU32,
    eingangspegel: AtomicU8,
    eingangs_gain_q8: AtomicI32,
    ausgabe_gain_q8: AtomicI32,
    peer_aktiv: [AtomicBool; MAX_PEERS],
    peer_stumm: [AtomicBool; MAX_PEERS],
    /// Slot wurde neu vergeben; die Leseseite muss den Ring erst leeren
    ring_leeren: [AtomicBool; MAX_PEERS],

    /// Naechste ausgehende Sequenznummer (nur zur Anzeige)
    pub sequenz: AtomicU32,
    /// Gesendete Audio-Pakete
    pub gesendet: AtomicU64,
    /// Fehlgeschlagene Sendeversuche im Capture-Callback
    pub sendefehler: AtomicU64,
    /// Frames, die der Encoder verworfen hat
    pub kodierfehler: AtomicU64,
    /// Wiedergabe-Frames mit mindestens einem Sprecher
    pub gemischte_frames: AtomicU64,
}

impl VoiceShared {
    /// Erstellt den Block im Zustand `Idle`, ohne Verbindung
    pub fn new(eingangs_gain_q8: i32, ausgabe_gain_q8: i32) -> Self {
        Self {
            zustand: AtomicU8::new(VoiceState::Idle as u8),
            kanal: AtomicU8::new(VoiceChannel::None as u8),
            verbunden: AtomicBool::new(false),
            sender_id: AtomicU32::new(0),
            eingangspegel: AtomicU8::new(0),
            eingangs_gain_q8: AtomicI32::new(eingangs_gain_q8),
            ausgabe_gain_q8: AtomicI32::new(ausgabe_gain_q8),
            peer_aktiv: std::array::from_fn(|_| AtomicBool::new(false)),
            peer_stumm: std::array::from_fn(|_| AtomicBool::new(false)),
            ring_leeren: std::array::from_fn(|_| AtomicBool::new(false)),
            sequenz: AtomicU32::new(0),
            gesendet: AtomicU64::new(0),
            sendefehler: AtomicU64::new(0),
            kodierfehler: AtomicU64::new(0),
            gemischte_frames: AtomicU64::new(0),
        }
    }

    pub fn zustand(&self) -> VoiceState {
        VoiceState::from_u8(self.zustand.load(Ordering::Acquire))
    }

    pub fn zustand_setzen(&self, zustand: VoiceState) {
        self.zustand.store(zustand as u8, Ordering::Release);
    }

    pub fn kanal(&self) -> VoiceChannel {
        VoiceChannel::from_u8(self.kanal.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn kanal_setzen(&self, kanal: VoiceChannel) {
        self.kanal.store(kanal as u8, Ordering::Release);
    }

    pub fn ist_verbunden(&self) -> bool {
        self.verbunden.load(Ordering::Acquire)
    }

    pub fn verbunden_setzen(&self, verbunden: bool) {
        self.verbunden.store(verbunden, Ordering::Release);
    }

    /// Wird gerade gesendet? (Transmitting und verbunden)
    pub fn sendet(&self) -> bool {
        self.zustand() == VoiceState::Transmitting && self.ist_verbunden()
    }

    pub fn sender_id(&self) -> SenderId {
        SenderId(self.sender_id.load(Ordering::Relaxed))
    }

    pub fn sender_id_setzen(&self, id: SenderId) {
        self.sender_id.store(id.0, Ordering::Relaxed);
    }

    /// Eingangspegel 0..=100
    pub fn eingangspegel(&self) -> u8 {
        self.eingangspegel.load(Ordering::Relaxed)
    }

    pub fn eingangspegel_setzen(&self, pegel: u8) {
        self.eingangspegel.store(pegel.min(100), Ordering::Relaxed);
    }

    pub fn eingangs_gain_q8(&self) -> i32 {
        self.eingangs_gain_q8.load(Ordering::Relaxed)
    }

    pub fn eingangs_gain_setzen(&self, gain_q8: i32) {
        self.eingangs_gain_q8.store(gain_q8, Ordering::Relaxed);
    }

    pub fn ausgabe_gain_q8(&self) -> i32 {
        self.ausgabe_gain_q8.load(Ordering::Relaxed)
    }

    pub fn ausgabe_gain_setzen(&self, gain_q8: i32) {
        self.ausgabe_gain_q8.store(gain_q8, Ordering::Relaxed);
    }

    pub fn peer_aktiv(&self, slot: PeerSlot) -> bool {
        self.peer_aktiv[slot.index()].load(Ordering::Acquire)
    }

    pub fn peer_aktiv_setzen(&self, slot: PeerSlot, aktiv: bool) {
        self.peer_aktiv[slot.index()].store(aktiv, Ordering::Release);
    }

    pub fn peer_stumm(&self, slot: PeerSlot) -> bool {
        self.peer_stumm[slot.index()].load(Ordering::Acquire)
    }

    pub fn peer_stumm_setzen(&self, slot: PeerSlot, stumm: bool) {
        self.peer_stumm[slot.index()].store(stumm, Ordering::Release);
    }

    /// Fordert die Leseseite auf, den Ring des Slots zu leeren
    ///
    /// Bis `ring_geleert` quittiert, legt die Schreibseite nichts ab.
    pub fn ring_leeren_anfordern(&self, slot: PeerSlot) {
        self.ring_leeren[slot.index()].store(true, Ordering::Release);
    }

    pub fn ring_leeren_angefordert(&self, slot: PeerSlot) -> bool {
        self.ring_leeren[slot.index()].load(Ordering::Acquire)
    }

    /// Quittung der Leseseite nach `leeren()`
    pub fn ring_geleert(&self, slot: PeerSlot) {
        self.ring_leeren[slot.index()].store(false, Ordering::Release);
    }

    /// Wird der Peer gerade gemischt?
    pub fn peer_hoerbar(&self, slot: PeerSlot) -> bool {
        self.peer_aktiv(slot) && !self.peer_stumm(slot)
    }
}

impl Default for VoiceShared {
    fn default() -> Self {
        Self::new(Q8_EINS, funkspruch_audio::MAKEUP_GAIN_Q8)
    }
}
