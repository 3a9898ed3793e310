//! Sprach-Sitzung
//!
//! Besitzt alle Komponenten des Sprachmoduls und ist der einzige
//! Einstiegspunkt fuer das Spiel. Jede Methode laeuft auf dem
//! Hauptthread; die Audio-Callbacks sehen nur `VoiceShared` und die
//! Jitter-Ringe.
//!
//! ## Start
//! Netzwerk, Codec und Audio werden in dieser Reihenfolge gestartet.
//! Scheitert eine Stufe, werden die bereits gestarteten per Drop in
//! umgekehrter Reihenfolge abgebaut und die Sitzung bleibt `Disabled`.
//!
//! ## Tick
//! `frame()` wird einmal pro Spiel-Frame aufgerufen: Socket leeren,
//! Pakete dekodieren, Sprechanzeigen aktualisieren, Team-Wechsel und
//! Keepalive senden.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use funkspruch_audio::{
    ausgabe_gain_q8, gain_to_q8, ActiveStreams, AudioBackend, OpusEncoder,
};
use funkspruch_core::config::SprachEinstellungen;
use funkspruch_core::types::{PeerSlot, Team, VoiceChannel, MAX_PEERS};
use funkspruch_core::{FunkError, InstallId, VoiceConfig};
use funkspruch_protocol::{
    AuthPacket, DebugPacket, KeepalivePacket, RelayAudioPacket, SpeechCodecConfig,
    TeamUpdatePacket, MAX_DATAGRAMM_LAENGE,
};

use crate::error::{InitFehler, VerbindungsFehler};
use crate::host::GameHost;
use crate::jitter_buffer::{jitter_buffer, JITTER_KAPAZITAET};
use crate::mix::MixSource;
use crate::peers::{PeerPresence, PeerStatistik, PeerTable};
use crate::state::{VoiceShared, VoiceState};
use crate::transmit::TransmitPath;
use crate::transport::{relay_adresse, VoiceTransport};

/// Abstand zwischen zwei Keepalive-Paketen
pub const KEEPALIVE_INTERVALL: Duration = Duration::from_secs(10);

/// Startparameter der Sitzung
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub voice: VoiceConfig,
    pub codec: SpeechCodecConfig,
    pub identitaet: InstallId,
    /// Lokale Adresse des UDP-Sockets (Standard: beliebiger Port)
    pub lokale_adresse: SocketAddr,
}

impl SessionConfig {
    pub fn new(voice: VoiceConfig, identitaet: InstallId) -> Self {
        Self {
            voice,
            codec: SpeechCodecConfig::default(),
            identitaet,
            lokale_adresse: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        }
    }
}

/// Laufende Komponenten; Felder werden in Deklarationsreihenfolge
/// gedroppt (Audio, Decoder, Netzwerk)
struct Komponenten {
    streams: Box<dyn ActiveStreams>,
    peers: PeerTable,
    transport: VoiceTransport,
}

/// Die Sprach-Sitzung eines Spielclients
pub struct Session {
    shared: Arc<VoiceShared>,
    komponenten: Option<Komponenten>,
    init_fehler: Option<InitFehler>,
    einstellungen: SprachEinstellungen,
    identitaet: InstallId,
    gesendetes_team: Option<Team>,
    letzter_keepalive: Option<Instant>,
    empfangspuffer: [u8; MAX_DATAGRAMM_LAENGE],
    verworfen: u64,
    gemeldete_sendefehler: u64,
    gemeldete_kodierfehler: u64,
    gemeldete_streamfehler: u32,
}

impl Session {
    /// Startet die Sitzung
    ///
    /// Schlaegt nie fehl: bei einem Fehler ist die Sitzung `Disabled` und
    /// `init_fehler()` nennt die gescheiterte Stufe.
    pub fn init(config: SessionConfig, backend: &mut dyn AudioBackend) -> Self {
        let einstellungen = config.voice.voice.clone();
        let shared = Arc::new(VoiceShared::new(
            gain_to_q8(einstellungen.input_gain),
            ausgabe_gain_q8(einstellungen.output_volume),
        ));
        shared.zustand_setzen(VoiceState::Disabled);

        let mut session = Self {
            shared,
            komponenten: None,
            init_fehler: None,
            einstellungen,
            identitaet: config.identitaet.clone(),
            gesendetes_team: None,
            letzter_keepalive: None,
            empfangspuffer: [0; MAX_DATAGRAMM_LAENGE],
            verworfen: 0,
            gemeldete_sendefehler: 0,
            gemeldete_kodierfehler: 0,
            gemeldete_streamfehler: 0,
        };

        if !session.einstellungen.enabled {
            info!("Sprachmodul in der Konfiguration deaktiviert");
            session.init_fehler = Some(InitFehler::Deaktiviert);
            return session;
        }

        match komponenten_starten(&config, &session.shared, backend) {
            Ok(komponenten) => {
                info!(
                    lokal = ?komponenten.transport.lokale_adresse().ok(),
                    aufnahme = komponenten.streams.has_capture(),
                    "Sprachmodul bereit"
                );
                session.komponenten = Some(komponenten);
                session.shared.zustand_setzen(VoiceState::Idle);
            }
            Err(e) => {
                warn!(fehler = %e, "Sprachmodul deaktiviert");
                session.init_fehler = Some(e);
            }
        }
        session
    }

    // -----------------------------------------------------------------------
    // Verbindung
    // -----------------------------------------------------------------------

    /// Verbindet mit dem Relay des aktuellen Spielservers
    ///
    /// Sendet genau ein Auth-Paket. Bei Fehlern ist der Zustand `Error`.
    pub fn verbinden(&mut self, host: &dyn GameHost) -> Result<SocketAddr, VerbindungsFehler> {
        if self.komponenten.is_none() {
            return Err(VerbindungsFehler::Deaktiviert);
        }
        self.trennen();
        self.shared.zustand_setzen(VoiceState::Connecting);

        let sender = host.sender_id();
        let team = host.team();
        self.shared.sender_id_setzen(sender);

        match self.relay_verbinden(host, team) {
            Ok(relay) => {
                self.shared.verbunden_setzen(true);
                self.shared.zustand_setzen(VoiceState::Idle);
                self.gesendetes_team = Some(team);
                self.letzter_keepalive = Some(Instant::now());
                info!(%relay, %sender, %team, "Mit Relay verbunden");
                Ok(relay)
            }
            Err(e) => {
                if let Some(k) = self.komponenten.as_mut() {
                    k.transport.trennen();
                }
                self.shared.zustand_setzen(VoiceState::Error);
                warn!(fehler = %e, "Verbindung zum Relay fehlgeschlagen");
                Err(e.into())
            }
        }
    }

    fn relay_verbinden(&mut self, host: &dyn GameHost, team: Team) -> funkspruch_core::Result<SocketAddr> {
        let k = self
            .komponenten
            .as_mut()
            .ok_or_else(|| FunkError::Verbindung("Sitzung deaktiviert".into()))?;
        let server = host
            .server_adresse()
            .ok_or_else(|| FunkError::Verbindung("keine Spielserver-Adresse".into()))?;

        let relay = relay_adresse(server, self.einstellungen.relay_port_offset)?;
        k.transport.verbinden(relay)?;

        let mut puffer = [0u8; AuthPacket::SIZE];
        let n = AuthPacket {
            sender: self.shared.sender_id(),
            team,
            identifier: self.identitaet.as_bytes(),
        }
        .encode_into(&mut puffer)
        .map_err(|e| FunkError::Verbindung(e.to_string()))?;
        k.transport.senden(&puffer[..n])?;
        debug!(%relay, bytes = n, "Auth gesendet");
        Ok(relay)
    }

    /// Trennt vom Relay (idempotent)
    ///
    /// Beendet das Senden und setzt alle Peers zurueck. Der Socket bleibt
    /// gebunden, weil der Capture-Callback ihn mitbenutzt.
    pub fn trennen(&mut self) {
        let Some(k) = self.komponenten.as_mut() else {
            return;
        };
        let war_verbunden = self.shared.ist_verbunden();

        self.shared.verbunden_setzen(false);
        self.shared.kanal_setzen(VoiceChannel::None);
        self.shared.zustand_setzen(VoiceState::Idle);
        self.shared.eingangspegel_setzen(0);
        k.transport.trennen();
        k.peers.alle_zuruecksetzen();
        self.gesendetes_team = None;
        self.letzter_keepalive = None;

        if war_verbunden {
            info!("Vom Relay getrennt");
        }
    }

    /// Baut Audio, Codec und Netzwerk ab; die Sitzung ist danach `Disabled`
    pub fn shutdown(&mut self) {
        self.shared.verbunden_setzen(false);
        self.shared.kanal_setzen(VoiceChannel::None);
        self.shared.zustand_setzen(VoiceState::Disabled);

        if let Some(Komponenten {
            streams,
            peers,
            transport,
        }) = self.komponenten.take()
        {
            // Der Encoder gehoert dem Capture-Handler und endet mit den Streams
            drop(streams);
            debug!("Audio-Streams beendet");
            drop(peers);
            debug!("Decoder freigegeben");
            drop(transport);
            info!("Sprachmodul beendet");
        }
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Beginnt das Senden auf `kanal`
    ///
    /// Nur aus `Idle`, nur verbunden und nur mit Mikrofon; sonst ohne
    /// Wirkung. Liefert `true` wenn gesendet wird.
    pub fn start_transmit(&mut self, kanal: VoiceChannel) -> bool {
        let Some(k) = self.komponenten.as_ref() else {
            return false;
        };
        if !matches!(kanal, VoiceChannel::Team | VoiceChannel::All) {
            return false;
        }
        if self.shared.zustand() != VoiceState::Idle
            || !self.shared.ist_verbunden()
            || !k.streams.has_capture()
        {
            debug!(
                zustand = %self.shared.zustand(),
                verbunden = self.shared.ist_verbunden(),
                aufnahme = k.streams.has_capture(),
                "Senden nicht moeglich"
            );
            return false;
        }

        // Kanal vor dem Zustand, der Capture-Thread liest in umgekehrter Folge
        self.shared.kanal_setzen(kanal);
        self.shared.zustand_setzen(VoiceState::Transmitting);
        debug!(%kanal, "Senden gestartet");
        true
    }

    /// Beendet das Senden; Zustand ist danach `Idle`
    pub fn stop_transmit(&mut self) {
        if self.komponenten.is_none() {
            return;
        }
        let sendete = self.shared.zustand() == VoiceState::Transmitting;
        self.shared.zustand_setzen(VoiceState::Idle);
        self.shared.kanal_setzen(VoiceChannel::None);
        self.shared.eingangspegel_setzen(0);
        if sendete {
            debug!("Senden beendet");
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Verarbeitet einen Spiel-Frame
    pub fn frame(&mut self, host: &dyn GameHost, jetzt: Instant) {
        let Some(k) = self.komponenten.as_mut() else {
            return;
        };
        let verbunden = self.shared.ist_verbunden();

        loop {
            let n = match k.transport.empfangen(&mut self.empfangspuffer) {
                Ok(Some(n)) => n,
                Ok(None) => break,
                Err(e) => {
                    debug!(fehler = %e, "Empfang abgebrochen");
                    break;
                }
            };
            if !verbunden {
                continue;
            }
            match RelayAudioPacket::decode(&self.empfangspuffer[..n]) {
                Ok(paket) => {
                    k.peers.paket_empfangen(&paket, jetzt);
                }
                Err(e) => {
                    self.verworfen += 1;
                    trace!(fehler = %e, bytes = n, "Paket verworfen");
                }
            }
        }

        k.peers.aktualisieren(jetzt);

        if verbunden {
            let sender = host.sender_id();
            self.shared.sender_id_setzen(sender);

            let team = host.team();
            if self.gesendetes_team != Some(team) {
                let mut puffer = [0u8; TeamUpdatePacket::SIZE];
                if let Ok(n) = (TeamUpdatePacket { sender, team }).encode_into(&mut puffer) {
                    match k.transport.senden(&puffer[..n]) {
                        Ok(()) => debug!(%team, "Team-Wechsel gemeldet"),
                        Err(e) => debug!(fehler = %e, "Team-Update nicht gesendet"),
                    }
                }
                self.gesendetes_team = Some(team);
            }

            let faellig = self
                .letzter_keepalive
                .map_or(true, |t| jetzt.saturating_duration_since(t) > KEEPALIVE_INTERVALL);
            if faellig {
                let mut puffer = [0u8; KeepalivePacket::SIZE];
                let paket = KeepalivePacket {
                    sender: sender.as_u8(),
                };
                if let Ok(n) = paket.encode_into(&mut puffer) {
                    if let Err(e) = k.transport.senden(&puffer[..n]) {
                        debug!(fehler = %e, "Keepalive nicht gesendet");
                    }
                }
                self.letzter_keepalive = Some(jetzt);
            }
        }

        let streamfehler = k.streams.stream_errors();
        if streamfehler > self.gemeldete_streamfehler {
            warn!(
                neu = streamfehler - self.gemeldete_streamfehler,
                gesamt = streamfehler,
                "Audio-Stream meldet Fehler"
            );
            self.gemeldete_streamfehler = streamfehler;
        }
        self.zaehler_melden();
    }

    /// Protokolliert neue Fehler aus dem Capture-Pfad
    fn zaehler_melden(&mut self) {
        let sendefehler = self.shared.sendefehler.load(Ordering::Relaxed);
        if sendefehler > self.gemeldete_sendefehler {
            warn!(
                neu = sendefehler - self.gemeldete_sendefehler,
                gesamt = sendefehler,
                "Audio-Pakete konnten nicht gesendet werden"
            );
            self.gemeldete_sendefehler = sendefehler;
        }

        let kodierfehler = self.shared.kodierfehler.load(Ordering::Relaxed);
        if kodierfehler > self.gemeldete_kodierfehler {
            warn!(
                neu = kodierfehler - self.gemeldete_kodierfehler,
                gesamt = kodierfehler,
                "Opus-Kodierung fehlgeschlagen"
            );
            self.gemeldete_kodierfehler = kodierfehler;
        }
    }

    // -----------------------------------------------------------------------
    // Peers
    // -----------------------------------------------------------------------

    /// Spieler hat das Spiel verlassen: Decoder und Zustand des Slots freigeben
    pub fn peer_getrennt(&mut self, slot: PeerSlot) {
        if let Some(k) = self.komponenten.as_mut() {
            k.peers.peer_getrennt(slot);
            debug!(%slot, "Peer zurueckgesetzt");
        }
    }

    /// Lokale Stummschaltung eines Slots
    pub fn stumm_setzen(&mut self, slot: PeerSlot, stumm: bool) {
        match self.komponenten.as_mut() {
            Some(k) => k.peers.stumm_setzen(slot, stumm),
            None => self.shared.peer_stumm_setzen(slot, stumm),
        }
        info!(%slot, stumm, "Stummschaltung geaendert");
    }

    /// Stummschaltung ueber den Spielernamen; `None` wenn der Name unbekannt ist
    pub fn stumm_nach_name(
        &mut self,
        host: &dyn GameHost,
        name: &str,
        stumm: bool,
    ) -> Option<PeerSlot> {
        let slot = host.slot_by_name(name)?;
        self.stumm_setzen(slot, stumm);
        Some(slot)
    }

    pub fn praesenz(&self, slot: PeerSlot) -> PeerPresence {
        match &self.komponenten {
            Some(k) => k.peers.praesenz(slot),
            None => PeerPresence::default(),
        }
    }

    /// Slots, die im letzten Tick gesprochen haben
    pub fn sprechende(&self) -> Vec<PeerSlot> {
        match &self.komponenten {
            Some(k) => k.peers.sprechende().collect(),
            None => Vec::new(),
        }
    }

    pub fn peer_statistik(&self, slot: PeerSlot) -> Option<PeerStatistik> {
        self.komponenten.as_ref().map(|k| k.peers.statistik(slot))
    }

    // -----------------------------------------------------------------------
    // Diagnose
    // -----------------------------------------------------------------------

    /// Sendet eine Debug-Nachricht an das Relay (wird bei Bedarf gekuerzt)
    pub fn debug_senden(&mut self, text: &str) -> bool {
        let Some(k) = self.komponenten.as_ref() else {
            return false;
        };
        if !self.shared.ist_verbunden() {
            return false;
        }
        let mut puffer = [0u8; DebugPacket::MAX_SIZE];
        let paket = DebugPacket {
            sender: self.shared.sender_id().as_u8(),
            message: text,
        };
        let gesendet = paket
            .encode_into(&mut puffer)
            .ok()
            .is_some_and(|n| k.transport.senden(&puffer[..n]).is_ok());
        debug!(gesendet, "Debug-Nachricht");
        gesendet
    }

    pub fn zustand(&self) -> VoiceState {
        self.shared.zustand()
    }

    pub fn kanal(&self) -> VoiceChannel {
        self.shared.kanal()
    }

    pub fn ist_verbunden(&self) -> bool {
        self.shared.ist_verbunden()
    }

    pub fn ist_deaktiviert(&self) -> bool {
        self.komponenten.is_none()
    }

    /// Grund der Deaktivierung, falls der Start gescheitert ist
    pub fn init_fehler(&self) -> Option<&InitFehler> {
        self.init_fehler.as_ref()
    }

    /// Gibt es ein Mikrofon?
    pub fn hat_aufnahme(&self) -> bool {
        self.komponenten
            .as_ref()
            .is_some_and(|k| k.streams.has_capture())
    }

    /// Spitzenpegel des zuletzt gesendeten Frames (0..=100)
    pub fn eingangspegel(&self) -> u8 {
        self.shared.eingangspegel()
    }

    pub fn relay(&self) -> Option<SocketAddr> {
        self.komponenten.as_ref().and_then(|k| k.transport.relay())
    }

    pub fn einstellungen(&self) -> &SprachEinstellungen {
        &self.einstellungen
    }

    /// Anzahl der verworfenen (fehlerhaften) Datagramme
    pub fn verworfene_pakete(&self) -> u64 {
        self.verworfen
    }

    /// Momentaufnahme fuer `voice_status`
    pub fn status(&self) -> VoiceStatus {
        let stumm = match &self.komponenten {
            Some(k) => PeerSlot::all()
                .filter(|s| k.peers.praesenz(*s).muted)
                .collect(),
            None => PeerSlot::all()
                .filter(|s| self.shared.peer_stumm(*s))
                .collect(),
        };
        let puffer_voll = self.komponenten.as_ref().map_or(0, |k| {
            PeerSlot::all()
                .map(|s| k.peers.statistik(s).puffer_voll)
                .sum()
        });
        VoiceStatus {
            zustand: self.zustand(),
            kanal: self.kanal(),
            verbunden: self.ist_verbunden(),
            relay: self.relay(),
            aufnahme: self.hat_aufnahme(),
            eingangspegel: self
                .einstellungen
                .show_meter
                .then(|| self.eingangspegel()),
            sequenz: self.shared.sequenz.load(Ordering::Relaxed),
            gesendet: self.shared.gesendet.load(Ordering::Relaxed),
            sendefehler: self.shared.sendefehler.load(Ordering::Relaxed),
            gemischt: self.shared.gemischte_frames.load(Ordering::Relaxed),
            verworfen: self.verworfen,
            puffer_voll,
            sprechende: self.sprechende(),
            stumm,
            init_fehler: self.init_fehler.as_ref().map(|e| e.to_string()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn komponenten_starten(
    config: &SessionConfig,
    shared: &Arc<VoiceShared>,
    backend: &mut dyn AudioBackend,
) -> Result<Komponenten, InitFehler> {
    let transport = VoiceTransport::binden_an(config.lokale_adresse).map_err(InitFehler::Netzwerk)?;
    debug!("Netzwerk bereit");

    let encoder = OpusEncoder::new(config.codec).map_err(InitFehler::Codec)?;
    debug!(bitrate_kbps = config.codec.bitrate_kbps, "Encoder bereit");

    let (writers, readers): (Vec<_>, Vec<_>) = (0..MAX_PEERS)
        .map(|_| jitter_buffer(JITTER_KAPAZITAET))
        .unzip();

    let sink = TransmitPath::new(encoder, transport.sende_socket(), Arc::clone(shared));
    let source = MixSource::new(readers, Arc::clone(shared));
    let streams = backend
        .open(Box::new(sink), Box::new(source))
        .map_err(InitFehler::Audio)?;
    if !streams.has_capture() {
        warn!("Kein Mikrofon verfuegbar, nur Zuhoeren");
    }

    Ok(Komponenten {
        streams,
        peers: PeerTable::new(writers, Arc::clone(shared)),
        transport,
    })
}

/// Statusbericht der Sitzung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStatus {
    pub zustand: VoiceState,
    pub kanal: VoiceChannel,
    pub verbunden: bool,
    pub relay: Option<SocketAddr>,
    pub aufnahme: bool,
    /// `None` wenn die Pegelanzeige abgeschaltet ist
    pub eingangspegel: Option<u8>,
    pub sequenz: u32,
    pub gesendet: u64,
    pub sendefehler: u64,
    pub gemischt: u64,
    pub verworfen: u64,
    /// Wegen vollem Jitter-Ring verworfene Frames (alle Peers)
    pub puffer_voll: u64,
    pub sprechende: Vec<PeerSlot>,
    pub stumm: Vec<PeerSlot>,
    pub init_fehler: Option<String>,
}

impl std::fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice: {}", self.zustand)?;
        if self.zustand == VoiceState::Transmitting {
            write!(f, " ({})", self.kanal)?;
        }
        writeln!(f)?;
        if let Some(fehler) = &self.init_fehler {
            writeln!(f, "  init: {fehler}")?;
        }
        match self.relay {
            Some(relay) if self.verbunden => writeln!(f, "  relay: {relay}")?,
            _ => writeln!(f, "  relay: nicht verbunden")?,
        }
        writeln!(
            f,
            "  mikrofon: {}",
            if self.aufnahme { "ja" } else { "nein" }
        )?;
        if let Some(pegel) = self.eingangspegel {
            writeln!(f, "  pegel: {pegel}%")?;
        }
        writeln!(
            f,
            "  pakete: {} gesendet, {} Fehler, {} verworfen, seq {}",
            self.gesendet, self.sendefehler, self.verworfen, self.sequenz
        )?;
        writeln!(
            f,
            "  frames: {} gemischt, {} bei vollem Puffer verworfen",
            self.gemischt, self.puffer_voll
        )?;
        write!(f, "  sprechend:")?;
        for slot in &self.sprechende {
            write!(f, " {}", slot.as_u8())?;
        }
        writeln!(f)?;
        write!(f, "  stumm:")?;
        for slot in &self.stumm {
            write!(f, " {}", slot.as_u8())?;
        }
        Ok(())
    }
}
