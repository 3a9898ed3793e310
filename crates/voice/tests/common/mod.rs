//! Hilfen fuer die Sitzungs-Tests: Skript-Backend, Test-Host, Fake-Relay

#![allow(dead_code)]

use std::cell::Cell;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use funkspruch_audio::{
    ActiveStreams, AudioBackend, AudioError, AudioResult, FrameSink, FrameSource, MonoFrame,
    OpusEncoder, StereoFrame, STILLE_MONO, STILLE_STEREO,
};
use funkspruch_core::types::{PeerSlot, SenderId, Team};
use funkspruch_core::{InstallId, VoiceConfig};
use funkspruch_protocol::{
    ClientPacket, RelayAudioPacket, SpeechCodecConfig, MAX_DATAGRAMM_LAENGE, MAX_NUTZDATEN_LAENGE,
};
use funkspruch_voice::{GameHost, Session, SessionConfig};

// ---------------------------------------------------------------------------
// Skript-Backend
// ---------------------------------------------------------------------------

/// Vom Backend uebernommene Handler; der Test treibt sie von Hand
#[derive(Default)]
pub struct Handler {
    pub sink: Option<Box<dyn FrameSink>>,
    pub source: Option<Box<dyn FrameSource>>,
    pub geoeffnet: u32,
}

pub struct SkriptBackend {
    pub handler: Arc<Mutex<Handler>>,
    pub aufnahme: bool,
    pub fehlschlagen: bool,
}

impl SkriptBackend {
    pub fn new() -> Self {
        Self {
            handler: Arc::default(),
            aufnahme: true,
            fehlschlagen: false,
        }
    }

    pub fn ohne_mikrofon() -> Self {
        Self {
            aufnahme: false,
            ..Self::new()
        }
    }

    /// Simuliert einen Capture-Callback
    pub fn aufnehmen(&self, frame: &MonoFrame) {
        let mut h = self.handler.lock();
        h.sink.as_mut().expect("kein Capture-Handler").capture_frame(frame);
    }

    /// Simuliert einen Playback-Callback
    pub fn abspielen(&self) -> StereoFrame {
        let mut out = STILLE_STEREO;
        let mut h = self.handler.lock();
        h.source.as_mut().expect("kein Playback-Handler").fill_frame(&mut out);
        out
    }

    pub fn geoeffnet(&self) -> u32 {
        self.handler.lock().geoeffnet
    }
}

struct SkriptStreams {
    aufnahme: bool,
}

impl ActiveStreams for SkriptStreams {
    fn has_capture(&self) -> bool {
        self.aufnahme
    }

    fn stream_errors(&self) -> u32 {
        0
    }
}

impl AudioBackend for SkriptBackend {
    fn open(
        &mut self,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
    ) -> AudioResult<Box<dyn ActiveStreams>> {
        let mut h = self.handler.lock();
        h.geoeffnet += 1;
        if self.fehlschlagen {
            return Err(AudioError::KeinStandardAusgabegeraet);
        }
        h.sink = Some(sink);
        h.source = Some(source);
        Ok(Box::new(SkriptStreams {
            aufnahme: self.aufnahme,
        }))
    }
}

// ---------------------------------------------------------------------------
// Test-Host
// ---------------------------------------------------------------------------

pub struct TestHost {
    pub sender: SenderId,
    pub team: Cell<Team>,
    pub server: Option<String>,
    pub spieler: Vec<(String, PeerSlot)>,
}

impl TestHost {
    pub fn new(server: Option<String>) -> Self {
        Self {
            sender: SenderId(7),
            team: Cell::new(Team(1)),
            server,
            spieler: vec![
                ("Hans".into(), slot(3)),
                ("Big Bob".into(), slot(12)),
            ],
        }
    }
}

impl GameHost for TestHost {
    fn sender_id(&self) -> SenderId {
        self.sender
    }

    fn team(&self) -> Team {
        self.team.get()
    }

    fn server_adresse(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn slot_by_name(&self, name: &str) -> Option<PeerSlot> {
        self.spieler
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, s)| *s)
    }
}

// ---------------------------------------------------------------------------
// Fake-Relay
// ---------------------------------------------------------------------------

/// UDP-Socket auf Port R; der Spielserver liegt scheinbar auf R - 1
pub struct FakeRelay {
    pub socket: UdpSocket,
    pub client: Option<SocketAddr>,
}

impl FakeRelay {
    pub fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self {
            socket,
            client: None,
        }
    }

    pub fn spielserver(&self) -> String {
        let port = self.socket.local_addr().unwrap().port();
        format!("127.0.0.1:{}", port - 1)
    }

    /// Naechstes Datagramm des Clients (merkt sich dessen Adresse)
    pub fn empfangen(&mut self) -> Vec<u8> {
        let mut puffer = [0u8; MAX_DATAGRAMM_LAENGE];
        let (n, von) = self.socket.recv_from(&mut puffer).unwrap();
        self.client = Some(von);
        puffer[..n].to_vec()
    }

    /// Prueft, dass innerhalb kurzer Zeit nichts mehr ankommt
    pub fn nichts_mehr(&self) -> bool {
        self.socket
            .set_read_timeout(Some(Duration::from_millis(150)))
            .unwrap();
        let mut puffer = [0u8; MAX_DATAGRAMM_LAENGE];
        let leer = self.socket.recv_from(&mut puffer).is_err();
        self.socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        leer
    }

    pub fn senden(&self, daten: &[u8]) {
        let client = self.client.expect("Client-Adresse unbekannt");
        self.socket.send_to(daten, client).unwrap();
    }

    /// Sendet einen kodierten Frame als Relay-Audio
    pub fn audio_senden(&self, encoder: &mut OpusEncoder, von: PeerSlot, sequence: u32) {
        let mut nutzdaten = [0u8; MAX_NUTZDATEN_LAENGE];
        let n = encoder.encode_into(&laut(), &mut nutzdaten).unwrap();
        let paket = RelayAudioPacket {
            from: von,
            sequence,
            payload: &nutzdaten[..n],
        };
        let mut puffer = [0u8; MAX_DATAGRAMM_LAENGE];
        let laenge = paket.encode_into(&mut puffer).unwrap();
        self.senden(&puffer[..laenge]);
    }
}

/// Dekodiert ein empfangenes Client-Paket
pub fn client_paket(roh: &[u8]) -> ClientPacket<'_> {
    ClientPacket::decode(roh).unwrap()
}

// ---------------------------------------------------------------------------
// Sonstiges
// ---------------------------------------------------------------------------

pub fn slot(n: u8) -> PeerSlot {
    PeerSlot::new(n).unwrap()
}

pub fn laut() -> MonoFrame {
    let mut f = STILLE_MONO;
    for (i, s) in f.iter_mut().enumerate() {
        *s = if i % 48 < 24 { 8192 } else { -8192 };
    }
    f
}

pub fn encoder() -> OpusEncoder {
    OpusEncoder::new(SpeechCodecConfig::default()).unwrap()
}

pub fn session_config() -> SessionConfig {
    let mut config = SessionConfig::new(VoiceConfig::default(), InstallId::generieren());
    config.lokale_adresse = "127.0.0.1:0".parse().unwrap();
    config
}

pub fn session(backend: &mut SkriptBackend) -> Session {
    Session::init(session_config(), backend)
}

/// Ruft `frame()` auf, bis `bedingung` erfuellt ist (Loopback braucht etwas Zeit)
pub fn ticken_bis(
    session: &mut Session,
    host: &TestHost,
    mut bedingung: impl FnMut(&Session) -> bool,
) -> bool {
    for _ in 0..200 {
        session.frame(host, Instant::now());
        if bedingung(session) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Verbundene Sitzung samt Relay (Auth bereits abgeholt)
pub fn verbunden(backend: &mut SkriptBackend) -> (Session, TestHost, FakeRelay) {
    let mut relay = FakeRelay::new();
    let host = TestHost::new(Some(relay.spielserver()));
    let mut session = session(backend);
    session.verbinden(&host).unwrap();
    relay.empfangen();
    (session, host, relay)
}
