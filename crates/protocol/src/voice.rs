//! Voice-Protokoll (UDP)
//!
//! Definiert die binaeren Pakete zwischen Client und Relay. Alle
//! Mehrbyte-Felder sind big-endian. Kodieren schreibt in einen vom Aufrufer
//! gestellten Puffer (keine Allokation, nutzbar im Audio-Callback),
//! Dekodieren leiht die Nutzdaten direkt aus dem Empfangspuffer.
//!
//! ## Paketformate
//!
//! ```text
//! Audio (Client -> Relay), Header = 12 Bytes
//!  0  1  Typ (0x01)
//!  1  4  SenderId
//!  5  4  Sequenznummer
//!  9  1  Kanal (0 = None, 1 = Team, 2 = All, 3 = Sound)
//! 10  2  Nutzdaten-Laenge
//! 12  N  Opus-Nutzdaten
//!
//! Relay-Audio (Relay -> Client), Header = 8 Bytes
//!  0  1  Typ (0x01)
//!  1  1  Absender-Slot
//!  2  4  Sequenznummer
//!  6  2  Nutzdaten-Laenge
//!  8  N  Opus-Nutzdaten
//!
//! Auth        0x02, SenderId:4, Team:1, Kennung:33 (null-terminiert)
//! Keepalive   0x03, SenderId:1
//! TeamUpdate  0x04, SenderId:4, Team:1
//! Debug       0x05, SenderId:1, Nachricht (null-terminiert, max. 253 Bytes)
//! ```

use bytes::{Buf, BufMut};
use thiserror::Error;

use funkspruch_core::types::{PeerSlot, SenderId, Team, VoiceChannel};

/// Maximale Opus-Nutzdaten pro Paket (groesster einzelner Opus-Frame)
pub const MAX_NUTZDATEN_LAENGE: usize = 1275;

/// Empfangspuffer-Groesse; jedes gueltige Paket passt hinein
pub const MAX_DATAGRAMM_LAENGE: usize = 1400;

/// Laenge des Kennungsfelds im Auth-Paket (inklusive Null-Terminator)
pub const KENNUNG_FELD_LAENGE: usize = 33;

/// Maximale Laenge des Nachrichtenfelds im Debug-Paket (inklusive Null-Terminator)
pub const DEBUG_NACHRICHT_MAX: usize = 253;

// ---------------------------------------------------------------------------
// Pakettypen
// ---------------------------------------------------------------------------

/// Art des Pakets (erstes Byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Opus-Audio (ausgehend: Audio, eingehend: Relay-Audio)
    Audio = 0x01,
    /// Anmeldung beim Relay
    Auth = 0x02,
    /// Lebenszeichen
    Keepalive = 0x03,
    /// Teamwechsel
    TeamUpdate = 0x04,
    /// Diagnose-Nachricht (wird vom Relay protokolliert)
    Debug = 0x05,
}

impl PacketType {
    /// Konvertiert ein Byte in einen `PacketType`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Audio),
            0x02 => Some(Self::Auth),
            0x03 => Some(Self::Keepalive),
            0x04 => Some(Self::TeamUpdate),
            0x05 => Some(Self::Debug),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren oder Dekodieren eines Pakets
///
/// Enthaelt nur Zahlen, damit das Erzeugen im Echtzeit-Pfad nicht allokiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("Paket zu kurz: {erhalten} Bytes (erwartet mindestens {erwartet})")]
    ZuKurz { erwartet: usize, erhalten: usize },

    #[error("Unbekannter Pakettyp: {0:#04x}")]
    UnbekannterTyp(u8),

    #[error("Falscher Pakettyp: {erhalten:#04x} (erwartet {erwartet:#04x})")]
    FalscherTyp { erwartet: u8, erhalten: u8 },

    #[error("Peer-Slot ausserhalb des Bereichs: {0}")]
    PeerAusserhalb(u32),

    #[error("Ungueltiger Kanal: {0}")]
    UngueltigerKanal(u8),

    #[error("Nutzdaten abgeschnitten: {deklariert} Bytes deklariert, {vorhanden} vorhanden")]
    NutzdatenAbgeschnitten { deklariert: usize, vorhanden: usize },

    #[error("Nutzdaten zu gross: {0} Bytes (Maximum {MAX_NUTZDATEN_LAENGE})")]
    NutzdatenZuGross(usize),

    #[error("Textfeld nicht null-terminiert")]
    KeinTerminator,

    #[error("Textfeld ist kein gueltiges UTF-8")]
    UngueltigerText,

    #[error("Puffer zu klein: {benoetigt} Bytes benoetigt, {vorhanden} vorhanden")]
    PufferZuKlein { benoetigt: usize, vorhanden: usize },
}

pub type PacketResult<T> = Result<T, PacketError>;

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn puffer_pruefen(out: &[u8], benoetigt: usize) -> PacketResult<()> {
    if out.len() < benoetigt {
        return Err(PacketError::PufferZuKlein {
            benoetigt,
            vorhanden: out.len(),
        });
    }
    Ok(())
}

fn laenge_pruefen(buf: &[u8], erwartet: usize) -> PacketResult<()> {
    if buf.len() < erwartet {
        return Err(PacketError::ZuKurz {
            erwartet,
            erhalten: buf.len(),
        });
    }
    Ok(())
}

fn typ_pruefen(buf: &[u8], erwartet: PacketType) -> PacketResult<()> {
    laenge_pruefen(buf, 1)?;
    if buf[0] != erwartet as u8 {
        return Err(PacketError::FalscherTyp {
            erwartet: erwartet as u8,
            erhalten: buf[0],
        });
    }
    Ok(())
}

fn nutzdaten_lesen<'a>(rest: &'a [u8], deklariert: usize) -> PacketResult<&'a [u8]> {
    if deklariert > MAX_NUTZDATEN_LAENGE {
        return Err(PacketError::NutzdatenZuGross(deklariert));
    }
    if deklariert > rest.len() {
        return Err(PacketError::NutzdatenAbgeschnitten {
            deklariert,
            vorhanden: rest.len(),
        });
    }
    Ok(&rest[..deklariert])
}

/// Liest ein null-terminiertes Feld aus maximal `max` Bytes
fn cstr_lesen(feld: &[u8], max: usize) -> PacketResult<&[u8]> {
    let feld = &feld[..feld.len().min(max)];
    let ende = feld
        .iter()
        .position(|&b| b == 0)
        .ok_or(PacketError::KeinTerminator)?;
    Ok(&feld[..ende])
}

/// Kuerzt einen String auf hoechstens `max` Bytes an einer Zeichengrenze
fn kuerzen(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut ende = max;
    while !text.is_char_boundary(ende) {
        ende -= 1;
    }
    &text[..ende]
}

// ---------------------------------------------------------------------------
// Audio (Client -> Relay)
// ---------------------------------------------------------------------------

/// Ausgehendes Audio-Paket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacket<'a> {
    /// Client-Nummer des Sprechers
    pub sender: SenderId,
    /// Monoton steigende Sequenznummer
    pub sequence: u32,
    /// Gewaehlter Sprachkanal
    pub channel: VoiceChannel,
    /// Opus-Nutzdaten
    pub payload: &'a [u8],
}

impl<'a> AudioPacket<'a> {
    /// Header-Groesse in Bytes
    pub const HEADER_SIZE: usize = 12;

    /// Gesamtgroesse des Pakets in Bytes
    pub fn groesse(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Serialisiert das Paket in `out` und gibt die Laenge zurueck
    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        if self.payload.len() > MAX_NUTZDATEN_LAENGE {
            return Err(PacketError::NutzdatenZuGross(self.payload.len()));
        }
        let laenge = self.groesse();
        puffer_pruefen(out, laenge)?;

        let mut w = &mut out[..laenge];
        w.put_u8(PacketType::Audio as u8);
        w.put_u32(self.sender.0);
        w.put_u32(self.sequence);
        w.put_u8(self.channel.as_u8());
        w.put_u16(self.payload.len() as u16);
        w.put_slice(self.payload);
        Ok(laenge)
    }

    /// Deserialisiert ein Audio-Paket und validiert Laenge und Kanal
    pub fn decode(buf: &'a [u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::Audio)?;
        laenge_pruefen(buf, Self::HEADER_SIZE)?;

        let mut r = &buf[1..];
        let sender = SenderId(r.get_u32());
        let sequence = r.get_u32();
        let kanal_byte = r.get_u8();
        let channel =
            VoiceChannel::from_u8(kanal_byte).ok_or(PacketError::UngueltigerKanal(kanal_byte))?;
        let deklariert = r.get_u16() as usize;
        let payload = nutzdaten_lesen(r, deklariert)?;

        Ok(Self {
            sender,
            sequence,
            channel,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Relay-Audio (Relay -> Client)
// ---------------------------------------------------------------------------

/// Vom Relay umgeschriebenes Audio-Paket (kompakter Header, ohne Kanal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayAudioPacket<'a> {
    /// Slot des sprechenden Spielers
    pub from: PeerSlot,
    /// Sequenznummer des Absenders
    pub sequence: u32,
    /// Opus-Nutzdaten
    pub payload: &'a [u8],
}

impl<'a> RelayAudioPacket<'a> {
    /// Header-Groesse in Bytes
    pub const HEADER_SIZE: usize = 8;

    /// Umschreiben eines Audio-Pakets wie es das Relay tut: die SenderId
    /// schrumpft auf ein Byte, der Kanal entfaellt (Routing ist erledigt).
    pub fn from_audio(audio: &AudioPacket<'a>) -> PacketResult<Self> {
        let from = PeerSlot::from_index(audio.sender.0 as usize)
            .ok_or(PacketError::PeerAusserhalb(audio.sender.0))?;
        Ok(Self {
            from,
            sequence: audio.sequence,
            payload: audio.payload,
        })
    }

    /// Gesamtgroesse des Pakets in Bytes
    pub fn groesse(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Serialisiert das Paket in `out` und gibt die Laenge zurueck
    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        if self.payload.len() > MAX_NUTZDATEN_LAENGE {
            return Err(PacketError::NutzdatenZuGross(self.payload.len()));
        }
        let laenge = self.groesse();
        puffer_pruefen(out, laenge)?;

        let mut w = &mut out[..laenge];
        w.put_u8(PacketType::Audio as u8);
        w.put_u8(self.from.as_u8());
        w.put_u32(self.sequence);
        w.put_u16(self.payload.len() as u16);
        w.put_slice(self.payload);
        Ok(laenge)
    }

    /// Deserialisiert ein eingehendes Relay-Audio-Paket
    ///
    /// # Fehler
    /// - `ZuKurz` wenn der Header nicht vollstaendig ist
    /// - `PeerAusserhalb` bei einem Slot >= `MAX_PEERS`
    /// - `NutzdatenAbgeschnitten` wenn die deklarierte Laenge die empfangenen Bytes uebersteigt
    pub fn decode(buf: &'a [u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::Audio)?;
        laenge_pruefen(buf, Self::HEADER_SIZE)?;

        let mut r = &buf[1..];
        let slot_byte = r.get_u8();
        let from = PeerSlot::new(slot_byte).ok_or(PacketError::PeerAusserhalb(slot_byte as u32))?;
        let sequence = r.get_u32();
        let deklariert = r.get_u16() as usize;
        let payload = nutzdaten_lesen(r, deklariert)?;

        Ok(Self {
            from,
            sequence,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Anmeldung beim Relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPacket<'a> {
    /// Client-Nummer
    pub sender: SenderId,
    /// Aktuelles Team
    pub team: Team,
    /// Installations-Kennung (ohne Terminator, max. 32 Bytes)
    pub identifier: &'a [u8],
}

impl<'a> AuthPacket<'a> {
    /// Paketgroesse in Bytes
    pub const SIZE: usize = 1 + 4 + 1 + KENNUNG_FELD_LAENGE;

    /// Serialisiert das Paket; eine zu lange Kennung wird abgeschnitten
    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        puffer_pruefen(out, Self::SIZE)?;

        let kennung = &self.identifier[..self.identifier.len().min(KENNUNG_FELD_LAENGE - 1)];
        let mut w = &mut out[..Self::SIZE];
        w.put_u8(PacketType::Auth as u8);
        w.put_u32(self.sender.0);
        w.put_u8(self.team.0);
        w.put_slice(kennung);
        w.put_bytes(0, KENNUNG_FELD_LAENGE - kennung.len());
        Ok(Self::SIZE)
    }

    /// Deserialisiert ein Auth-Paket
    pub fn decode(buf: &'a [u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::Auth)?;
        laenge_pruefen(buf, Self::SIZE)?;

        let mut r = &buf[1..];
        let sender = SenderId(r.get_u32());
        let team = Team(r.get_u8());
        let identifier = cstr_lesen(r, KENNUNG_FELD_LAENGE)?;

        Ok(Self {
            sender,
            team,
            identifier,
        })
    }
}

// ---------------------------------------------------------------------------
// TeamUpdate
// ---------------------------------------------------------------------------

/// Teamwechsel des lokalen Spielers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamUpdatePacket {
    pub sender: SenderId,
    pub team: Team,
}

impl TeamUpdatePacket {
    /// Paketgroesse in Bytes
    pub const SIZE: usize = 6;

    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        puffer_pruefen(out, Self::SIZE)?;
        let mut w = &mut out[..Self::SIZE];
        w.put_u8(PacketType::TeamUpdate as u8);
        w.put_u32(self.sender.0);
        w.put_u8(self.team.0);
        Ok(Self::SIZE)
    }

    pub fn decode(buf: &[u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::TeamUpdate)?;
        laenge_pruefen(buf, Self::SIZE)?;
        let mut r = &buf[1..];
        Ok(Self {
            sender: SenderId(r.get_u32()),
            team: Team(r.get_u8()),
        })
    }
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Lebenszeichen (1-Byte-Sender)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepalivePacket {
    pub sender: u8,
}

impl KeepalivePacket {
    /// Paketgroesse in Bytes
    pub const SIZE: usize = 2;

    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        puffer_pruefen(out, Self::SIZE)?;
        out[0] = PacketType::Keepalive as u8;
        out[1] = self.sender;
        Ok(Self::SIZE)
    }

    pub fn decode(buf: &[u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::Keepalive)?;
        laenge_pruefen(buf, Self::SIZE)?;
        Ok(Self { sender: buf[1] })
    }
}

// ---------------------------------------------------------------------------
// Debug
// ---------------------------------------------------------------------------

/// Diagnose-Nachricht an das Relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugPacket<'a> {
    pub sender: u8,
    pub message: &'a str,
}

impl<'a> DebugPacket<'a> {
    /// Minimale Paketgroesse (leere Nachricht)
    pub const MIN_SIZE: usize = 3;
    /// Maximale Paketgroesse
    pub const MAX_SIZE: usize = 2 + DEBUG_NACHRICHT_MAX;

    /// Serialisiert das Paket; die Nachricht wird auf 252 Bytes gekuerzt
    pub fn encode_into(&self, out: &mut [u8]) -> PacketResult<usize> {
        let text = kuerzen(self.message, DEBUG_NACHRICHT_MAX - 1);
        let laenge = 2 + text.len() + 1;
        puffer_pruefen(out, laenge)?;

        let mut w = &mut out[..laenge];
        w.put_u8(PacketType::Debug as u8);
        w.put_u8(self.sender);
        w.put_slice(text.as_bytes());
        w.put_u8(0);
        Ok(laenge)
    }

    pub fn decode(buf: &'a [u8]) -> PacketResult<Self> {
        typ_pruefen(buf, PacketType::Debug)?;
        laenge_pruefen(buf, Self::MIN_SIZE)?;
        let text = cstr_lesen(&buf[2..], DEBUG_NACHRICHT_MAX)?;
        let message = std::str::from_utf8(text).map_err(|_| PacketError::UngueltigerText)?;
        Ok(Self {
            sender: buf[1],
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// Client-Pakete (Sicht des Relays)
// ---------------------------------------------------------------------------

/// Jedes Paket, das ein Client an das Relay senden kann
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPacket<'a> {
    Audio(AudioPacket<'a>),
    Auth(AuthPacket<'a>),
    Keepalive(KeepalivePacket),
    TeamUpdate(TeamUpdatePacket),
    Debug(DebugPacket<'a>),
}

impl<'a> ClientPacket<'a> {
    /// Dekodiert ein Client-Paket anhand des Typ-Bytes
    pub fn decode(buf: &'a [u8]) -> PacketResult<Self> {
        laenge_pruefen(buf, 1)?;
        match PacketType::from_u8(buf[0]) {
            Some(PacketType::Audio) => AudioPacket::decode(buf).map(Self::Audio),
            Some(PacketType::Auth) => AuthPacket::decode(buf).map(Self::Auth),
            Some(PacketType::Keepalive) => KeepalivePacket::decode(buf).map(Self::Keepalive),
            Some(PacketType::TeamUpdate) => TeamUpdatePacket::decode(buf).map(Self::TeamUpdate),
            Some(PacketType::Debug) => DebugPacket::decode(buf).map(Self::Debug),
            None => Err(PacketError::UnbekannterTyp(buf[0])),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
