//! Gemeinsame Identifikationstypen fuer Funkspruch
//!
//! Peer-Slots, Sender-IDs und Teams verwenden das Newtype-Pattern, damit
//! Client-Nummer, Slot-Index und Team-Wert nicht verwechselt werden koennen.

use serde::{Deserialize, Serialize};

/// Maximale Anzahl gleichzeitiger Spieler (und damit Peer-Slots)
pub const MAX_PEERS: usize = 64;

/// Index eines entfernten Spielers (0..MAX_PEERS)
///
/// Kann nur ueber [`PeerSlot::new`] erzeugt werden und ist damit immer gueltig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerSlot(u8);

impl PeerSlot {
    /// Erstellt einen Slot, sofern der Index im gueltigen Bereich liegt
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < MAX_PEERS).then_some(Self(index))
    }

    /// Erstellt einen Slot aus einem usize-Index
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::new)
    }

    /// Gibt den Slot als Array-Index zurueck
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Gibt den Slot als Byte zurueck (Wire-Format)
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Iteriert ueber alle gueltigen Slots
    pub fn all() -> impl Iterator<Item = PeerSlot> {
        (0..MAX_PEERS as u8).map(PeerSlot)
    }
}

impl std::fmt::Display for PeerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Kennung des lokalen Spielers gegenueber dem Relay (Client-Nummer des Spiels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SenderId(pub u32);

impl SenderId {
    /// Kurzform fuer Pakete mit 1-Byte-Senderfeld (Keepalive, Debug)
    pub fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Team-Wert wie ihn das Spiel meldet (0 = frei, 1/2 = Teams, 3 = Zuschauer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Team(pub u8);

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team:{}", self.0)
    }
}

/// Routing-Kategorie einer Sprachuebertragung
///
/// Entscheidet ueber die Verteilung im Relay (Team = nur eigenes Team,
/// All = alle verbundenen Spieler).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VoiceChannel {
    /// Keine Uebertragung
    #[default]
    None = 0,
    /// Nur an das eigene Team
    Team = 1,
    /// An alle Spieler
    All = 2,
    /// Reserviert fuer die Sound-Wiedergabe des Servers
    Sound = 3,
}

impl VoiceChannel {
    /// Konvertiert ein Byte in einen `VoiceChannel`
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::Team),
            2 => Some(Self::All),
            3 => Some(Self::Sound),
            _ => None,
        }
    }

    /// Gibt den Wire-Wert zurueck
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Anzeigename fuer Status-Ausgaben
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Team => "team",
            Self::All => "all",
            Self::Sound => "sound",
        }
    }
}

impl std::fmt::Display for VoiceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
