//! Schnittstelle zum Spiel
//!
//! Die Sitzung fragt pro Tick nur diese Werte ab. Im Spiel liefert sie
//! die Engine, im Headless-Host die Konfiguration.

use funkspruch_core::types::{PeerSlot, SenderId, Team};

/// Vom Spiel bereitgestellte Informationen
pub trait GameHost {
    /// Client-Nummer des lokalen Spielers (wird zur SenderId)
    fn sender_id(&self) -> SenderId;

    /// Aktuelles Team des lokalen Spielers
    fn team(&self) -> Team;

    /// Adresse des Spielservers (`host:port`), `None` ohne Verbindung
    fn server_adresse(&self) -> Option<&str>;

    /// Slot eines Spielers anhand seines Namens (ohne Gross-/Kleinschreibung)
    fn slot_by_name(&self, name: &str) -> Option<PeerSlot>;
}
