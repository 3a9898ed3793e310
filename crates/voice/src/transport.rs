//! UDP-Transport zum Relay
//!
//! Ein nicht-blockierender Socket pro Sitzung. Das Relay lauscht auf dem
//! Port des Spielservers plus einem festen Abstand. Nach `verbinden` ist
//! der Socket auf das Relay festgelegt: `send` geht nur dorthin und
//! Datagramme anderer Absender werden vom Betriebssystem verworfen.
//!
//! Der Socket liegt in einem `Arc`, weil der Capture-Callback direkt aus
//! dem Audio-Thread sendet.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use tracing::{debug, info};

use funkspruch_core::{FunkError, Result};

/// Berechnet die Relay-Adresse aus der Adresse des Spielservers
///
/// Die Adresse wird zuerst numerisch geparst, danach per Namensaufloesung.
pub fn relay_adresse(server: &str, offset: u16) -> Result<SocketAddr> {
    let server = server.trim();
    let spielserver = match server.parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(_) => server
            .to_socket_addrs()
            .map_err(|e| FunkError::Adresse(format!("{server}: {e}")))?
            .next()
            .ok_or_else(|| FunkError::Adresse(format!("{server}: keine Adresse gefunden")))?,
    };

    let port = spielserver
        .port()
        .checked_add(offset)
        .ok_or_else(|| FunkError::Adresse(format!("{server}: Relay-Port ausserhalb des Bereichs")))?;
    Ok(SocketAddr::new(spielserver.ip(), port))
}

/// Nicht-blockierender UDP-Socket der Sitzung
pub struct VoiceTransport {
    socket: Arc<UdpSocket>,
    relay: Option<SocketAddr>,
}

impl VoiceTransport {
    /// Bindet einen Socket auf der angegebenen lokalen Adresse
    pub fn binden_an(lokal: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(lokal)?;
        socket.set_nonblocking(true)?;
        debug!(lokal = %socket.local_addr()?, "UDP-Socket gebunden");
        Ok(Self {
            socket: Arc::new(socket),
            relay: None,
        })
    }

    /// Legt den Socket auf das Relay fest
    ///
    /// Der Socket ist IPv4-gebunden; ein IPv6-Relay schlaegt hier fehl.
    pub fn verbinden(&mut self, relay: SocketAddr) -> Result<()> {
        self.socket
            .connect(relay)
            .map_err(|e| FunkError::Verbindung(format!("{relay}: {e}")))?;
        self.relay = Some(relay);
        info!(%relay, "Relay-Ziel gesetzt");
        Ok(())
    }

    /// Vergisst das Relay; gesendet wird erst nach erneutem `verbinden`
    pub fn trennen(&mut self) {
        self.relay = None;
    }

    pub fn relay(&self) -> Option<SocketAddr> {
        self.relay
    }

    pub fn lokale_adresse(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sendet ein Datagramm an das Relay (best effort)
    pub fn senden(&self, daten: &[u8]) -> io::Result<()> {
        if self.relay.is_none() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "kein Relay"));
        }
        self.socket.send(daten).map(|_| ())
    }

    /// Liest ein Datagramm; `None` wenn keines mehr wartet
    pub fn empfangen(&self, puffer: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(puffer) {
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Socket fuer den Capture-Callback
    pub fn sende_socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_port_ist_spielport_plus_offset() {
        let relay = relay_adresse("203.0.113.5:27960", 1).unwrap();
        assert_eq!(relay, "203.0.113.5:27961".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn anderer_offset() {
        let relay = relay_adresse("10.0.0.1:27960", 10).unwrap();
        assert_eq!(relay.port(), 27970);
    }

    #[test]
    fn hostname_wird_aufgeloest() {
        let relay = relay_adresse("localhost:27960", 1).unwrap();
        assert!(relay.ip().is_loopback());
        assert_eq!(relay.port(), 27961);
    }

    #[test]
    fn port_ueberlauf_ist_fehler() {
        assert!(relay_adresse("127.0.0.1:65535", 1).is_err());
    }

    #[test]
    fn unaufloesbare_adresse_ist_fehler() {
        assert!(matches!(
            relay_adresse("kein port", 1),
            Err(FunkError::Adresse(_))
        ));
    }

    #[test]
    fn senden_ohne_relay_schlaegt_fehl() {
        let t = VoiceTransport::binden_an("127.0.0.1:0".parse().unwrap()).unwrap();
        let e = t.senden(&[1, 2, 3]).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn empfangen_ohne_daten_blockiert_nicht() {
        let t = VoiceTransport::binden_an("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut puffer = [0u8; 64];
        assert_eq!(t.empfangen(&mut puffer).unwrap(), None);
    }

    #[test]
    fn datagramm_an_relay() {
        let relay = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut t = VoiceTransport::binden_an("127.0.0.1:0".parse().unwrap()).unwrap();
        t.verbinden(relay.local_addr().unwrap()).unwrap();
        t.senden(&[0x03, 7]).unwrap();

        let mut puffer = [0u8; 16];
        let (n, von) = relay.recv_from(&mut puffer).unwrap();
        assert_eq!(&puffer[..n], &[0x03, 7]);
        assert_eq!(von, t.lokale_adresse().unwrap());
    }
}
