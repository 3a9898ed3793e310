//! funkspruch-host – Headless-Host fuer das Sprachmodul
//!
//! Ersetzt das Spiel: liefert Client-Nummer, Team, Serveradresse und
//! Spielerliste aus der Konfiguration und reicht Konsolenzeilen an die
//! Sitzung weiter.

pub mod config;
pub mod logging;

use thiserror::Error;

use funkspruch_core::types::{PeerSlot, SenderId, Team};
use funkspruch_voice::{parse_command, CommandError, GameHost, VoiceCommand};

use config::HostEinstellungen;

/// Spielzustand aus der Konfiguration
#[derive(Debug, Clone)]
pub struct StaticHost {
    sender: SenderId,
    team: Team,
    server: Option<String>,
    spieler: Vec<(String, PeerSlot)>,
}

impl StaticHost {
    pub fn aus_config(einstellungen: &HostEinstellungen) -> Self {
        let server = einstellungen.server_address.trim();
        let spieler = einstellungen
            .players
            .iter()
            .filter_map(|s| match PeerSlot::new(s.slot) {
                Some(slot) => Some((s.name.clone(), slot)),
                None => {
                    tracing::warn!(name = %s.name, slot = s.slot, "Slot ausserhalb, Spieler ignoriert");
                    None
                }
            })
            .collect();

        Self {
            sender: SenderId(einstellungen.client_num),
            team: Team(einstellungen.team),
            server: (!server.is_empty()).then(|| server.to_string()),
            spieler,
        }
    }

    pub fn team_setzen(&mut self, team: Team) {
        self.team = team;
    }
}

impl GameHost for StaticHost {
    fn sender_id(&self) -> SenderId {
        self.sender
    }

    fn team(&self) -> Team {
        self.team
    }

    fn server_adresse(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn slot_by_name(&self, name: &str) -> Option<PeerSlot> {
        self.spieler
            .iter()
            .find(|(n, _)| n.to_lowercase() == name.to_lowercase())
            .map(|(_, slot)| *slot)
    }
}

/// Konsolenzeile des Hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostBefehl {
    /// Befehl des Sprachmoduls
    Voice(VoiceCommand),
    /// `team <n>`: Teamwechsel simulieren
    Team(Team),
    /// `connect`: (erneut) mit dem Relay verbinden
    Verbinden,
    /// `disconnect`
    Trennen,
    /// `quit` / `exit`
    Beenden,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BefehlsFehler {
    #[error("team: ungueltige Teamnummer '{0}'")]
    UngueltigesTeam(String),

    #[error(transparent)]
    Voice(#[from] CommandError),
}

/// Parst eine Konsolenzeile; alles Unbekannte geht an das Sprachmodul
pub fn host_befehl(zeile: &str) -> Result<HostBefehl, BefehlsFehler> {
    let zeile = zeile.trim();
    let (name, rest) = zeile.split_once(char::is_whitespace).unwrap_or((zeile, ""));

    match name {
        "team" => rest
            .trim()
            .parse::<u8>()
            .map(|t| HostBefehl::Team(Team(t)))
            .map_err(|_| BefehlsFehler::UngueltigesTeam(rest.trim().to_string())),
        "connect" => Ok(HostBefehl::Verbinden),
        "disconnect" => Ok(HostBefehl::Trennen),
        "quit" | "exit" => Ok(HostBefehl::Beenden),
        _ => Ok(HostBefehl::Voice(parse_command(zeile)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Spieler;
    use funkspruch_core::types::VoiceChannel;

    fn host() -> StaticHost {
        StaticHost::aus_config(&HostEinstellungen {
            server_address: " 10.0.0.5:27960 ".into(),
            client_num: 4,
            team: 2,
            tick_ms: 20,
            players: vec![
                Spieler {
                    name: "Hans".into(),
                    slot: 3,
                },
                Spieler {
                    name: "Zu Gross".into(),
                    slot: 200,
                },
            ],
        })
    }

    #[test]
    fn host_aus_konfiguration() {
        let h = host();
        assert_eq!(h.sender_id(), SenderId(4));
        assert_eq!(h.team(), Team(2));
        assert_eq!(h.server_adresse(), Some("10.0.0.5:27960"));
    }

    #[test]
    fn namenssuche_ohne_gross_klein() {
        let h = host();
        assert_eq!(h.slot_by_name("HANS"), PeerSlot::new(3));
        assert_eq!(h.slot_by_name("Zu Gross"), None);
        assert_eq!(h.slot_by_name("Niemand"), None);
    }

    #[test]
    fn leere_serveradresse() {
        let h = StaticHost::aus_config(&HostEinstellungen {
            server_address: "".into(),
            ..HostEinstellungen::default()
        });
        assert_eq!(h.server_adresse(), None);
    }

    #[test]
    fn host_befehle() {
        assert_eq!(host_befehl("team 3"), Ok(HostBefehl::Team(Team(3))));
        assert_eq!(host_befehl("connect"), Ok(HostBefehl::Verbinden));
        assert_eq!(host_befehl("disconnect"), Ok(HostBefehl::Trennen));
        assert_eq!(host_befehl(" quit "), Ok(HostBefehl::Beenden));
        assert_eq!(
            host_befehl("team blau"),
            Err(BefehlsFehler::UngueltigesTeam("blau".into()))
        );
    }

    #[test]
    fn sprachbefehle_werden_durchgereicht() {
        assert_eq!(
            host_befehl("+voiceteam"),
            Ok(HostBefehl::Voice(VoiceCommand::StartTransmit(
                VoiceChannel::Team
            )))
        );
        assert_eq!(
            host_befehl("voice_zap"),
            Err(BefehlsFehler::Voice(CommandError::Unbekannt("voice_zap".into())))
        );
    }
}
