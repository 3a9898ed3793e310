//! Konsolenbefehle des Sprachmoduls
//!
//! Zeilenbasiert wie die Spielkonsole:
//!   +voiceteam / -voiceteam, +voiceall / -voiceall
//!   voice_mute <name>, voice_unmute <name>
//!   voice_status, voice_debug <text>
//!
//! Namen duerfen in Anfuehrungszeichen stehen (`voice_mute "Big Bob"`).

use thiserror::Error;

use funkspruch_core::types::VoiceChannel;

use crate::host::GameHost;
use crate::session::Session;

/// Ein geparster Konsolenbefehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Sprechtaste gedrueckt
    StartTransmit(VoiceChannel),
    /// Sprechtaste losgelassen
    StopTransmit,
    Mute(String),
    Unmute(String),
    Status,
    Debug(String),
}

/// Fehler beim Parsen oder Ausfuehren eines Befehls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Leere Befehlszeile")]
    Leer,

    #[error("Unbekannter Befehl: {0}")]
    Unbekannt(String),

    #[error("{befehl}: Argument <{argument}> fehlt")]
    ArgumentFehlt {
        befehl: &'static str,
        argument: &'static str,
    },

    #[error("Kein Spieler mit Namen '{0}'")]
    SpielerUnbekannt(String),

    #[error("Sprachmodul ist deaktiviert")]
    Deaktiviert,

    #[error("Nicht mit dem Relay verbunden")]
    NichtVerbunden,
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Parst eine Befehlszeile
pub fn parse_command(line: &str) -> CommandResult<VoiceCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Leer);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, argument(rest)),
        None => (line, ""),
    };

    match name.to_lowercase().as_str() {
        "+voiceteam" => Ok(VoiceCommand::StartTransmit(VoiceChannel::Team)),
        "+voiceall" => Ok(VoiceCommand::StartTransmit(VoiceChannel::All)),
        "-voiceteam" | "-voiceall" => Ok(VoiceCommand::StopTransmit),
        "voice_mute" => pflicht(rest, "voice_mute", "name").map(VoiceCommand::Mute),
        "voice_unmute" => pflicht(rest, "voice_unmute", "name").map(VoiceCommand::Unmute),
        "voice_status" => Ok(VoiceCommand::Status),
        "voice_debug" => pflicht(rest, "voice_debug", "text").map(VoiceCommand::Debug),
        _ => Err(CommandError::Unbekannt(name.to_string())),
    }
}

/// Entfernt umschliessende Anfuehrungszeichen
fn argument(rest: &str) -> &str {
    let rest = rest.trim();
    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(rest)
}

fn pflicht(
    wert: &str,
    befehl: &'static str,
    argument: &'static str,
) -> CommandResult<String> {
    if wert.is_empty() {
        return Err(CommandError::ArgumentFehlt { befehl, argument });
    }
    Ok(wert.to_string())
}

/// Fuehrt einen Befehl aus und liefert die Konsolenausgabe
pub fn ausfuehren(
    session: &mut Session,
    host: &dyn GameHost,
    befehl: VoiceCommand,
) -> CommandResult<String> {
    match befehl {
        VoiceCommand::StartTransmit(kanal) => {
            if session.start_transmit(kanal) {
                Ok(format!("Sende an {kanal}"))
            } else {
                Ok(format!("Senden nicht moeglich ({})", session.zustand()))
            }
        }
        VoiceCommand::StopTransmit => {
            session.stop_transmit();
            Ok("Senden beendet".into())
        }
        VoiceCommand::Mute(name) => {
            let slot = session
                .stumm_nach_name(host, &name, true)
                .ok_or(CommandError::SpielerUnbekannt(name.clone()))?;
            Ok(format!("{name} ({slot}) stumm"))
        }
        VoiceCommand::Unmute(name) => {
            let slot = session
                .stumm_nach_name(host, &name, false)
                .ok_or(CommandError::SpielerUnbekannt(name.clone()))?;
            Ok(format!("{name} ({slot}) hoerbar"))
        }
        VoiceCommand::Status => Ok(session.status().to_string()),
        VoiceCommand::Debug(text) => {
            if session.ist_deaktiviert() {
                return Err(CommandError::Deaktiviert);
            }
            if !session.debug_senden(&text) {
                return Err(CommandError::NichtVerbunden);
            }
            Ok("Debug-Nachricht gesendet".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprechtasten() {
        assert_eq!(
            parse_command("+voiceteam").unwrap(),
            VoiceCommand::StartTransmit(VoiceChannel::Team)
        );
        assert_eq!(
            parse_command("  +VOICEALL ").unwrap(),
            VoiceCommand::StartTransmit(VoiceChannel::All)
        );
        assert_eq!(parse_command("-voiceteam").unwrap(), VoiceCommand::StopTransmit);
        assert_eq!(parse_command("-voiceall").unwrap(), VoiceCommand::StopTransmit);
    }

    #[test]
    fn stumm_mit_namen() {
        assert_eq!(
            parse_command("voice_mute Hans").unwrap(),
            VoiceCommand::Mute("Hans".into())
        );
        assert_eq!(
            parse_command("voice_unmute \"Big Bob\"").unwrap(),
            VoiceCommand::Unmute("Big Bob".into())
        );
        assert_eq!(
            parse_command("voice_mute   Name mit Leerzeichen ").unwrap(),
            VoiceCommand::Mute("Name mit Leerzeichen".into())
        );
    }

    #[test]
    fn fehlendes_argument() {
        assert_eq!(
            parse_command("voice_mute"),
            Err(CommandError::ArgumentFehlt {
                befehl: "voice_mute",
                argument: "name"
            })
        );
        assert!(parse_command("voice_debug   ").is_err());
    }

    #[test]
    fn debug_text_bleibt_erhalten() {
        assert_eq!(
            parse_command("voice_debug hallo relay").unwrap(),
            VoiceCommand::Debug("hallo relay".into())
        );
    }

    #[test]
    fn unbekannt_und_leer() {
        assert_eq!(parse_command(""), Err(CommandError::Leer));
        assert_eq!(
            parse_command("voice_explode"),
            Err(CommandError::Unbekannt("voice_explode".into()))
        );
        assert_eq!(parse_command("voice_status").unwrap(), VoiceCommand::Status);
    }
}
