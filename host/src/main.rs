//! Funkspruch Host – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und treibt die
//! Sprach-Sitzung im Takt eines Spiel-Frames. Konsolenbefehle kommen
//! zeilenweise von stdin.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use funkspruch_audio::{list_input_devices, list_output_devices, CpalBackend};
use funkspruch_core::types::PeerSlot;
use funkspruch_core::InstallId;
use funkspruch_host::config::HostConfig;
use funkspruch_host::logging::logging_initialisieren;
use funkspruch_host::{host_befehl, HostBefehl, StaticHost};
use funkspruch_voice::{ausfuehren, Session, SessionConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("FUNK_CONFIG").unwrap_or_else(|_| "funkspruch.toml".into());
    let config = HostConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.funk.logging.level, &config.funk.logging.format);

    if std::env::args().skip(1).any(|a| a == "--devices") {
        return geraete_auflisten();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Funkspruch Host wird initialisiert"
    );

    let identitaet = InstallId::laden_oder_fluechtig(&config.funk.identity.file);
    let mut host = StaticHost::aus_config(&config.host);
    let mut backend = CpalBackend::new(config.funk.audio.input(), config.funk.audio.output());

    let mut session_config = SessionConfig::new(config.funk.clone(), identitaet);
    session_config.codec = config.codec;
    let mut session = Session::init(session_config, &mut backend);

    if !session.ist_deaktiviert() {
        // Fehler sind im Zustand sichtbar; `connect` versucht es erneut
        let _ = session.verbinden(&host);
    }

    let mut takt = tokio::time::interval(Duration::from_millis(config.host.tick_ms));
    takt.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    let mut sprechende: Vec<PeerSlot> = Vec::new();

    loop {
        tokio::select! {
            _ = takt.tick() => {
                session.frame(&host, Instant::now());
                if session.einstellungen().show_indicators {
                    sprechanzeigen_melden(&session, &mut sprechende);
                }
            }
            zeile = zeilen.next_line() => {
                let Some(zeile) = zeile? else {
                    info!("Eingabe geschlossen");
                    break;
                };
                if zeile.trim().is_empty() {
                    continue;
                }
                if !zeile_verarbeiten(&mut session, &mut host, &zeile) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C empfangen");
                break;
            }
        }
    }

    session.trennen();
    session.shutdown();
    info!("Funkspruch Host beendet");
    Ok(())
}

/// Fuehrt eine Konsolenzeile aus; `false` beendet den Host
fn zeile_verarbeiten(session: &mut Session, host: &mut StaticHost, zeile: &str) -> bool {
    match host_befehl(zeile) {
        Ok(HostBefehl::Beenden) => return false,
        Ok(HostBefehl::Team(team)) => {
            host.team_setzen(team);
            println!("Team {}", team.0);
        }
        Ok(HostBefehl::Verbinden) => match session.verbinden(&*host) {
            Ok(relay) => println!("Verbunden mit {relay}"),
            Err(e) => println!("Verbindung fehlgeschlagen: {e}"),
        },
        Ok(HostBefehl::Trennen) => {
            session.trennen();
            println!("Getrennt");
        }
        Ok(HostBefehl::Voice(befehl)) => match ausfuehren(session, &*host, befehl) {
            Ok(antwort) => println!("{antwort}"),
            Err(e) => println!("{e}"),
        },
        Err(e) => println!("{e}"),
    }
    true
}

/// Protokolliert Beginn und Ende von Sprechphasen
fn sprechanzeigen_melden(session: &Session, vorher: &mut Vec<PeerSlot>) {
    let jetzt = session.sprechende();
    for slot in jetzt.iter().filter(|s| !vorher.contains(*s)) {
        info!(%slot, "spricht");
    }
    for slot in vorher.iter().filter(|s| !jetzt.contains(*s)) {
        info!(%slot, "verstummt");
    }
    *vorher = jetzt;
}

fn geraete_auflisten() -> Result<()> {
    let eingaenge = list_input_devices()?;
    if eingaenge.is_empty() {
        warn!("Kein Eingabegeraet gefunden, nur Zuhoeren moeglich");
    }
    println!("Eingabegeraete:");
    for geraet in &eingaenge {
        println!("  {}{}", geraet.name, hinweis_48k(geraet.unterstuetzt_48k));
    }
    println!("Ausgabegeraete:");
    for geraet in list_output_devices()? {
        println!("  {}{}", geraet.name, hinweis_48k(geraet.unterstuetzt_48k));
    }
    Ok(())
}

fn hinweis_48k(unterstuetzt: bool) -> &'static str {
    if unterstuetzt {
        ""
    } else {
        " (kein 48 kHz)"
    }
}
