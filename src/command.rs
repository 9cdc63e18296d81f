//! Command parser - turns a final transcript into a device command
//!
//! A transcript is interpreted in three independent scans:
//! 1. Action - first word found in the up/down/stop tables (mandatory)
//! 2. Device type - first window/door word (optional)
//! 3. Room - first room keyword contained anywhere in the text, in table order (optional)
//!
//! Low-confidence transcripts are rejected before any scan.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::device::{Device, DeviceType};
use crate::error::Error;
use crate::keywords::{
    self, DOOR_KEYWORDS, DOWN_KEYWORDS, RECOGNITION, ROOM_KEYWORDS, STOP_KEYWORDS, UP_KEYWORDS,
    WINDOW_KEYWORDS, messages,
};

/// Motion requested for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    #[serde(rename = "on")]
    Raise,
    #[serde(rename = "off")]
    Lower,
    #[serde(rename = "stop")]
    Stop,
}

impl Action {
    /// Swap raise and lower, for devices wired the other way round
    pub fn inverted(self) -> Self {
        match self {
            Action::Raise => Action::Lower,
            Action::Lower => Action::Raise,
            Action::Stop => Action::Stop,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Raise => write!(f, "raise"),
            Action::Lower => write!(f, "lower"),
            Action::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" | "up" | "raise" | "subir" => Ok(Action::Raise),
            "off" | "down" | "lower" | "bajar" => Ok(Action::Lower),
            "stop" | "parar" => Ok(Action::Stop),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// Structured command extracted from one utterance.
///
/// `None` for `device_type` or `room` means unconstrained, not "nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceCommand {
    pub action: Action,
    pub device_type: Option<DeviceType>,
    pub room: Option<&'static str>,
}

impl VoiceCommand {
    /// Command without device or room constraints
    pub fn unconstrained(action: Action) -> Self {
        Self {
            action,
            device_type: None,
            room: None,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.device_type.is_none() && self.room.is_none()
    }
}

impl fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;
        if let Some(kind) = self.device_type {
            write!(f, " {}", kind)?;
        }
        if let Some(room) = self.room {
            write!(f, " @ {}", room)?;
        }
        Ok(())
    }
}

/// Result of processing one final transcript
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Confidence under the threshold, nothing was parsed
    LowConfidence,

    /// No action keyword in the transcript
    NotUnderstood,

    /// Well-formed command that matched no device
    NoDeviceFound(VoiceCommand),

    /// Command resolved to at least one device
    Matched {
        command: VoiceCommand,
        devices: Vec<Device>,
    },
}

impl CommandOutcome {
    /// Feedback message for the recognition state
    pub fn message(&self) -> String {
        match self {
            CommandOutcome::LowConfidence | CommandOutcome::NotUnderstood => {
                messages::NOT_UNDERSTOOD.to_string()
            }
            CommandOutcome::NoDeviceFound(_) => messages::NO_DEVICE_FOUND.to_string(),
            CommandOutcome::Matched { devices, .. } => success_message(devices.len()),
        }
    }
}

/// "✅ Comando ejecutado (3 dispositivos)"
pub fn success_message(count: usize) -> String {
    let plural = if count > 1 { "s" } else { "" };
    format!("{} ({} dispositivo{})", messages::SUCCESS, count, plural)
}

/// Whether a final transcript is trusted enough to parse. Anything not at
/// or above the threshold is rejected, NaN included.
pub fn passes_threshold(confidence: f32) -> bool {
    let trusted = confidence >= RECOGNITION.confidence_threshold;
    if !trusted {
        debug!(
            "Rejected low-confidence transcript ({:.2} < {:.2})",
            confidence, RECOGNITION.confidence_threshold
        );
    }
    trusted
}

/// Parse a transcript into a command; `None` when no action word is present.
#[hotpath::measure]
pub fn parse_command(transcript: &str) -> Option<VoiceCommand> {
    let text = transcript.trim().to_lowercase();
    let words: Vec<&str> = text.split_whitespace().collect();

    let action = detect_action(&words)?;
    let device_type = detect_device_type(&words);
    let room = detect_room(&text);

    if keywords::mentions_global(&text) {
        debug!("Global scope requested");
    }

    let command = VoiceCommand {
        action,
        device_type,
        room,
    };
    debug!("Parsed command: {}", command);
    Some(command)
}

/// Earliest word that is an action keyword decides the action
fn detect_action(words: &[&str]) -> Option<Action> {
    words.iter().find_map(|word| {
        if UP_KEYWORDS.contains(word) {
            Some(Action::Raise)
        } else if DOWN_KEYWORDS.contains(word) {
            Some(Action::Lower)
        } else if STOP_KEYWORDS.contains(word) {
            Some(Action::Stop)
        } else {
            None
        }
    })
}

fn detect_device_type(words: &[&str]) -> Option<DeviceType> {
    words.iter().find_map(|word| {
        if WINDOW_KEYWORDS.contains(word) {
            Some(DeviceType::Window)
        } else if DOOR_KEYWORDS.contains(word) {
            Some(DeviceType::Door)
        } else {
            None
        }
    })
}

/// Substring scan in declaration order: the table decides ties, not the
/// position of the keyword in the transcript.
fn detect_room(text: &str) -> Option<&'static str> {
    ROOM_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(label, _)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_command() {
        let command = parse_command("sube la ventana del salón").unwrap();
        assert_eq!(
            command,
            VoiceCommand {
                action: Action::Raise,
                device_type: Some(DeviceType::Window),
                room: Some("Salón"),
            }
        );
    }

    #[test]
    fn test_bare_stop() {
        let command = parse_command("para").unwrap();
        assert_eq!(command, VoiceCommand::unconstrained(Action::Stop));
        assert!(command.is_unconstrained());
    }

    #[test]
    fn test_door_without_room() {
        let command = parse_command("cierra la puerta").unwrap();
        assert_eq!(command.action, Action::Lower);
        assert_eq!(command.device_type, Some(DeviceType::Door));
        assert_eq!(command.room, None);
    }

    #[test]
    fn test_no_action_keyword() {
        assert_eq!(parse_command("hola mundo"), None);
        // Room and type alone are not actionable
        assert_eq!(parse_command("la ventana del salón"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_confidence_threshold() {
        assert!(!passes_threshold(0.4));
        assert!(!passes_threshold(0.59));
        assert!(passes_threshold(0.6));
        assert!(passes_threshold(1.0));
    }

    #[test]
    fn test_nan_confidence_is_rejected() {
        assert!(!passes_threshold(f32::NAN));
        assert!(!passes_threshold(-f32::NAN));
        assert!(!passes_threshold(f32::NEG_INFINITY));
    }

    #[test]
    fn test_earliest_action_wins() {
        assert_eq!(parse_command("baja y luego sube").unwrap().action, Action::Lower);
        assert_eq!(parse_command("para de subir").unwrap().action, Action::Stop);
        assert_eq!(parse_command("abre o cierra").unwrap().action, Action::Raise);
    }

    #[test]
    fn test_window_and_door_first_word_wins() {
        let command = parse_command("abre la puerta y la ventana").unwrap();
        assert_eq!(command.device_type, Some(DeviceType::Door));

        let command = parse_command("abre las persianas").unwrap();
        assert_eq!(command.device_type, Some(DeviceType::Window));
    }

    #[test]
    fn test_room_table_order_beats_text_order() {
        // "salón" appears first in the text, but the principal bedroom is
        // declared first in the table
        let command = parse_command("baja el salón y la principal").unwrap();
        assert_eq!(command.room, Some("Hab. Principal"));
    }

    #[test]
    fn test_room_phrase_keywords() {
        assert_eq!(
            parse_command("sube la persiana del despacho").unwrap().room,
            Some("Ordenadores")
        );
        assert_eq!(
            parse_command("baja la persiana del cuarto de edu").unwrap().room,
            Some("Hab. Jaume/Edu")
        );
        assert_eq!(
            parse_command("sube la persiana de la sala de estar").unwrap().room,
            Some("Salón")
        );
    }

    #[test]
    fn test_room_is_substring_match() {
        // "sala" is contained in "salado" - substring semantics are kept as is
        assert_eq!(parse_command("para salado").unwrap().room, Some("Salón"));
    }

    #[test]
    fn test_uppercase_input_is_normalized() {
        let command = parse_command("  SUBE la Ventana  ").unwrap();
        assert_eq!(command.action, Action::Raise);
        assert_eq!(command.device_type, Some(DeviceType::Window));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("on".parse::<Action>().unwrap(), Action::Raise);
        assert_eq!("OFF".parse::<Action>().unwrap(), Action::Lower);
        assert_eq!("parar".parse::<Action>().unwrap(), Action::Stop);
        assert!(matches!(
            "spin".parse::<Action>(),
            Err(Error::UnknownAction(a)) if a == "spin"
        ));
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(CommandOutcome::LowConfidence.message(), messages::NOT_UNDERSTOOD);
        assert_eq!(CommandOutcome::NotUnderstood.message(), messages::NOT_UNDERSTOOD);
        assert_eq!(
            CommandOutcome::NoDeviceFound(VoiceCommand::unconstrained(Action::Stop)).message(),
            messages::NO_DEVICE_FOUND
        );
        assert_eq!(success_message(1), "✅ Comando ejecutado (1 dispositivo)");
        assert_eq!(success_message(3), "✅ Comando ejecutado (3 dispositivos)");
    }
}
