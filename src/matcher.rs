//! Device matching against a registry snapshot

use tracing::info;

use crate::command::{self, CommandOutcome, VoiceCommand};
use crate::device::Device;

/// Parse a transcript and resolve it against `snapshot`.
///
/// Confidence is checked by the caller before this point.
pub fn resolve(transcript: &str, snapshot: &[Device]) -> CommandOutcome {
    let Some(command) = command::parse_command(transcript) else {
        info!("Not understood: {:?}", transcript);
        return CommandOutcome::NotUnderstood;
    };
    let devices = find_matching_devices(snapshot, &command);
    if devices.is_empty() {
        info!("No device matches {}", command);
        return CommandOutcome::NoDeviceFound(command);
    }
    CommandOutcome::Matched { command, devices }
}

/// Check a single device against the command's type and room constraints.
///
/// Room matching is substring containment on the description.
pub fn matches(device: &Device, command: &VoiceCommand) -> bool {
    let type_ok = command.device_type.is_none_or(|kind| device.kind == kind);
    let room_ok = command
        .room
        .is_none_or(|room| device.description.contains(room));
    type_ok && room_ok
}

/// Devices selected by `command`, in snapshot order
pub fn find_matching_devices(devices: &[Device], command: &VoiceCommand) -> Vec<Device> {
    devices
        .iter()
        .filter(|device| matches(device, command))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Action, VoiceCommand};
    use crate::device::{DeviceType, default_devices};

    fn house() -> Vec<Device> {
        vec![
            Device::new("W1", "Ventana Hab. Principal", DeviceType::Window),
            Device::new("D1", "Puerta Hab. Principal", DeviceType::Door),
            Device::new("W2", "Ventana Salón", DeviceType::Window),
            Device::new("D2", "Puerta Salón", DeviceType::Door),
            Device::new("W3", "Ventana Ordenadores", DeviceType::Window),
            Device::new("W4", "Ventana Hab. Jaume/Edu", DeviceType::Window),
        ]
    }

    fn ids(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_unconstrained_selects_everything_in_order() {
        let devices = house();
        let matched = find_matching_devices(&devices, &VoiceCommand::unconstrained(Action::Stop));
        assert_eq!(matched, devices);
    }

    #[test]
    fn test_type_only() {
        let command = VoiceCommand {
            action: Action::Raise,
            device_type: Some(DeviceType::Door),
            room: None,
        };
        assert_eq!(ids(&find_matching_devices(&house(), &command)), vec!["D1", "D2"]);
    }

    #[test]
    fn test_room_only() {
        let command = VoiceCommand {
            action: Action::Lower,
            device_type: None,
            room: Some("Salón"),
        };
        assert_eq!(ids(&find_matching_devices(&house(), &command)), vec!["W2", "D2"]);
    }

    #[test]
    fn test_type_and_room() {
        let command = VoiceCommand {
            action: Action::Raise,
            device_type: Some(DeviceType::Window),
            room: Some("Hab. Principal"),
        };
        assert_eq!(ids(&find_matching_devices(&house(), &command)), vec!["W1"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let windows: Vec<Device> = house()
            .into_iter()
            .filter(|d| d.kind == DeviceType::Window)
            .collect();
        let command = VoiceCommand {
            action: Action::Lower,
            device_type: Some(DeviceType::Door),
            room: None,
        };
        assert!(find_matching_devices(&windows, &command).is_empty());
    }

    #[test]
    fn test_room_label_must_appear_in_description() {
        // The seed devices use free-form labels; "Hab. Principal" is not a
        // substring of "Ventana Dormitorio Principal"
        let command = VoiceCommand {
            action: Action::Raise,
            device_type: None,
            room: Some("Hab. Principal"),
        };
        assert!(find_matching_devices(&default_devices(), &command).is_empty());

        let command = VoiceCommand {
            room: Some("Salón"),
            ..command
        };
        assert_eq!(
            ids(&find_matching_devices(&default_devices(), &command)),
            vec!["DOOR_001"]
        );
    }

    #[test]
    fn test_resolve_outcomes() {
        let windows: Vec<Device> = house()
            .into_iter()
            .filter(|d| d.kind == DeviceType::Window)
            .collect();

        assert_eq!(resolve("hola mundo", &windows), CommandOutcome::NotUnderstood);
        assert!(matches!(
            resolve("cierra la puerta", &windows),
            CommandOutcome::NoDeviceFound(VoiceCommand {
                action: Action::Lower,
                device_type: Some(DeviceType::Door),
                room: None,
            })
        ));
        match resolve("sube la ventana del salón", &windows) {
            CommandOutcome::Matched { command, devices } => {
                assert_eq!(command.room, Some("Salón"));
                assert_eq!(ids(&devices), vec!["W2"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_matching_is_pure() {
        let devices = house();
        let before = devices.clone();
        let command = VoiceCommand {
            action: Action::Stop,
            device_type: Some(DeviceType::Window),
            room: None,
        };
        let first = find_matching_devices(&devices, &command);
        let second = find_matching_devices(&devices, &command);
        assert_eq!(first, second);
        assert_eq!(devices, before);
    }
}
