//! Device model and registry
//!
//! The registry is the single owner of the device list. Everything else
//! reads point-in-time copies through [`SnapshotSource`], so a refresh
//! between (or during) sessions is picked up at the next match.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Coarse device category used to scope voice commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "PUERTA")]
    Door,
    #[serde(rename = "VENTANA")]
    Window,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Door => write!(f, "Door"),
            DeviceType::Window => write!(f, "Window"),
        }
    }
}

/// A controllable blind or door
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable unique identifier
    pub id: String,
    /// Human-readable label; room matching is done against it
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DeviceType,
    /// Motor wired the other way round: raise and lower are swapped
    #[serde(default)]
    pub inverted: bool,
}

impl Device {
    pub fn new(id: impl Into<String>, description: impl Into<String>, kind: DeviceType) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind,
            inverted: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }
}

/// Devices written to an empty store on first run
pub fn default_devices() -> Vec<Device> {
    vec![
        Device::new("DOOR_001", "Puerta Principal Salón", DeviceType::Door),
        Device::new("DOOR_002", "Puerta Terraza", DeviceType::Door),
        Device::new("WINDOW_001", "Ventana Dormitorio Principal", DeviceType::Window),
        Device::new("WINDOW_002", "Ventana Cocina", DeviceType::Window),
        Device::new("WINDOW_003", "Ventana Baño", DeviceType::Window),
    ]
}

/// Read-only access to the current device list
pub trait SnapshotSource {
    /// Point-in-time copy, in registry order
    fn snapshot(&self) -> Vec<Device>;
}

impl SnapshotSource for Vec<Device> {
    fn snapshot(&self) -> Vec<Device> {
        self.clone()
    }
}

/// On-disk layout of the device store
#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceFile {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Shared device registry, optionally persisted to a TOML file.
///
/// Clones share the same list.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<Vec<Device>>>,
    path: Option<PathBuf>,
}

impl DeviceRegistry {
    /// Registry without a backing file
    pub fn in_memory(devices: Vec<Device>) -> Self {
        Self {
            devices: Arc::new(RwLock::new(devices)),
            path: None,
        }
    }

    /// Open the store at `path`; a missing or empty store is seeded with
    /// [`default_devices`] when `seed_defaults` is set.
    pub fn load(path: impl Into<PathBuf>, seed_defaults: bool) -> Result<Self> {
        let path = path.into();
        let mut devices = if path.exists() {
            read_store(&path)?
        } else {
            Vec::new()
        };

        let seeded = devices.is_empty() && seed_defaults;
        if seeded {
            info!("Loading default devices into {}", path.display());
            devices = default_devices();
        }

        let registry = Self {
            devices: Arc::new(RwLock::new(devices)),
            path: Some(path),
        };
        if seeded {
            registry.save()?;
        }
        debug!("Registry opened with {} device(s)", registry.len());
        Ok(registry)
    }

    /// Write the current list to the backing file (no-op when in memory)
    pub fn save(&self) -> Result<()> {
        self.persist(&self.read())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Register a new device; ids must be unique
    pub fn add(&self, device: Device) -> Result<()> {
        let (id, description) = (device.id.clone(), device.description.clone());
        self.commit(|devices| {
            if devices.iter().any(|d| d.id == device.id) {
                return Err(Error::DuplicateDevice(device.id));
            }
            devices.push(device);
            Ok(())
        })?;
        info!("Device added: {} ({})", id, description);
        Ok(())
    }

    /// Replace the device with the same id, or append it
    pub fn update(&self, device: Device) -> Result<()> {
        self.commit(|devices| {
            match devices.iter_mut().find(|d| d.id == device.id) {
                Some(existing) => *existing = device,
                None => devices.push(device),
            }
            Ok(())
        })
    }

    /// Remove a device by id, returning it
    pub fn remove(&self, id: &str) -> Result<Device> {
        let removed = self.commit(|devices| {
            let index = devices
                .iter()
                .position(|d| d.id == id)
                .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?;
            Ok(devices.remove(index))
        })?;
        info!("Device removed: {}", removed.id);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        self.read().iter().find(|d| d.id == id).cloned()
    }

    /// Drop every device
    pub fn clear(&self) -> Result<()> {
        self.commit(|devices| {
            devices.clear();
            Ok(())
        })?;
        info!("All devices cleared");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Apply `change` to a copy of the list and swap it in once the store
    /// has been written. On any error the shared list is left untouched.
    fn commit<T>(&self, change: impl FnOnce(&mut Vec<Device>) -> Result<T>) -> Result<T> {
        let mut devices = self.write();
        let mut next = devices.clone();
        let value = change(&mut next)?;
        self.persist(&next)?;
        *devices = next;
        Ok(value)
    }

    fn persist(&self, devices: &[Device]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = DeviceFile {
            devices: devices.to_vec(),
        };
        let text = toml::to_string_pretty(&file)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Device>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Device>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotSource for DeviceRegistry {
    fn snapshot(&self) -> Vec<Device> {
        self.read().clone()
    }
}

fn read_store(path: &Path) -> Result<Vec<Device>> {
    let text = fs::read_to_string(path)?;
    let file: DeviceFile = toml::from_str(&text)
        .map_err(|e| Error::Registry(format!("{}: {}", path.display(), e)))?;
    Ok(file.devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_duplicates() {
        let registry = DeviceRegistry::in_memory(default_devices());
        let result = registry.add(Device::new("DOOR_001", "Otra", DeviceType::Door));
        assert!(matches!(result, Err(Error::DuplicateDevice(id)) if id == "DOOR_001"));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_update_and_remove() {
        let registry = DeviceRegistry::in_memory(Vec::new());
        registry
            .add(Device::new("W1", "Ventana Salón", DeviceType::Window))
            .unwrap();
        registry
            .update(Device::new("W1", "Ventana Salón", DeviceType::Window).inverted())
            .unwrap();
        assert!(registry.get("W1").unwrap().inverted);

        let removed = registry.remove("W1").unwrap();
        assert_eq!(removed.id, "W1");
        assert!(registry.is_empty());
        assert!(matches!(registry.remove("W1"), Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn test_clones_share_devices() {
        let registry = DeviceRegistry::in_memory(Vec::new());
        let view = registry.clone();
        registry
            .add(Device::new("D1", "Puerta Salón", DeviceType::Door))
            .unwrap();
        assert_eq!(view.snapshot().len(), 1);
    }

    #[test]
    fn test_load_seeds_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");

        let registry = DeviceRegistry::load(&path, true).unwrap();
        assert_eq!(registry.snapshot(), default_devices());
        assert!(path.exists());

        registry.remove("DOOR_002").unwrap();
        let reopened = DeviceRegistry::load(&path, true).unwrap();
        assert_eq!(reopened.len(), 4);
        assert!(reopened.get("DOOR_002").is_none());
    }

    #[test]
    fn test_load_without_seed() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DeviceRegistry::load(dir.path().join("devices.toml"), false).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_store_uses_original_type_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");
        let registry = DeviceRegistry::load(&path, false).unwrap();
        registry
            .add(Device::new("W1", "Ventana Ordenadores", DeviceType::Window))
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("type = \"VENTANA\""));
    }

    #[test]
    fn test_malformed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");
        fs::write(&path, "devices = 3").unwrap();
        assert!(matches!(
            DeviceRegistry::load(&path, true),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn test_failed_write_keeps_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let registry = DeviceRegistry::load(blocker.join("devices.toml"), false).unwrap();

        let window = Device::new("W9", "Ventana Garaje", DeviceType::Window);
        assert!(matches!(registry.add(window.clone()), Err(Error::Io(_))));
        assert!(registry.is_empty());
        // Retrying reports the same write failure, not a duplicate
        assert!(matches!(registry.add(window), Err(Error::Io(_))));
        assert!(matches!(
            registry.update(Device::new("W9", "Ventana", DeviceType::Window)),
            Err(Error::Io(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_remove_and_clear_keep_devices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");
        let registry = DeviceRegistry::load(&path, true).unwrap();

        // A directory where the store file should be makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(registry.remove("DOOR_001").is_err());
        assert!(registry.get("DOOR_001").is_some());
        assert!(registry.clear().is_err());
        assert_eq!(registry.len(), 5);
    }
}
