//! Dispatcher - fans a resolved action out to the actuation layer
//!
//! Each device gets exactly one actuation call. Calls are fire-and-forget:
//! a device that fails to move is logged but still counts towards the
//! "N devices commanded" feedback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::command::Action;
use crate::config::ActuatorConfig;
use crate::device::Device;
use crate::error::{Error, Result};

/// Performs the physical move/stop for one device
pub trait Actuator: Send + Sync {
    fn actuate(&self, device_id: &str, action: Action) -> Result<()>;
}

pub struct Dispatcher {
    actuator: Arc<dyn Actuator>,
}

impl Dispatcher {
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self { actuator }
    }

    /// Send `action` to every device, returns how many were commanded
    pub fn dispatch(&self, devices: &[Device], action: Action) -> usize {
        for device in devices {
            let resolved = if device.inverted {
                action.inverted()
            } else {
                action
            };
            match self.actuator.actuate(&device.id, resolved) {
                Ok(()) => debug!("{} -> {} ({})", device.id, resolved, device.description),
                Err(e) => warn!("Actuation failed for {}: {}", device.id, e),
            }
        }
        info!("Command {} sent to {} device(s)", action, devices.len());
        devices.len()
    }

    /// Dispatch an action given by name; unknown names are rejected.
    pub fn dispatch_named(&self, devices: &[Device], action: &str) -> Result<usize> {
        let action: Action = action.parse().inspect_err(|e| error!("Rejected: {}", e))?;
        Ok(self.dispatch(devices, action))
    }
}

/// Current motion of a simulated blind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Motion {
    Up,
    Down,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub id: String,
    pub motion: Motion,
    /// 0 = fully lowered, 100 = fully raised
    pub position: u8,
}

/// In-process blind controller.
///
/// Raise/lower set the motion; [`SimulatedBlinds::tick`] moves every
/// travelling device by one step and parks it at either end.
pub struct SimulatedBlinds {
    statuses: Mutex<HashMap<String, DeviceStatus>>,
    step: u8,
    initial_position: u8,
}

impl SimulatedBlinds {
    pub fn new(step: u8, initial_position: u8) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            step: step.max(1),
            initial_position: initial_position.min(100),
        }
    }

    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self::new(config.step, config.initial_position)
    }

    /// Status of one device; unseen devices report the initial position
    pub fn status(&self, device_id: &str) -> DeviceStatus {
        self.lock()
            .get(device_id)
            .cloned()
            .unwrap_or_else(|| self.initial_status(device_id))
    }

    /// All devices that have been commanded, sorted by id
    pub fn statuses(&self) -> Vec<DeviceStatus> {
        let mut all: Vec<DeviceStatus> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Advance every moving device by one step, returns true while any is still moving
    pub fn tick(&self) -> bool {
        let mut moving = false;
        for status in self.lock().values_mut() {
            match status.motion {
                Motion::Up => {
                    status.position = status.position.saturating_add(self.step).min(100);
                    if status.position == 100 {
                        status.motion = Motion::Stopped;
                        debug!("{} fully raised", status.id);
                    }
                }
                Motion::Down => {
                    status.position = status.position.saturating_sub(self.step);
                    if status.position == 0 {
                        status.motion = Motion::Stopped;
                        debug!("{} fully lowered", status.id);
                    }
                }
                Motion::Stopped => {}
            }
            moving |= status.motion != Motion::Stopped;
        }
        moving
    }

    fn initial_status(&self, device_id: &str) -> DeviceStatus {
        DeviceStatus {
            id: device_id.to_string(),
            motion: Motion::Stopped,
            position: self.initial_position,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DeviceStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Actuator for SimulatedBlinds {
    fn actuate(&self, device_id: &str, action: Action) -> Result<()> {
        if device_id.is_empty() {
            return Err(Error::DeviceNotFound(String::new()));
        }
        let mut statuses = self.lock();
        let status = statuses
            .entry(device_id.to_string())
            .or_insert_with(|| self.initial_status(device_id));
        status.motion = match action {
            Action::Raise => Motion::Up,
            Action::Lower => Motion::Down,
            Action::Stop => Motion::Stopped,
        };
        info!("Moving {}: {:?}", device_id, status.motion);
        Ok(())
    }
}
