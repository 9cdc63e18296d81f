//! Spanish voice control for motorised blinds and doors
//!
//! A spoken phrase such as "baja la persiana del salón" flows through:
//!
//! - **engine**: speech engine boundary, lifecycle events
//! - **state**: recognition state machine for the live session
//! - **command**: keyword parser producing an action, device type and room
//! - **matcher**: filters the current device snapshot
//! - **dispatch**: sends the action to each matched device
//!
//! [`session::VoiceSession`] wires these together and publishes typed
//! feedback events.

pub mod command;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod matcher;
pub mod render;
pub mod session;
pub mod state;

pub use command::{Action, CommandOutcome, VoiceCommand};
pub use config::Config;
pub use device::{Device, DeviceRegistry, DeviceType, SnapshotSource};
pub use dispatch::{Actuator, Dispatcher, SimulatedBlinds};
pub use engine::{EngineEvent, ScriptedEngine, SpeechEngine};
pub use error::{Error, Result};
pub use session::{CommandEvent, VoiceEvent, VoiceSession};
pub use state::{RecognitionMachine, RecognitionState};
