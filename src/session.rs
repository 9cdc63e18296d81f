//! Voice session - drives recognition, parsing, matching and dispatch
//!
//! Engine events are handled strictly in arrival order. Every state change
//! is published as a [`VoiceEvent::State`] snapshot, and each executed
//! command as one [`VoiceEvent::Command`].

use chrono::{DateTime, Local};
use flume::Receiver;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::command::{self, Action, CommandOutcome};
use crate::device::{Device, SnapshotSource};
use crate::dispatch::Dispatcher;
use crate::engine::{EngineEvent, RecognitionResult, SpeechEngine};
use crate::keywords::{RECOGNITION, messages};
use crate::matcher;
use crate::state::{RecognitionMachine, RecognitionState};

/// Command sent to the actuation layer
#[derive(Clone, Debug, PartialEq)]
pub struct CommandEvent {
    pub devices: Vec<Device>,
    pub action: Action,
    pub at: DateTime<Local>,
}

#[derive(Clone, Debug)]
pub enum VoiceEvent {
    State(RecognitionState),
    Command(CommandEvent),
}

pub struct VoiceSession<E, S> {
    engine: E,
    devices: S,
    dispatcher: Dispatcher,
    machine: RecognitionMachine,
    event_tx: mpsc::UnboundedSender<VoiceEvent>,
    processed: usize,
}

impl<E: SpeechEngine, S: SnapshotSource> VoiceSession<E, S> {
    pub fn new(
        mut engine: E,
        devices: S,
        dispatcher: Dispatcher,
        event_tx: mpsc::UnboundedSender<VoiceEvent>,
    ) -> Self {
        let machine = if engine.is_supported() {
            engine.configure(&RECOGNITION);
            RecognitionMachine::new()
        } else {
            error!("Speech recognition not supported");
            RecognitionMachine::unsupported()
        };

        let session = Self {
            engine,
            devices,
            dispatcher,
            machine,
            event_tx,
            processed: 0,
        };
        session.publish_state();
        session
    }

    pub fn state(&self) -> &RecognitionState {
        self.machine.state()
    }

    pub fn machine(&self) -> &RecognitionMachine {
        &self.machine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_supported()
    }

    /// Final transcripts handed to command processing so far
    pub fn commands_processed(&self) -> usize {
        self.processed
    }

    /// Ask the engine for a new session.
    ///
    /// The state only changes once the engine reports `Start`.
    pub fn start(&mut self) {
        if !self.engine.is_supported() {
            error!("Speech recognition not supported");
            return;
        }
        if self.machine.is_listening() {
            debug!("Already listening");
            return;
        }
        match self.engine.start() {
            Ok(()) => info!("Speech recognition started"),
            Err(e) => {
                error!("Failed to start recognition: {}", e);
                self.machine.on_start_failed();
                self.publish_state();
            }
        }
    }

    /// Ask the running session to finish; completion arrives as `End`
    pub fn stop(&mut self) {
        if self.machine.is_listening() {
            self.engine.stop();
            info!("Speech recognition stopped");
        }
    }

    pub fn toggle(&mut self) {
        if self.machine.is_listening() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Apply one engine event. Returns the command outcome when the event
    /// was a final result.
    pub fn handle(&mut self, event: EngineEvent) -> Option<CommandOutcome> {
        match event {
            EngineEvent::Start => {
                if self.machine.on_start() {
                    self.publish_state();
                }
                None
            }
            EngineEvent::Result(result) => self.on_result(result),
            EngineEvent::Error(code) => {
                error!("Recognition error: {}", code);
                if self.machine.on_error(&code) {
                    self.publish_state();
                }
                None
            }
            EngineEvent::End => {
                if self.machine.on_end() {
                    self.publish_state();
                }
                None
            }
        }
    }

    /// Handle every event already queued, in order
    pub fn pump(&mut self, rx: &Receiver<EngineEvent>) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            outcomes.extend(self.handle(event));
        }
        outcomes
    }

    fn on_result(&mut self, result: RecognitionResult) -> Option<CommandOutcome> {
        let Some(best) = result.best() else {
            debug!("Result without alternatives");
            return None;
        };
        let transcript = best.transcript.trim().to_lowercase();
        let confidence = best.confidence;
        debug!("Transcript: {:?} | confidence: {:.2}", transcript, confidence);

        if !self.machine.on_result(&transcript, confidence) {
            return None;
        }
        self.publish_state();

        if !result.is_final {
            return None;
        }
        let outcome = self.process_transcript(&transcript, confidence);
        self.machine.set_message(outcome.message());
        self.publish_state();
        Some(outcome)
    }

    fn process_transcript(&mut self, transcript: &str, confidence: f32) -> CommandOutcome {
        self.processed += 1;

        if !command::passes_threshold(confidence) {
            return CommandOutcome::LowConfidence;
        }

        self.machine.set_message(messages::PROCESSING);
        self.publish_state();

        // Read the registry now, not at session start
        let outcome = matcher::resolve(transcript, &self.devices.snapshot());
        if let CommandOutcome::Matched { command, devices } = &outcome {
            self.dispatcher.dispatch(devices, command.action);
            let _ = self.event_tx.send(VoiceEvent::Command(CommandEvent {
                devices: devices.clone(),
                action: command.action,
                at: Local::now(),
            }));
        }
        outcome
    }

    fn publish_state(&self) {
        let _ = self.event_tx.send(VoiceEvent::State(self.machine.snapshot()));
    }
}
