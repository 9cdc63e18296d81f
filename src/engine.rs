//! Speech engine boundary
//!
//! The platform recogniser runs on its own and reports back through
//! [`EngineEvent`]s, delivered in emission order on a flume channel:
//! `Start`, any number of `Result`s, then `End` (or `Error` followed by `End`).

use flume::Sender;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::keywords::{RECOGNITION, RecognitionSettings, messages};

/// One ranked hypothesis for an utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,
    /// 0.0 - 1.0
    pub confidence: f32,
}

/// Latest result of the session, best alternative first
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<Alternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    /// Only the top-ranked alternative is ever consulted
    pub fn best(&self) -> Option<&Alternative> {
        self.alternatives.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Start,
    Result(RecognitionResult),
    /// Raw engine error code, e.g. "no-speech"
    Error(String),
    End,
}

/// Known engine error categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Other(String),
}

impl EngineErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => EngineErrorKind::NoSpeech,
            "audio-capture" => EngineErrorKind::AudioCapture,
            "not-allowed" => EngineErrorKind::NotAllowed,
            other => EngineErrorKind::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            EngineErrorKind::NoSpeech => messages::NO_SPEECH,
            EngineErrorKind::AudioCapture => messages::AUDIO_CAPTURE,
            EngineErrorKind::NotAllowed => messages::NOT_ALLOWED,
            EngineErrorKind::Other(_) => messages::RECOGNITION_FAILED,
        }
    }
}

/// Control surface of a speech recogniser
pub trait SpeechEngine {
    /// Whether recognition is available at all on this platform
    fn is_supported(&self) -> bool;

    /// Apply language and result settings before the first session
    fn configure(&mut self, settings: &RecognitionSettings);

    /// Begin a session. Fails when one is already running.
    fn start(&mut self) -> Result<()>;

    /// Ask the running session to finish; completion arrives as `End`
    fn stop(&mut self);
}

/// Engine driven by text instead of audio.
///
/// Each [`ScriptedEngine::speak`] call plays one utterance: growing interim
/// prefixes, the final transcript, then `End` (sessions are not continuous).
pub struct ScriptedEngine {
    tx: Sender<EngineEvent>,
    supported: bool,
    active: bool,
    settings: RecognitionSettings,
}

impl ScriptedEngine {
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        Self {
            tx,
            supported: true,
            active: false,
            settings: RECOGNITION,
        }
    }

    /// Engine that reports recognition as unavailable
    pub fn unsupported(tx: Sender<EngineEvent>) -> Self {
        Self {
            supported: false,
            ..Self::new(tx)
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    /// Play an utterance into the running session
    pub fn speak(&mut self, text: &str, confidence: f32) {
        if !self.active {
            warn!("Utterance dropped, no active session: {:?}", text);
            return;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if self.settings.interim_results {
            for n in 1..words.len() {
                let partial = words[..n].join(" ");
                // Interim hypotheses are less certain than the final one
                let interim = confidence * n as f32 / words.len() as f32;
                self.emit(EngineEvent::Result(self.result(partial, interim, false)));
            }
        }
        self.emit(EngineEvent::Result(self.result(
            text.to_string(),
            confidence,
            true,
        )));

        if !self.settings.continuous {
            self.finish();
        }
    }

    /// Report an engine failure; the session ends right after
    pub fn fail(&mut self, code: &str) {
        self.emit(EngineEvent::Error(code.to_string()));
        self.finish();
    }

    fn result(&self, transcript: String, confidence: f32, is_final: bool) -> RecognitionResult {
        RecognitionResult {
            alternatives: vec![Alternative {
                transcript,
                confidence: confidence.clamp(0.0, 1.0),
            }],
            is_final,
        }
    }

    fn finish(&mut self) {
        if self.active {
            self.active = false;
            self.emit(EngineEvent::End);
        }
    }

    fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            debug!("Engine event dropped, receiver gone");
        }
    }
}

impl SpeechEngine for ScriptedEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn configure(&mut self, settings: &RecognitionSettings) {
        debug!(
            "Engine configured: lang={} continuous={} interim={} alternatives={}",
            settings.language,
            settings.continuous,
            settings.interim_results,
            settings.max_alternatives
        );
        self.settings = *settings;
    }

    fn start(&mut self) -> Result<()> {
        if !self.supported {
            return Err(Error::Engine("speech recognition not supported".into()));
        }
        if self.active {
            return Err(Error::Engine("recognition already started".into()));
        }
        self.active = true;
        self.emit(EngineEvent::Start);
        Ok(())
    }

    fn stop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &flume::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.drain().collect()
    }

    #[test]
    fn test_utterance_sequence() {
        let (tx, rx) = flume::unbounded();
        let mut engine = ScriptedEngine::new(tx);
        engine.start().unwrap();
        engine.speak("sube la ventana", 0.9);

        let events = drain(&rx);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], EngineEvent::Start);
        assert_eq!(events[4], EngineEvent::End);

        let finals: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Result(r) if r.is_final => r.best().cloned(),
                _ => None,
            })
            .collect();
        assert_eq!(
            finals,
            vec![Alternative {
                transcript: "sube la ventana".into(),
                confidence: 0.9
            }]
        );
        assert!(!engine.is_active());
    }

    #[test]
    fn test_without_interim_results() {
        let (tx, rx) = flume::unbounded();
        let mut engine = ScriptedEngine::new(tx);
        engine.configure(&RecognitionSettings {
            interim_results: false,
            ..RECOGNITION
        });
        engine.start().unwrap();
        engine.speak("baja todas las persianas", 0.8);
        // Start, final, End
        assert_eq!(drain(&rx).len(), 3);
    }

    #[test]
    fn test_single_session_at_a_time() {
        let (tx, _rx) = flume::unbounded();
        let mut engine = ScriptedEngine::new(tx);
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(Error::Engine(_))));
        engine.stop();
        assert!(engine.start().is_ok());
    }

    #[test]
    fn test_unsupported_engine() {
        let (tx, rx) = flume::unbounded();
        let mut engine = ScriptedEngine::unsupported(tx);
        assert!(!engine.is_supported());
        assert!(engine.start().is_err());
        engine.speak("sube", 0.9);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_fail_then_end() {
        let (tx, rx) = flume::unbounded();
        let mut engine = ScriptedEngine::new(tx);
        engine.start().unwrap();
        engine.fail("no-speech");
        assert_eq!(
            drain(&rx),
            vec![
                EngineEvent::Start,
                EngineEvent::Error("no-speech".into()),
                EngineEvent::End
            ]
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(EngineErrorKind::from_code("no-speech").message(), messages::NO_SPEECH);
        assert_eq!(
            EngineErrorKind::from_code("audio-capture").message(),
            messages::AUDIO_CAPTURE
        );
        assert_eq!(
            EngineErrorKind::from_code("not-allowed").message(),
            messages::NOT_ALLOWED
        );
        assert_eq!(
            EngineErrorKind::from_code("network"),
            EngineErrorKind::Other("network".into())
        );
        assert_eq!(
            EngineErrorKind::from_code("network").message(),
            messages::RECOGNITION_FAILED
        );
    }
}
