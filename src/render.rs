use std::io::Write;

use crate::dispatch::{DeviceStatus, Motion};
use crate::session::VoiceEvent;
use crate::state::RecognitionState;

/// Terminal view of the voice session.
///
/// Only changes are drawn: a repeated snapshot prints nothing.
pub struct Renderer {
    last: RecognitionState,
    show_interim: bool,
}

impl Renderer {
    pub fn new(show_interim: bool) -> Self {
        Self {
            last: RecognitionState::ready(),
            show_interim,
        }
    }

    pub fn handle(&mut self, event: &VoiceEvent) {
        for line in self.lines(event) {
            println!("\r\x1b[K{}", line);
        }
        std::io::stdout().flush().ok();
    }

    /// Lines to draw for `event`, updating the last seen state
    pub fn lines(&mut self, event: &VoiceEvent) -> Vec<String> {
        let mut out = Vec::new();
        match event {
            VoiceEvent::State(state) => {
                if state.transcript != self.last.transcript
                    && !state.transcript.is_empty()
                    && (self.show_interim || !state.is_listening)
                {
                    out.push(format!(
                        "\x1b[90m\"{}\" ({:.0}%)\x1b[0m",
                        state.transcript,
                        state.confidence * 100.0
                    ));
                }
                if state.message != self.last.message {
                    let color = if state.error.is_some() && !state.is_listening {
                        "31"
                    } else {
                        "33"
                    };
                    out.push(format!("\x1b[{}m{}\x1b[0m", color, state.message));
                }
                self.last = state.clone();
            }
            VoiceEvent::Command(command) => {
                let names: Vec<&str> = command
                    .devices
                    .iter()
                    .map(|d| d.description.as_str())
                    .collect();
                out.push(format!(
                    "\x1b[36m[{}] {} → {}\x1b[0m",
                    command.at.format("%H:%M:%S"),
                    command.action,
                    names.join(", ")
                ));
            }
        }
        out
    }
}

/// One line per device: id, motion and a position bar
pub fn status_line(status: &DeviceStatus) -> String {
    let filled = (status.position as usize) / 10;
    let motion = match status.motion {
        Motion::Up => "▲",
        Motion::Down => "▼",
        Motion::Stopped => "■",
    };
    format!(
        "{:<12} {} [{}{}] {:>3}%",
        status.id,
        motion,
        "█".repeat(filled),
        " ".repeat(10 - filled),
        status.position
    )
}
