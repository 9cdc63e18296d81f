//! Keyword tables for Spanish voice commands
//!
//! Commands follow the shape "[action] [device] [room]", e.g.
//! "sube la ventana del salón", "cierra la puerta principal" or just "para".
//! Every table is static; matching logic lives in `command`.

/// Raise / open (`on`)
pub const UP_KEYWORDS: &[&str] = &[
    "subir", "sube", "elevar", "eleva", "arriba", "abre", "abrir", "abriendo", "levanta",
    "levantar",
];

/// Lower / close (`off`)
pub const DOWN_KEYWORDS: &[&str] = &[
    "bajar", "baja", "cerrar", "cierra", "cerrando", "abajo", "bajando", "descender",
];

/// Stop (`stop`)
pub const STOP_KEYWORDS: &[&str] = &[
    "parar", "para", "stop", "detener", "detén", "detente", "espera", "quieto", "quieta", "alto",
];

pub const WINDOW_KEYWORDS: &[&str] = &["ventana", "ventanas", "persiana", "persianas", "cristal"];

pub const DOOR_KEYWORDS: &[&str] = &["puerta", "puertas", "portal", "portón"];

/// Room label -> trigger phrases.
///
/// Order matters: the first room with any keyword contained in the
/// transcript wins, and within a room the keywords are tried in order.
/// Labels are matched as substrings of device descriptions.
pub const ROOM_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Hab. Principal",
        &[
            "principal",
            "habitación principal",
            "habitacion principal",
            "dormitorio principal",
            "cuarto principal",
            "master",
            "matrimonio",
        ],
    ),
    (
        "Salón",
        &["salón", "salon", "sala", "living", "comedor", "sala de estar"],
    ),
    (
        "Ordenadores",
        &[
            "ordenadores",
            "ordenador",
            "computadora",
            "computadoras",
            "despacho",
            "oficina",
            "estudio",
        ],
    ),
    (
        "Hab. Jaume/Edu",
        &[
            "jaume",
            "edu",
            "jaume edu",
            "habitación jaume",
            "habitación edu",
            "habitacion jaume",
            "habitacion edu",
            "cuarto jaume",
            "cuarto edu",
        ],
    ),
];

/// Words that address every device at once
pub const GLOBAL_KEYWORDS: &[&str] = &["todo", "todos", "todas", "completo", "general", "global"];

/// Fixed speech engine settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionSettings {
    /// BCP-47 language tag handed to the engine
    pub language: &'static str,
    /// Keep listening after a final result
    pub continuous: bool,
    /// Emit provisional transcripts while the user speaks
    pub interim_results: bool,
    /// Alternatives requested from the engine (only the first is read)
    pub max_alternatives: u32,
    /// Minimum confidence for a final transcript to be acted on
    pub confidence_threshold: f32,
}

pub const RECOGNITION: RecognitionSettings = RecognitionSettings {
    language: "es-ES",
    continuous: false,
    interim_results: true,
    max_alternatives: 3,
    confidence_threshold: 0.6,
};

/// User-facing status strings
pub mod messages {
    pub const LISTENING: &str = "🎤 Escuchando...";
    pub const PROCESSING: &str = "⚙️ Procesando comando...";
    pub const SUCCESS: &str = "✅ Comando ejecutado";
    pub const NOT_UNDERSTOOD: &str = "❓ No se entendió el comando";
    pub const NO_DEVICE_FOUND: &str = "🔍 No se encontró el dispositivo";
    pub const READY: &str = "🎤 Pulsa para hablar";

    pub const NOT_SUPPORTED: &str = "❌ Tu navegador no soporta reconocimiento de voz";
    pub const START_FAILED: &str = "❌ Error al iniciar micrófono";

    pub const NO_SPEECH: &str = "❓ No se detectó voz";
    pub const AUDIO_CAPTURE: &str = "🎤 Error de micrófono";
    pub const NOT_ALLOWED: &str = "🚫 Permiso de micrófono denegado";
    pub const RECOGNITION_FAILED: &str = "❌ Error en reconocimiento";
}

/// Check whether the transcript addresses every device ("todo", "todas", ...)
pub fn mentions_global(transcript: &str) -> bool {
    transcript
        .split_whitespace()
        .any(|word| GLOBAL_KEYWORDS.contains(&word))
}
