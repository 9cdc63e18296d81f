use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use persiana::command::{self, CommandOutcome};
use persiana::config::DEFAULT_CONFIG_PATH;
use persiana::keywords::RECOGNITION;
use persiana::render::{self, Renderer};
use persiana::{
    Config, Device, DeviceRegistry, DeviceType, Dispatcher, EngineEvent, ScriptedEngine,
    SimulatedBlinds, SnapshotSource, VoiceEvent, VoiceSession, matcher,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "persiana", version, about = "Spanish voice control for blinds and doors")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session: every line you type is spoken to the recogniser
    Listen {
        /// Confidence reported for typed utterances
        #[arg(long, default_value_t = 0.9)]
        confidence: f32,
        /// Behave as if speech recognition were unavailable
        #[arg(long)]
        unsupported: bool,
    },
    /// Parse a phrase and show which devices it would move
    Parse {
        phrase: String,
        #[arg(long, default_value_t = 0.9)]
        confidence: f32,
    },
    /// Manage the device registry
    Devices {
        #[command(subcommand)]
        command: DevicesCommand,
    },
    /// Send an action (on/off/stop) to one device
    Send { id: String, action: String },
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List registered devices
    List,
    /// Register a device
    Add {
        id: String,
        description: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Motor raises when told to lower
        #[arg(long)]
        inverted: bool,
    },
    /// Remove a device
    Remove { id: String },
    /// Replace the registry with the default devices
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Door,
    Window,
}

impl From<KindArg> for DeviceType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Door => DeviceType::Door,
            KindArg::Window => DeviceType::Window,
        }
    }
}

#[hotpath::main]
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_tracing(&config, cli.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli, config))
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

async fn async_main(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        None => run_listen(config, 0.9, false).await,
        Some(Command::Listen {
            confidence,
            unsupported,
        }) => run_listen(config, confidence, unsupported).await,
        Some(Command::Parse { phrase, confidence }) => run_parse(&config, &phrase, confidence),
        Some(Command::Devices { command }) => run_devices(&config, command),
        Some(Command::Send { id, action }) => run_send(&config, &id, &action),
    }
}

fn open_registry(config: &Config) -> Result<DeviceRegistry> {
    DeviceRegistry::load(&config.registry.path, config.registry.seed_defaults).with_context(
        || {
            format!(
                "Failed to open device registry {}",
                config.registry.path.display()
            )
        },
    )
}

/// Outcome of one REPL line
enum Flow {
    Continue,
    Quit,
}

async fn run_listen(config: Config, confidence: f32, unsupported: bool) -> Result<()> {
    let registry = open_registry(&config)?;
    let blinds = Arc::new(SimulatedBlinds::from_config(&config.actuator));
    let dispatcher = Dispatcher::new(blinds.clone());

    // Channel: engine -> session (strictly ordered)
    let (engine_tx, engine_rx) = flume::unbounded::<EngineEvent>();
    // Channel: session -> terminal
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<VoiceEvent>();

    let engine = if unsupported {
        ScriptedEngine::unsupported(engine_tx)
    } else {
        ScriptedEngine::new(engine_tx)
    };
    let mut session = VoiceSession::new(engine, registry.clone(), dispatcher, event_tx);
    let mut renderer = Renderer::new(config.ui.show_interim);
    let mut confidence = confidence.clamp(0.0, 1.0);

    // Stdin thread
    let (input_tx, input_rx) = flume::unbounded::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(line.trim().to_string()).is_err() {
                break;
            }
        }
    });

    println!(
        "Habla escribiendo una frase ({}, confianza {:.2}). :help para ver los comandos.\n",
        RECOGNITION.language, confidence
    );

    let mut tick = tokio::time::interval(Duration::from_millis(config.actuator.tick_ms));

    loop {
        tokio::select! {
            biased;

            Ok(event) = engine_rx.recv_async() => {
                session.handle(event);
            }

            Some(event) = event_rx.recv() => {
                renderer.handle(&event);
            }

            line = input_rx.recv_async() => {
                let Ok(line) = line else { break };
                if let Flow::Quit = handle_line(&line, &mut session, &mut confidence, &registry, &blinds) {
                    break;
                }
            }

            _ = tick.tick() => {
                blinds.tick();
            }
        }
    }

    // Flush whatever the last utterance produced
    session.pump(&engine_rx);
    while let Ok(event) = event_rx.try_recv() {
        renderer.handle(&event);
    }
    Ok(())
}

fn handle_line(
    line: &str,
    session: &mut VoiceSession<ScriptedEngine, DeviceRegistry>,
    confidence: &mut f32,
    registry: &DeviceRegistry,
    blinds: &SimulatedBlinds,
) -> Flow {
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    match head {
        "" => {}
        ":quit" | ":q" => return Flow::Quit,
        ":help" => print_help(),
        ":conf" => match rest.trim().parse::<f32>() {
            Ok(value) if value.is_finite() => {
                *confidence = value.clamp(0.0, 1.0);
                println!("Confianza: {:.2}", confidence);
            }
            _ => println!("Uso: :conf <0.0-1.0>"),
        },
        ":error" => {
            let code = if rest.trim().is_empty() {
                "no-speech"
            } else {
                rest.trim()
            };
            session.start();
            session.engine_mut().fail(code);
        }
        ":stop" => session.stop(),
        ":status" => {
            for device in registry.snapshot() {
                println!("{}", render::status_line(&blinds.status(&device.id)));
            }
        }
        ":devices" => print_devices(&registry.snapshot()),
        _ => {
            session.start();
            session.engine_mut().speak(line, *confidence);
        }
    }
    Flow::Continue
}

fn print_help() {
    println!(
        "\
Comandos:
  <frase>          Hablar (p. ej. \"sube la ventana del salón\")
  :conf <0-1>      Confianza de las siguientes frases
  :error <código>  Simular un error del motor (no-speech, audio-capture, not-allowed)
  :stop            Detener la escucha
  :status          Posición de cada dispositivo
  :devices         Lista de dispositivos
  :quit            Salir"
    );
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("(sin dispositivos)");
        return;
    }
    for device in devices {
        println!(
            "{:<12} {:<7} {}{}",
            device.id,
            device.kind.to_string(),
            device.description,
            if device.inverted { " (invertido)" } else { "" }
        );
    }
}

fn run_parse(config: &Config, phrase: &str, confidence: f32) -> Result<()> {
    let registry = open_registry(config)?;
    let transcript = phrase.trim().to_lowercase();

    let outcome = if !command::passes_threshold(confidence) {
        CommandOutcome::LowConfidence
    } else {
        matcher::resolve(&transcript, &registry.snapshot())
    };

    let (command, devices) = match &outcome {
        CommandOutcome::Matched { command, devices } => (Some(*command), devices.clone()),
        CommandOutcome::NoDeviceFound(command) => (Some(*command), Vec::new()),
        CommandOutcome::LowConfidence | CommandOutcome::NotUnderstood => (None, Vec::new()),
    };
    let output = json!({
        "transcript": transcript,
        "confidence": confidence,
        "command": command,
        "devices": devices,
        "feedback": outcome.message(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_devices(config: &Config, command: DevicesCommand) -> Result<()> {
    let registry = open_registry(config)?;
    match command {
        DevicesCommand::List => print_devices(&registry.snapshot()),
        DevicesCommand::Add {
            id,
            description,
            kind,
            inverted,
        } => {
            let mut device = Device::new(id, description, kind.into());
            device.inverted = inverted;
            registry.add(device)?;
            println!("Dispositivo añadido");
        }
        DevicesCommand::Remove { id } => {
            let removed = registry.remove(&id)?;
            println!("Dispositivo eliminado: {}", removed.description);
        }
        DevicesCommand::Reset => {
            registry.clear()?;
            for device in persiana::device::default_devices() {
                registry.add(device)?;
            }
            println!("Registro restablecido ({} dispositivos)", registry.len());
        }
    }
    Ok(())
}

fn run_send(config: &Config, id: &str, action: &str) -> Result<()> {
    let registry = open_registry(config)?;
    let device = registry
        .get(id)
        .ok_or_else(|| persiana::Error::DeviceNotFound(id.to_string()))?;
    let blinds = Arc::new(SimulatedBlinds::from_config(&config.actuator));
    let dispatcher = Dispatcher::new(blinds.clone());

    let count = dispatcher.dispatch_named(std::slice::from_ref(&device), action)?;
    println!("{}", persiana::command::success_message(count));
    println!("{}", render::status_line(&blinds.status(&device.id)));
    Ok(())
}
