//! Headless line-oriented driver for the vibesense engine.
//!
//! Reads stdin line by line: a frame is a list of numbers separated by
//! whitespace or commas; a line starting with `:` is a command.

use std::io::BufRead;
use std::path::PathBuf;

use vibesense::config;
use vibesense::controller::{Command, ControllerEvent, ControllerStatus, Mode, SessionController};
use vibesense::driver::Engine;
use vibesense::logging;
use vibesense::store::PersistenceStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Empty,
    Frame(Vec<f32>),
    Command(Command),
    Status,
    Quit,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    if let Some(dir) = options.artifact_dir {
        settings.artifact_dir = Some(dir);
    }
    if let Err(err) = logging::init(&settings.log_level) {
        eprintln!("Logging disabled: {err}");
    }

    let artifact_dir = settings
        .resolved_artifact_dir()
        .map_err(|err| err.to_string())?;
    tracing::info!(
        classes = ?settings.class_names,
        feature_len = settings.feature_len,
        classifier = settings.classifier.as_str(),
        artifacts = %artifact_dir.display(),
        "Starting engine"
    );
    let store = PersistenceStore::new(
        artifact_dir,
        settings.class_names.as_slice(),
        settings.feature_len,
    );
    let controller = SessionController::new(settings, store).map_err(|err| err.to_string())?;
    let engine = Engine::spawn(controller, |event| println!("{}", describe(&event)))
        .map_err(|err| err.to_string())?;
    let handle = engine.handle();

    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|err| format!("Failed to read stdin: {err}"))?;
        let sent = match parse_line(&line) {
            Ok(Input::Empty) => Ok(()),
            Ok(Input::Frame(values)) => handle.send_frame(values),
            Ok(Input::Command(command)) => handle.send_command(command),
            Ok(Input::Status) => handle
                .status()
                .map(|status| println!("{}", describe_status(&status))),
            Ok(Input::Quit) => break,
            Err(message) => {
                eprintln!("{message}");
                Ok(())
            }
        };
        if sent.is_err() {
            break;
        }
    }

    let summary = engine.join().map_err(|err| err.to_string())?;
    tracing::info!(
        frames = summary.frames,
        commands = summary.commands,
        "Session finished"
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--artifact-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifact-dir requires a value".to_string())?;
                options.artifact_dir = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "vibesense",
        "",
        "Usage:",
        "  vibesense [--config <config.toml>] [--artifact-dir <dir>]",
        "",
        "Input (stdin, one per line):",
        "  <v1> <v2> ...     Feature frame (whitespace or comma separated).",
        "  :next             Collect the next class.",
        "  :capture          Store the latest frame under the current class.",
        "  :train            Train and start classifying.",
        "  :record           Start or stop a recording.",
        "  :collect          Go back to collecting examples.",
        "  :save [name]      Save model and corpus.",
        "  :load [name]      Load model and corpus.",
        "  :status           Print the engine status.",
        "  :quit             Exit.",
    ]
    .join("\n")
}

fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Input::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return parse_frame(line).map(Input::Frame);
    };
    let mut parts = command.split_whitespace();
    let word = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return Err(format!("Too many arguments: {line}"));
    }
    let input = match (word, arg) {
        ("next", None) => Input::Command(Command::AdvanceClass),
        ("capture", None) => Input::Command(Command::CaptureSample),
        ("train", None) => Input::Command(Command::Train),
        ("record", None) => Input::Command(Command::ToggleRecording),
        ("collect", None) => Input::Command(Command::ResumeCollecting),
        ("save", name) => Input::Command(Command::Save(name)),
        ("load", name) => Input::Command(Command::Load(name)),
        ("status", None) => Input::Status,
        ("quit" | "exit", None) => Input::Quit,
        _ => return Err(format!("Unknown command: {line}")),
    };
    Ok(input)
}

fn parse_frame(line: &str) -> Result<Vec<f32>, String> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| format!("Invalid frame value: {token}"))
        })
        .collect()
}

fn describe(event: &ControllerEvent) -> String {
    match event {
        ControllerEvent::Collecting { class, count } => {
            format!("collecting {class}: {count} examples")
        }
        ControllerEvent::Classified { label } => label.clone(),
        ControllerEvent::RecordingStarted => "recording".to_string(),
        ControllerEvent::Verdict(Some(label)) => format!("verdict: {label}"),
        ControllerEvent::Verdict(None) => "verdict: none".to_string(),
        ControllerEvent::Trained { kind, examples } => {
            format!("trained {} on {examples} examples", kind.as_str())
        }
        ControllerEvent::Saved { model, corpus } => match model {
            Some(model) => format!("saved {} and {}", model.display(), corpus.display()),
            None => format!("saved {} (no model yet)", corpus.display()),
        },
        ControllerEvent::Loaded {
            name,
            examples,
            model,
        } => {
            let model = if *model { "with model" } else { "without model" };
            format!("loaded {name}: {examples} examples, {model}")
        }
        ControllerEvent::Ignored { command, mode } => {
            format!("ignored {command} while {}", mode_name(*mode))
        }
        ControllerEvent::Error(err) => format!("error: {err}"),
    }
}

fn describe_status(status: &ControllerStatus) -> String {
    format!(
        "mode={} class={} count={} total={} trained={} recording={} last={}",
        mode_name(status.mode),
        status.class,
        status.count,
        status.total_examples,
        status.trained,
        status.recording,
        status.last_label.as_deref().unwrap_or("-")
    )
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Collecting { .. } => "collecting",
        Mode::Classifying => "classifying",
    }
}
