//! Leave-one-out evaluation of a saved training corpus.

use std::path::PathBuf;

use vibesense::config::{self, Settings};
use vibesense::ml::metrics::{accuracy, leave_one_out, precision_recall_by_class};
use vibesense::ml::{ClassifierKind, TrainOptions};
use vibesense::store::PersistenceStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    corpus: String,
    config_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    kind: Option<ClassifierKind>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let settings = load_settings(&options)?;
    let kind = options.kind.unwrap_or(settings.classifier);
    let artifact_dir = settings
        .resolved_artifact_dir()
        .map_err(|err| err.to_string())?;
    let store = PersistenceStore::new(
        artifact_dir,
        settings.class_names.as_slice(),
        settings.feature_len,
    );
    let corpus = store
        .load_corpus(&options.corpus)
        .map_err(|err| err.to_string())?;
    let cm = leave_one_out(&corpus, &TrainOptions::with_kind(kind)).map_err(|err| err.to_string())?;

    let classes: Vec<&str> = corpus.class_names().collect();
    println!(
        "corpus: {} ({} examples), classifier: {}",
        options.corpus,
        corpus.total(),
        kind.as_str()
    );
    println!("evaluated: {}", cm.total());
    println!("accuracy: {:.4}", accuracy(&cm));
    for (idx, stats) in precision_recall_by_class(&cm).iter().enumerate() {
        println!(
            "class {:>2} {:<16}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            idx,
            classes[idx],
            stats.precision,
            stats.recall,
            stats.f1(),
            stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
    Ok(())
}

fn load_settings(options: &CliOptions) -> Result<Settings, String> {
    let mut settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    if let Some(dir) = &options.artifact_dir {
        settings.artifact_dir = Some(dir.clone());
    }
    Ok(settings)
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut corpus: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut artifact_dir: Option<PathBuf> = None;
    let mut kind: Option<ClassifierKind> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--corpus" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--corpus requires a value".to_string())?;
                corpus = Some(value.to_string());
            }
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--artifact-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifact-dir requires a value".to_string())?;
                artifact_dir = Some(PathBuf::from(value));
            }
            "--classifier" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--classifier requires a value".to_string())?;
                kind = Some(
                    ClassifierKind::parse(value)
                        .ok_or_else(|| format!("Invalid --classifier value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let corpus = corpus.ok_or_else(|| "--corpus is required".to_string())?;
    Ok(CliOptions {
        corpus,
        config_path,
        artifact_dir,
        kind,
    })
}

fn help_text() -> String {
    [
        "vibesense-eval",
        "",
        "Usage:",
        "  vibesense-eval --corpus <name> [options]",
        "",
        "Options:",
        "  --config <config.toml>   Settings file (default: app directory).",
        "  --artifact-dir <dir>     Directory holding <name>.corpus.json.",
        "  --classifier <nearest_neighbor|nearest_centroid>  Override the configured classifier.",
    ]
    .join("\n")
}
