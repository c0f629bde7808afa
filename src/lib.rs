//! Library exports for the binaries, benchmarks and tests.
/// Per-user application directories.
pub mod app_dirs;
/// Crash-safe file replacement.
pub mod atomic_file;
/// TOML engine settings.
pub mod config;
/// Frame and command routing state machine.
pub mod controller;
/// Labeled training corpus.
pub mod corpus;
/// Single-consumer engine thread.
pub mod driver;
/// Feature vectors and labeled examples.
pub mod features;
/// Logging setup.
pub mod logging;
/// Classifier training, inference and evaluation.
pub mod ml;
/// Recording sessions and verdicts.
pub mod session;
/// Model and corpus artifacts.
pub mod store;
