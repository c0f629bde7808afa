//! Single-consumer engine loop.
//!
//! Producers on any thread push frames and commands through cloneable
//! [`EngineHandle`]s; one worker thread owns the [`SessionController`] and
//! applies events in arrival order. Controller events are passed to a reporter
//! callback on the worker thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::controller::{
    Command, ControllerError, ControllerEvent, ControllerStatus, SessionController,
};
use crate::ml::CancelFlag;

/// Message consumed by the engine thread.
#[derive(Debug)]
pub enum EngineEvent {
    Frame(Vec<f32>),
    Command(Command),
    /// Reply with a status snapshot.
    Status(Sender<ControllerStatus>),
    Shutdown,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("Engine has stopped")]
    Disconnected,
    #[error("Engine thread panicked")]
    Panicked,
    #[error("Engine stopped on a fatal error: {0}")]
    Fatal(#[from] ControllerError),
}

/// What the engine processed before it stopped.
#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub frames: u64,
    pub commands: u64,
    pub status: ControllerStatus,
}

/// Cloneable producer side of the engine queue.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: Sender<EngineEvent>,
    cancel: CancelFlag,
}

impl EngineHandle {
    pub fn send_frame(&self, frame: Vec<f32>) -> Result<(), DriverError> {
        self.send(EngineEvent::Frame(frame))
    }

    pub fn send_command(&self, command: Command) -> Result<(), DriverError> {
        self.send(EngineEvent::Command(command))
    }

    /// Interrupt a `Train` command that is currently running.
    pub fn cancel_training(&self) {
        self.cancel.cancel();
    }

    /// Ask the engine for a snapshot, waiting until earlier events are applied.
    pub fn status(&self) -> Result<ControllerStatus, DriverError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(EngineEvent::Status(reply_tx))?;
        reply_rx.recv().map_err(|_| DriverError::Disconnected)
    }

    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.send(EngineEvent::Shutdown)
    }

    fn send(&self, event: EngineEvent) -> Result<(), DriverError> {
        self.tx.send(event).map_err(|_| DriverError::Disconnected)
    }
}

/// Running engine thread.
pub struct Engine {
    handle: EngineHandle,
    thread: JoinHandle<Result<EngineSummary, ControllerError>>,
}

impl Engine {
    /// Move `controller` onto a worker thread.
    pub fn spawn<R>(controller: SessionController, reporter: R) -> Result<Self, DriverError>
    where
        R: FnMut(ControllerEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = EngineHandle {
            tx,
            cancel: controller.cancel_flag(),
        };
        let thread = thread::Builder::new()
            .name("vibesense-engine".into())
            .spawn(move || run(controller, rx, reporter))
            .map_err(DriverError::Spawn)?;
        Ok(Self { handle, thread })
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Request shutdown and wait for the worker to finish.
    pub fn join(self) -> Result<EngineSummary, DriverError> {
        // The worker may already be gone after a fatal error.
        let _ = self.handle.shutdown();
        drop(self.handle);
        match self.thread.join() {
            Ok(result) => result.map_err(DriverError::Fatal),
            Err(_) => Err(DriverError::Panicked),
        }
    }
}

fn run<R>(
    mut controller: SessionController,
    rx: Receiver<EngineEvent>,
    mut reporter: R,
) -> Result<EngineSummary, ControllerError>
where
    R: FnMut(ControllerEvent),
{
    let mut frames = 0u64;
    let mut commands = 0u64;
    // Ends on Shutdown or once every handle is dropped.
    while let Ok(event) = rx.recv() {
        match event {
            EngineEvent::Frame(frame) => {
                frames += 1;
                match controller.on_frame(&frame) {
                    Ok(Some(event)) => reporter(event),
                    Ok(None) => {}
                    Err(err) if err.is_fatal() => {
                        tracing::error!(error = %err, frames, "Engine stopping");
                        return Err(err);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Dropped frame");
                        reporter(ControllerEvent::Error(err));
                    }
                }
            }
            EngineEvent::Command(command) => {
                commands += 1;
                tracing::debug!(command = command.name(), "Handling command");
                reporter(controller.handle(command));
            }
            EngineEvent::Status(reply) => {
                let _ = reply.send(controller.status());
            }
            EngineEvent::Shutdown => break,
        }
    }
    tracing::info!(frames, commands, "Engine stopped");
    Ok(EngineSummary {
        frames,
        commands,
        status: controller.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::controller::Mode;
    use crate::store::PersistenceStore;
    use std::sync::{Arc, Mutex};

    fn engine(dir: &std::path::Path) -> (Engine, Arc<Mutex<Vec<String>>>) {
        let settings = Settings {
            feature_len: 2,
            ..Settings::default()
        };
        let store = PersistenceStore::new(dir, settings.class_names.as_slice(), 2);
        let controller = SessionController::new(settings, store).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = Engine::spawn(controller, move |event| {
            sink.lock().unwrap().push(format!("{event:?}"));
        })
        .unwrap();
        (engine, seen)
    }

    #[test]
    fn events_from_several_producers_reach_one_controller() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, seen) = engine(dir.path());
        let producers: Vec<_> = (0..3)
            .map(|_| {
                let handle = engine.handle();
                thread::spawn(move || {
                    for _ in 0..10 {
                        handle.send_frame(vec![0.0, 0.0]).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        let handle = engine.handle();
        handle.send_command(Command::CaptureSample).unwrap();
        assert_eq!(handle.status().unwrap().count, 1);

        let summary = engine.join().unwrap();
        assert_eq!(summary.frames, 30);
        assert_eq!(summary.commands, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn train_then_classify_through_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, seen) = engine(dir.path());
        let handle = engine.handle();
        handle.send_frame(vec![0.0, 0.0]).unwrap();
        handle.send_command(Command::CaptureSample).unwrap();
        handle.send_command(Command::AdvanceClass).unwrap();
        handle.send_frame(vec![1.0, 1.0]).unwrap();
        handle.send_command(Command::CaptureSample).unwrap();
        handle.send_command(Command::Train).unwrap();
        handle.send_frame(vec![0.9, 0.8]).unwrap();
        assert_eq!(handle.status().unwrap().mode, Mode::Classifying);

        let summary = engine.join().unwrap();
        assert_eq!(summary.status.last_label.as_deref(), Some("full"));
        let seen = seen.lock().unwrap();
        assert!(seen.last().is_some_and(|event| event.contains("Classified")));
    }

    #[test]
    fn bad_frames_are_reported_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, seen) = engine(dir.path());
        let handle = engine.handle();
        handle.send_frame(vec![1.0]).unwrap();
        handle.send_frame(vec![1.0, 2.0]).unwrap();
        assert!(handle.status().is_ok());
        let summary = engine.join().unwrap();
        assert_eq!(summary.frames, 2);
        assert!(seen.lock().unwrap()[0].contains("InvalidFeatureLength"));
    }

    #[test]
    fn handles_fail_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _seen) = engine(dir.path());
        let handle = engine.handle();
        engine.join().unwrap();
        assert!(matches!(
            handle.send_command(Command::Train),
            Err(DriverError::Disconnected)
        ));
    }
}
