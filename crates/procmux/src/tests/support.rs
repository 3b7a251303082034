//! Scripted process handles for exercising the scheduler without real
//! processes.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use nix::sys::signal::Signal;

use crate::error::ProcessError;
use crate::process::ProcessHandle;

/// Shared record of what scripted handles did.
#[derive(Clone, Default)]
pub(crate) struct Ledger(Arc<Mutex<LedgerState>>);

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) started: Vec<String>,
    pub(crate) finished: Vec<String>,
    pub(crate) stopped: Vec<String>,
    pub(crate) running: usize,
    pub(crate) peak_running: usize,
}

impl Ledger {
    pub(crate) fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.0.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.state().started.clone()
    }

    pub(crate) fn stopped(&self) -> Vec<String> {
        self.state().stopped.clone()
    }

    pub(crate) fn peak_running(&self) -> usize {
        self.state().peak_running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Terminated,
}

/// A handle that terminates after a fixed number of liveness polls.
pub(crate) struct ScriptedHandle {
    label: String,
    lifetime: usize,
    remaining: usize,
    phase: Phase,
    generation: usize,
    fails_to_start: bool,
    stop_requested: bool,
    ledger: Ledger,
}

impl ScriptedHandle {
    /// Creates an unstarted handle that runs for `lifetime` polls.
    pub(crate) fn new(label: impl Into<String>, lifetime: usize, ledger: &Ledger) -> Self {
        Self {
            label: label.into(),
            lifetime,
            remaining: lifetime,
            phase: Phase::Idle,
            generation: 0,
            fails_to_start: false,
            stop_requested: false,
            ledger: ledger.clone(),
        }
    }

    /// Creates a handle whose `start` always fails.
    pub(crate) fn failing(label: impl Into<String>, ledger: &Ledger) -> Self {
        Self {
            fails_to_start: true,
            ..Self::new(label, 0, ledger)
        }
    }

    /// Creates a handle that is already running.
    pub(crate) fn running(label: impl Into<String>, ledger: &Ledger) -> Self {
        Self {
            phase: Phase::Running,
            ..Self::new(label, 1, ledger)
        }
    }

    /// Number of times this work has been restarted.
    pub(crate) const fn generation(&self) -> usize {
        self.generation
    }

    fn terminate(&mut self) {
        self.phase = Phase::Terminated;
        let mut state = self.ledger.state();
        state.running = state.running.saturating_sub(1);
        state.finished.push(self.label.clone());
    }
}

impl ProcessHandle for ScriptedHandle {
    fn start(&mut self) -> Result<(), ProcessError> {
        if self.fails_to_start {
            return Err(ProcessError::Spawn {
                label: self.label.clone(),
                program: "scripted".into(),
                source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
            });
        }
        if self.phase != Phase::Idle {
            return Err(ProcessError::AlreadyStarted {
                label: self.label.clone(),
            });
        }
        self.phase = Phase::Running;
        let mut state = self.ledger.state();
        state.started.push(self.label.clone());
        state.running += 1;
        state.peak_running = state.peak_running.max(state.running);
        Ok(())
    }

    fn stop(&mut self, _timeout: Duration, _signal: Option<Signal>) -> Result<(), ProcessError> {
        if self.phase == Phase::Running && !self.stop_requested {
            self.stop_requested = true;
            self.remaining = 0;
            self.ledger.state().stopped.push(self.label.clone());
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.phase == Phase::Running
    }

    fn is_terminated(&mut self) -> bool {
        if self.phase == Phase::Running {
            if self.remaining == 0 {
                self.terminate();
            } else {
                self.remaining -= 1;
            }
        }
        self.phase == Phase::Terminated
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }

    fn restart(&mut self) -> Result<Self, ProcessError> {
        if self.phase == Phase::Running {
            return Err(ProcessError::StillRunning {
                label: self.label.clone(),
            });
        }
        let mut replacement = Self {
            generation: self.generation + 1,
            ..Self::new(self.label.clone(), self.lifetime, &self.ledger)
        };
        replacement.start()?;
        Ok(replacement)
    }
}

/// Builds `count` unstarted handles labelled `job-0`, `job-1`, ...
pub(crate) fn jobs(count: usize, lifetime: usize, ledger: &Ledger) -> Vec<ScriptedHandle> {
    (0..count)
        .map(|index| ScriptedHandle::new(format!("job-{index}"), lifetime, ledger))
        .collect()
}
