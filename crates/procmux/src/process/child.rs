//! OS-backed [`ProcessHandle`] implementation.

use std::fmt;
use std::io;
use std::process::{Child, ExitStatus};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use super::reader::{StreamEvent, spawn_reader};
use super::{ChildCommand, ChunkSink, PROCESS_TARGET, ProcessHandle, StreamKind};
use crate::error::ProcessError;

/// Label used until the caller assigns one.
pub const DEFAULT_LABEL: &str = "Process";

/// How long output pipes may stay open after the child exits.
///
/// A grandchild that inherited the pipes can keep them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A child process whose stdout and stderr are routed to a [`ChunkSink`].
///
/// Output is read on background threads and delivered to the sink only from
/// [`ProcessHandle::pump`], so sink callbacks always run on the thread that
/// owns the handle. The process counts as terminated once it has exited and
/// both pipes have been drained through `pump`.
pub struct ChildProcess {
    command: ChildCommand,
    label: String,
    sink: Option<Box<dyn ChunkSink>>,
    state: ChildState,
}

enum ChildState {
    NotStarted,
    Running(Box<Running>),
    Finished(Option<ExitStatus>),
}

struct Running {
    child: Child,
    events: Receiver<StreamEvent>,
    open_streams: usize,
    exited: bool,
    status: Option<ExitStatus>,
    exited_at: Option<Instant>,
    kill_deadline: Option<Instant>,
    _readers: Vec<JoinHandle<()>>,
}

impl ChildProcess {
    /// Creates an unstarted process for `command`.
    #[must_use]
    pub fn new(command: ChildCommand) -> Self {
        Self {
            command,
            label: DEFAULT_LABEL.to_owned(),
            sink: None,
            state: ChildState::NotStarted,
        }
    }

    /// Sets the label used in logs and diagnostics.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.set_label(label.into());
        self
    }

    /// Routes the child's output to `sink`.
    ///
    /// Without a sink, output is read and discarded.
    #[must_use]
    pub fn with_sink(mut self, sink: impl ChunkSink + 'static) -> Self {
        let mut boxed: Box<dyn ChunkSink> = Box::new(sink);
        boxed.set_label(&self.label);
        self.sink = Some(boxed);
        self
    }

    /// Returns the command this process runs.
    #[must_use]
    pub const fn command(&self) -> &ChildCommand {
        &self.command
    }

    /// Returns the OS process id while the child is running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        match &self.state {
            ChildState::Running(running) => Some(running.child.id()),
            ChildState::NotStarted | ChildState::Finished(_) => None,
        }
    }

    /// Returns the exit status once the child has exited.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match &self.state {
            ChildState::Running(running) => running.status,
            ChildState::Finished(status) => *status,
            ChildState::NotStarted => None,
        }
    }

    fn io_error(&self, source: io::Error) -> ProcessError {
        ProcessError::Io {
            label: self.label.clone(),
            source: Arc::new(source),
        }
    }

    fn spawn(&self) -> Result<Running, ProcessError> {
        debug!(
            target: PROCESS_TARGET,
            label = %self.label,
            command = %self.command.display(),
            "spawning child process"
        );

        let mut child =
            self.command
                .to_command()
                .spawn()
                .map_err(|source| ProcessError::Spawn {
                    label: self.label.clone(),
                    program: self.command.display(),
                    source: Arc::new(source),
                })?;

        let (sender, events) = mpsc::channel();
        let readers = match attach_readers(&mut child, &sender) {
            Ok(readers) => readers,
            Err(error) => {
                drop(child.kill());
                drop(child.wait());
                return Err(self.io_error(error));
            }
        };

        debug!(
            target: PROCESS_TARGET,
            label = %self.label,
            pid = child.id(),
            "child process spawned"
        );

        Ok(Running {
            child,
            events,
            open_streams: readers.len(),
            exited: false,
            status: None,
            exited_at: None,
            kill_deadline: None,
            _readers: readers,
        })
    }

    /// Observes exit, enforces a pending kill deadline, and moves to the
    /// finished state once output is fully drained.
    fn refresh(&mut self) {
        let ChildState::Running(running) = &mut self.state else {
            return;
        };
        running.poll_exit(&self.label);
        if !running.exited {
            return;
        }

        let drained = running.open_streams == 0;
        let abandoned = running
            .exited_at
            .is_some_and(|exited_at| exited_at.elapsed() >= DRAIN_GRACE);
        if !drained && !abandoned {
            return;
        }
        if !drained {
            warn!(
                target: PROCESS_TARGET,
                label = %self.label,
                open_streams = running.open_streams,
                "output pipes still open after exit; abandoning remaining output"
            );
        }
        let status = running.status;
        self.state = ChildState::Finished(status);
    }
}

impl Running {
    fn poll_exit(&mut self, label: &str) {
        if self.exited {
            return;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, label, %status, "child process exited");
                self.mark_exited(Some(status));
            }
            Ok(None) => self.enforce_deadline(label),
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    label,
                    error = %error,
                    "failed to poll child process; treating it as exited"
                );
                self.mark_exited(None);
            }
        }
    }

    fn mark_exited(&mut self, status: Option<ExitStatus>) {
        self.exited = true;
        self.status = status;
        self.exited_at = Some(Instant::now());
        self.kill_deadline = None;
    }

    fn enforce_deadline(&mut self, label: &str) {
        let Some(deadline) = self.kill_deadline else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        warn!(
            target: PROCESS_TARGET,
            label,
            pid = self.child.id(),
            "child ignored stop request; killing"
        );
        if let Err(error) = self.child.kill() {
            warn!(target: PROCESS_TARGET, label, error = %error, "failed to kill child");
        }
        self.kill_deadline = None;
    }

    fn pid(&self) -> io::Result<Pid> {
        i32::try_from(self.child.id())
            .map(Pid::from_raw)
            .map_err(io::Error::other)
    }
}

impl ProcessHandle for ChildProcess {
    fn start(&mut self) -> Result<(), ProcessError> {
        if !matches!(self.state, ChildState::NotStarted) {
            return Err(ProcessError::AlreadyStarted {
                label: self.label.clone(),
            });
        }
        let running = self.spawn()?;
        self.state = ChildState::Running(Box::new(running));
        Ok(())
    }

    fn pump(&mut self) -> Result<(), ProcessError> {
        let Self {
            state, sink, label, ..
        } = self;
        let ChildState::Running(running) = state else {
            return Ok(());
        };

        loop {
            match running.events.try_recv() {
                Ok(StreamEvent::Chunk(stream, chunk)) => {
                    if let Some(receiver) = sink.as_mut() {
                        receiver.on_chunk(stream, &chunk)?;
                    }
                }
                Ok(StreamEvent::Closed(stream, failure)) => {
                    running.open_streams = running.open_streams.saturating_sub(1);
                    if let Some(error) = failure {
                        warn!(
                            target: PROCESS_TARGET,
                            label = %label,
                            %stream,
                            error = %error,
                            "failed reading child output"
                        );
                    }
                    if let Some(receiver) = sink.as_mut() {
                        receiver.on_close(stream)?;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    running.open_streams = 0;
                    break;
                }
            }
        }

        self.refresh();
        Ok(())
    }

    fn stop(&mut self, timeout: Duration, requested: Option<Signal>) -> Result<(), ProcessError> {
        self.refresh();
        let label = self.label.clone();
        let ChildState::Running(running) = &mut self.state else {
            return Ok(());
        };
        if running.exited {
            return Ok(());
        }

        let signal = requested.unwrap_or(Signal::SIGTERM);
        if timeout.is_zero() || signal == Signal::SIGKILL {
            info!(target: PROCESS_TARGET, label = %label, "killing child process");
            return running.child.kill().map_err(|source| ProcessError::Io {
                label,
                source: Arc::new(source),
            });
        }

        let pid = running.pid().map_err(|source| ProcessError::Io {
            label: label.clone(),
            source: Arc::new(source),
        })?;
        match signal::kill(pid, signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(source) => {
                return Err(ProcessError::Signal {
                    label,
                    signal,
                    source,
                });
            }
        }

        if let Some(deadline) = Instant::now().checked_add(timeout) {
            running.kill_deadline = Some(
                running
                    .kill_deadline
                    .map_or(deadline, |current| current.min(deadline)),
            );
        }
        info!(
            target: PROCESS_TARGET,
            label = %label,
            %signal,
            timeout_ms = timeout.as_millis(),
            "stop requested"
        );
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.refresh();
        matches!(&self.state, ChildState::Running(running) if !running.exited)
    }

    fn is_terminated(&mut self) -> bool {
        self.refresh();
        matches!(self.state, ChildState::Finished(_))
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        if let Some(sink) = self.sink.as_mut() {
            sink.set_label(&label);
        }
        self.label = label;
    }

    fn restart(&mut self) -> Result<Self, ProcessError> {
        if self.is_running() {
            return Err(ProcessError::StillRunning {
                label: self.label.clone(),
            });
        }

        let mut replacement = Self {
            command: self.command.clone(),
            label: self.label.clone(),
            sink: self.sink.take(),
            state: ChildState::NotStarted,
        };
        if let Err(error) = replacement.start() {
            self.sink = replacement.sink.take();
            return Err(error);
        }
        debug!(target: PROCESS_TARGET, label = %self.label, "child process restarted");
        Ok(replacement)
    }
}

impl fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            ChildState::NotStarted => "not started",
            ChildState::Running(running) if running.exited => "draining",
            ChildState::Running(_) => "running",
            ChildState::Finished(_) => "finished",
        };
        f.debug_struct("ChildProcess")
            .field("command", &self.command)
            .field("label", &self.label)
            .field("has_sink", &self.sink.is_some())
            .field("state", &state)
            .finish()
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        let ChildState::Running(running) = &mut self.state else {
            return;
        };
        if running.exited {
            return;
        }
        if let Err(error) = running.child.kill() {
            debug!(target: PROCESS_TARGET, label = %self.label, error = %error, "kill on drop failed");
        }
        drop(running.child.wait());
    }
}

fn attach_readers(
    child: &mut Child,
    sender: &mpsc::Sender<StreamEvent>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
    Ok(vec![
        spawn_reader(StreamKind::Stdout, stdout, sender.clone())?,
        spawn_reader(StreamKind::Stderr, stderr, sender.clone())?,
    ])
}
