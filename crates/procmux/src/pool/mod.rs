//! Bounded-concurrency scheduling of child processes.
//!
//! A [`ProcessPool`] pulls unstarted handles from a [`WorkSource`] and keeps
//! at most `concurrency` of them alive. The pool never blocks on a child:
//! [`ProcessPool::tick`] polls every occupied slot once, runs finish hooks,
//! refills free slots, and returns. [`ProcessPool::wait`] repeats that at the
//! poll interval until the pool stops.
//!
//! ```rust,no_run
//! use procmux::{ChildCommand, ChildProcess, MessageRouter, ProcessPool};
//!
//! # fn main() -> Result<(), procmux::PoolError> {
//! let jobs = ["alpha", "beta", "gamma"].into_iter().map(|name| {
//!     ChildProcess::new(ChildCommand::new("worker").arg(name))
//!         .with_label(name)
//!         .with_sink(MessageRouter::new())
//! });
//!
//! let mut pool = ProcessPool::new(jobs);
//! pool.set_concurrency(2)?;
//! pool.run()?;
//! # Ok(())
//! # }
//! ```

mod slot;
mod source;

use std::thread;
use std::time::Duration;

use nix::sys::signal::Signal;
use procmux_config::PoolConfig;
use procmux_config::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STOP_TIMEOUT_MS,
};
use strum::Display;
use tracing::{debug, info, warn};

pub use self::slot::SlotState;
pub use self::source::WorkSource;

use self::slot::Slot;
use crate::error::{ConfigurationError, PoolError};
use crate::process::ProcessHandle;

/// Log target for scheduling decisions.
pub(crate) const POOL_TARGET: &str = "procmux::pool";

/// Called with each handle right after it has started.
pub type StartedHook<H> = Box<dyn FnMut(&mut H) + Send>;

/// Called with each terminated handle; a returned handle replaces it.
pub type FinishedHook<H> = Box<dyn FnMut(&mut H) -> Option<H> + Send>;

/// Pool lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PoolState {
    /// Not scheduling. Initial and terminal state.
    Stopped,
    /// Filling slots from the work source.
    Running,
    /// No new work is pulled; running processes drain.
    Finishing,
}

/// Runs handles from a [`WorkSource`] with bounded concurrency.
pub struct ProcessPool<S: WorkSource> {
    source: S,
    exhausted: bool,
    finishing: bool,
    stopped: bool,
    slots: Vec<Slot<S::Handle>>,
    concurrency: usize,
    state: PoolState,
    poll_interval: Duration,
    stop_timeout: Duration,
    stop_signal: Signal,
    started_hook: Option<StartedHook<S::Handle>>,
    finished_hook: Option<FinishedHook<S::Handle>>,
}

impl<S: WorkSource> ProcessPool<S> {
    /// Creates a stopped pool with default settings: one slot, a 300 ms poll
    /// interval and a 10 s `SIGTERM` grace period on stop.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            exhausted: false,
            finishing: false,
            stopped: false,
            slots: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            state: PoolState::Stopped,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
            stop_signal: Signal::SIGTERM,
            started_hook: None,
            finished_hook: None,
        }
    }

    /// Creates a stopped pool using validated settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Config`] when `config` is invalid.
    pub fn from_config(source: S, config: &PoolConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let mut pool = Self::new(source);
        pool.concurrency = config.concurrency();
        pool.poll_interval = config.poll_interval();
        pool.stop_timeout = config.stop_timeout();
        pool.stop_signal = config.stop_signal()?;
        Ok(pool)
    }

    /// Registers a hook run with each handle after it starts.
    #[must_use]
    pub fn on_started(mut self, hook: impl FnMut(&mut S::Handle) + Send + 'static) -> Self {
        self.started_hook = Some(Box::new(hook));
        self
    }

    /// Registers a hook run with each terminated handle.
    ///
    /// Returning a running handle (typically from [`ProcessHandle::restart`])
    /// keeps the slot occupied by it; returning `None` frees the slot.
    #[must_use]
    pub fn on_finished(
        mut self,
        hook: impl FnMut(&mut S::Handle) -> Option<S::Handle> + Send + 'static,
    ) -> Self {
        self.finished_hook = Some(Box::new(hook));
        self
    }

    /// Changes the concurrency limit, effective from the next fill.
    ///
    /// Lowering the limit never stops running processes; the pool simply
    /// refills less until the occupied count drops below the new limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConcurrency`] for zero.
    pub fn set_concurrency(&mut self, concurrency: usize) -> Result<(), ConfigurationError> {
        if concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency { value: concurrency });
        }
        debug!(target: POOL_TARGET, concurrency, "concurrency changed");
        self.concurrency = concurrency;
        Ok(())
    }

    /// Changes the interval [`ProcessPool::wait`] sleeps between ticks.
    pub const fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PoolState {
        self.state
    }

    /// Returns `true` until the pool has stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state != PoolState::Stopped
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the interval between ticks in [`ProcessPool::wait`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }

    /// Returns the state of every slot, indexed by slot number.
    #[must_use]
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.slots.iter().map(Slot::state).collect()
    }

    /// Returns the handle occupying slot `index`.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&S::Handle> {
        self.slots.get(index).and_then(Slot::handle)
    }

    /// Starts scheduling and fills every free slot.
    ///
    /// A pool that was asked to finish before it started goes straight to
    /// [`PoolState::Finishing`] without pulling any work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::AlreadyRunning`] while the pool is
    /// running, [`ConfigurationError::AlreadyStopped`] once it has run to a
    /// stop, and any error raised while filling slots.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.state != PoolState::Stopped {
            return Err(ConfigurationError::AlreadyRunning.into());
        }
        if self.stopped {
            return Err(ConfigurationError::AlreadyStopped.into());
        }
        info!(target: POOL_TARGET, concurrency = self.concurrency, "pool starting");
        if self.finishing {
            self.state = PoolState::Finishing;
            return Ok(());
        }
        self.state = PoolState::Running;
        self.fill_slots()
    }

    /// Advances the pool by one scheduling step without blocking.
    ///
    /// # Errors
    ///
    /// Returns a [`PoolError`] when a process fails to deliver output or
    /// start, or when a hook or the work source breaks the pool contract.
    pub fn tick(&mut self) -> Result<PoolState, PoolError> {
        if self.state == PoolState::Stopped {
            return Ok(self.state);
        }

        self.reap_slots()?;
        if self.state == PoolState::Running {
            self.fill_slots()?;
        }

        let drained = self.exhausted || self.finishing;
        if drained && self.active_count() == 0 {
            info!(target: POOL_TARGET, "pool stopped");
            self.state = PoolState::Stopped;
            self.stopped = true;
        }
        Ok(self.state)
    }

    /// Ticks at the poll interval until the pool stops.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by [`ProcessPool::tick`].
    pub fn wait(&mut self) -> Result<(), PoolError> {
        while self.tick()? != PoolState::Stopped {
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    /// Starts the pool and waits until it stops.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ProcessPool::start`] and
    /// [`ProcessPool::wait`].
    pub fn run(&mut self) -> Result<(), PoolError> {
        self.start()?;
        self.wait()
    }

    /// Stops pulling new work. Running processes are left to finish.
    ///
    /// Takes effect whatever the state: a pool finished before
    /// [`ProcessPool::start`] never pulls from its work source.
    pub fn finish(&mut self) {
        if !self.finishing {
            info!(target: POOL_TARGET, active = self.active_count(), "pool finishing");
        }
        self.finishing = true;
        if self.state == PoolState::Running {
            self.state = PoolState::Finishing;
        }
    }

    /// Finishes the pool and asks every running process to stop.
    ///
    /// Does not wait for the processes to exit; keep ticking until the pool
    /// reports [`PoolState::Stopped`]. Failures to signal a process are
    /// logged and skipped.
    pub fn stop(&mut self, timeout: Duration, signal: Option<Signal>) {
        self.finish();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(handle) = slot.handle_mut() else {
                continue;
            };
            if !handle.is_running() {
                continue;
            }
            if let Err(error) = handle.stop(timeout, signal) {
                warn!(
                    target: POOL_TARGET,
                    slot = index,
                    label = handle.label(),
                    error = %error,
                    "failed to stop process"
                );
            }
        }
    }

    /// Stops every running process with the configured grace period and
    /// signal.
    pub fn stop_default(&mut self) {
        self.stop(self.stop_timeout, Some(self.stop_signal));
    }

    /// Polls occupied slots and resolves terminated ones.
    fn reap_slots(&mut self) -> Result<(), PoolError> {
        let accepting = self.state == PoolState::Running;
        let (stop_timeout, stop_signal) = (self.stop_timeout, self.stop_signal);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(handle) = slot.handle_mut() else {
                continue;
            };
            handle
                .pump()
                .map_err(|source| PoolError::Process { slot: index, source })?;
            if !handle.is_terminated() {
                continue;
            }
            debug!(target: POOL_TARGET, slot = index, label = handle.label(), "process terminated");
            let replacement = self.finished_hook.as_mut().and_then(|hook| hook(handle));
            slot.mark(SlotState::Terminated);

            let Some(mut replacement) = replacement else {
                slot.clear();
                continue;
            };
            if !accepting {
                warn!(
                    target: POOL_TARGET,
                    slot = index,
                    label = replacement.label(),
                    "discarding restart requested while finishing"
                );
                if let Err(error) = replacement.stop(stop_timeout, Some(stop_signal)) {
                    warn!(target: POOL_TARGET, slot = index, error = %error, "failed to stop discarded restart");
                }
                slot.clear();
                continue;
            }
            if !replacement.is_running() {
                slot.clear();
                return Err(ConfigurationError::ReplacementNotRunning {
                    slot: index,
                    label: replacement.label().to_owned(),
                }
                .into());
            }
            debug!(target: POOL_TARGET, slot = index, label = replacement.label(), "process restarted");
            slot.occupy(replacement);
        }
        Ok(())
    }

    /// Pulls and starts handles until every slot up to the limit is busy or
    /// the source runs dry.
    fn fill_slots(&mut self) -> Result<(), PoolError> {
        while !self.exhausted && !self.finishing && self.active_count() < self.concurrency {
            let Some(mut handle) = self.source.pull() else {
                debug!(target: POOL_TARGET, "work source exhausted");
                self.exhausted = true;
                break;
            };
            if handle.is_running() || handle.is_terminated() {
                return Err(ConfigurationError::StartedHandle {
                    label: handle.label().to_owned(),
                }
                .into());
            }

            let index = self.free_slot();
            let Some(slot) = self.slots.get_mut(index) else {
                continue;
            };
            slot.mark(SlotState::Starting);
            if let Err(source) = handle.start() {
                slot.clear();
                return Err(PoolError::Process { slot: index, source });
            }
            debug!(target: POOL_TARGET, slot = index, label = handle.label(), "process started");
            if let Some(hook) = self.started_hook.as_mut() {
                hook(&mut handle);
            }
            slot.occupy(handle);
        }
        Ok(())
    }

    /// Returns the lowest unoccupied slot index, growing the table if needed.
    ///
    /// Callers only ask while fewer than `concurrency` slots are occupied, so
    /// the index is always below the limit.
    fn free_slot(&mut self) -> usize {
        if let Some(index) = self.slots.iter().position(|slot| !slot.is_occupied()) {
            return index;
        }
        self.slots.push(Slot::default());
        self.slots.len() - 1
    }
}
