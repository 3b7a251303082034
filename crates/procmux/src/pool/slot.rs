//! Slot bookkeeping for the pool.

use strum::Display;

/// Lifecycle of one pool slot.
///
/// A slot cycles `Empty -> Starting -> Running -> Terminated`, then back to
/// `Empty` or directly to `Running` when the finish hook supplies a
/// replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SlotState {
    /// No process is assigned.
    Empty,
    /// A process was pulled and is being started.
    Starting,
    /// The process is alive or still draining output.
    Running,
    /// The process finished and awaits its finish hook.
    Terminated,
}

/// A slot and the handle it holds.
#[derive(Debug)]
pub(super) struct Slot<H> {
    state: SlotState,
    handle: Option<H>,
}

impl<H> Default for Slot<H> {
    fn default() -> Self {
        Self {
            state: SlotState::Empty,
            handle: None,
        }
    }
}

impl<H> Slot<H> {
    pub(super) const fn state(&self) -> SlotState {
        self.state
    }

    pub(super) const fn is_occupied(&self) -> bool {
        self.handle.is_some()
    }

    pub(super) const fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub(super) const fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    pub(super) fn occupy(&mut self, handle: H) {
        self.handle = Some(handle);
        self.state = SlotState::Running;
    }

    pub(super) const fn mark(&mut self, state: SlotState) {
        self.state = state;
    }

    pub(super) const fn clear(&mut self) -> Option<H> {
        self.state = SlotState::Empty;
        self.handle.take()
    }
}
