//! Pull-based supply of work for the pool.

use crate::process::ProcessHandle;

/// Lazily yields unstarted process handles.
///
/// The pool pulls exactly one handle per free slot and never looks ahead.
/// Once `pull` returns `None` the source is treated as exhausted and is not
/// asked again.
///
/// Every [`Iterator`] over handles is a work source:
///
/// ```rust
/// use procmux::{ChildCommand, ChildProcess, ProcessPool};
///
/// let jobs = (0..3).map(|n| {
///     ChildProcess::new(ChildCommand::new("echo").arg(n.to_string()))
///         .with_label(format!("job-{n}"))
/// });
/// let pool = ProcessPool::new(jobs);
/// assert_eq!(pool.concurrency(), 1);
/// ```
pub trait WorkSource {
    /// Handle type produced by this source.
    type Handle: ProcessHandle;

    /// Returns the next unstarted handle, or `None` when no work remains.
    fn pull(&mut self) -> Option<Self::Handle>;
}

impl<I> WorkSource for I
where
    I: Iterator,
    I::Item: ProcessHandle,
{
    type Handle = I::Item;

    fn pull(&mut self) -> Option<Self::Handle> {
        self.next()
    }
}
