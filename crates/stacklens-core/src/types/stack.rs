//! Execution stack handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::provider::FrameReceiver;

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle for one execution stack (thread, fiber, coroutine).
///
/// Stacks are compared by this id rather than by pointer identity, so maps
/// keyed by stack stay valid when a backend hands out fresh `Arc`s for the
/// same thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId
{
    /// Allocate a process-unique id.
    #[must_use]
    pub fn next() -> Self
    {
        Self(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, useful for logging.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

impl From<u64> for StackId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for StackId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}

/// One thread of the debuggee as seen from the frames view.
///
/// `compute_frames` must not block: implementations hand the request to
/// their own worker and report back through the receiver, from any thread,
/// in one or more batches terminated by a `last` batch or an error.
pub trait ExecutionStack: Send + Sync
{
    /// Stable identity of this stack.
    fn id(&self) -> StackId;

    /// Name shown in the thread list. May be empty.
    fn display_name(&self) -> &str;

    /// Start producing frames beginning at `first_index`.
    fn compute_frames(&self, first_index: usize, receiver: Arc<dyn FrameReceiver>);
}

/// Shared handle to an execution stack.
pub type StackRef = Arc<dyn ExecutionStack>;

impl fmt::Debug for dyn ExecutionStack
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ExecutionStack")
            .field("id", &self.id())
            .field("name", &self.display_name())
            .finish()
    }
}
