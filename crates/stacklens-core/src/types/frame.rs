//! Stack frame handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One activation record of an execution stack.
///
/// The textual form comes from `Display`. `same_frame` is the equality
/// contract used to find a frame the session asked for inside a freshly
/// loaded list; backends that create new frame objects per request must
/// override it, otherwise only the identical allocation matches.
pub trait StackFrame: fmt::Display + Send + Sync
{
    /// Upcast used by `same_frame` implementations to downcast `other`.
    fn as_any(&self) -> &dyn Any;

    /// Whether `other` denotes the same frame as `self`.
    fn same_frame(&self, other: &dyn StackFrame) -> bool
    {
        std::ptr::addr_eq(self as *const Self, other as *const dyn StackFrame)
    }
}

/// Shared handle to a stack frame.
pub type FrameRef = Arc<dyn StackFrame>;

impl fmt::Debug for dyn StackFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "StackFrame({self})")
    }
}
