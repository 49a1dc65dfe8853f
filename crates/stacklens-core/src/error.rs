//! # Error Types
//!
//! Errors raised or recorded by the frames view.
//!
//! We use `thiserror` to derive `Error` and the display messages.

use thiserror::Error;

use crate::types::StackId;

/// Main error type for frames view operations
///
/// ## Error Categories
///
/// 1. **Provider errors**: `Provider` (a backend failed to produce frames)
/// 2. **Consistency errors**: `FrameNotFound` (a frame's equality contract is broken)
/// 3. **Invalid actions**: `UnknownStack`, `NotAFrame`, `IndexOutOfRange`
/// 4. **Lifecycle errors**: `Disposed`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError
{
    /// The backend reported an error while computing frames.
    ///
    /// Shown as the last entry of the frame list. Loading stops for that
    /// stack until the next pause; the rest of the view is unaffected.
    #[error("Failed to load frames of stack {stack}: {message}")]
    Provider
    {
        /// Stack whose frames failed to load
        stack: StackId,
        /// Message reported by the backend
        message: String,
    },

    /// A frame the session asked for was not in the fully loaded list.
    ///
    /// This means the frame type does not implement `same_frame`
    /// consistently. Logged, never retried.
    #[error("Frame {frame} was not found in stack {stack}; StackFrame::same_frame must be implemented consistently")]
    FrameNotFound
    {
        /// Stack that was searched
        stack: StackId,
        /// Textual form of the missing frame
        frame: String,
    },

    /// The stack is not known to the view.
    #[error("Unknown execution stack {0}")]
    UnknownStack(StackId),

    /// The list entry at this index is a placeholder or an error row.
    #[error("Entry {0} is not a stack frame")]
    NotAFrame(usize),

    /// Index past the end of the frame list.
    #[error("Frame index {index} out of range (list has {len} entries)")]
    IndexOutOfRange
    {
        /// Requested index
        index: usize,
        /// Number of entries in the list
        len: usize,
    },

    /// The view was disposed.
    #[error("Frames view has been disposed")]
    Disposed,
}

/// Convenience type alias for `Result<T, ViewError>`
///
/// ```rust
/// use stacklens_core::error::ViewResult;
/// fn foo() -> ViewResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type ViewResult<T> = std::result::Result<T, ViewError>;
