//! # Provider Interfaces
//!
//! Capabilities the frames view consumes from a debugging backend. Results
//! travel back as tagged events through receiver objects instead of
//! listener callbacks; the receivers themselves decide whether a result is
//! still wanted (`is_obsolete`).

use std::sync::Arc;

use crate::events::SessionEventReceiver;
use crate::types::{FrameRef, StackRef};

/// Result of one step of a frame request.
#[derive(Debug, Clone)]
pub enum FrameEvent
{
    /// Next batch of frames, in stack order.
    Batch
    {
        /// Frames of this batch.
        frames: Vec<FrameRef>,
        /// Frame the backend wants selected once it is visible.
        to_select: Option<FrameRef>,
        /// No further batches follow.
        last: bool,
    },
    /// The request failed; nothing follows.
    Error(String),
}

/// Destination for the results of [`ExecutionStack::compute_frames`](crate::types::ExecutionStack::compute_frames).
///
/// `deliver` may be called from any thread.
pub trait FrameReceiver: Send + Sync
{
    /// Hand over the next result.
    fn deliver(&self, event: FrameEvent);

    /// Backends should stop producing once this returns `true`.
    fn is_obsolete(&self) -> bool
    {
        false
    }
}

impl dyn FrameReceiver
{
    /// Deliver a batch without a selection hint.
    pub fn add_frames(&self, frames: Vec<FrameRef>, last: bool)
    {
        self.deliver(FrameEvent::Batch { frames, to_select: None, last });
    }

    /// Deliver an error.
    pub fn error(&self, message: impl Into<String>)
    {
        self.deliver(FrameEvent::Error(message.into()));
    }
}

/// Result of one step of a paginated thread discovery.
#[derive(Debug, Clone)]
pub enum StackEvent
{
    /// Next page of execution stacks.
    Batch
    {
        /// Stacks of this page.
        stacks: Vec<StackRef>,
        /// No further pages follow.
        last: bool,
    },
    /// Discovery failed; nothing follows.
    Error(String),
}

/// Destination for the results of [`SuspendContext::compute_execution_stacks`].
pub trait StackReceiver: Send + Sync
{
    /// Hand over the next result.
    fn deliver(&self, event: StackEvent);

    /// Backends should stop producing once this returns `true`.
    fn is_obsolete(&self) -> bool
    {
        false
    }
}

/// Snapshot of all execution stacks at a pause point.
pub trait SuspendContext: Send + Sync
{
    /// Stack that caused the pause, if known.
    fn active_execution_stack(&self) -> Option<StackRef>;

    /// Stacks known right away without further queries.
    fn execution_stacks(&self) -> Vec<StackRef>;

    /// Enumerate every stack, possibly in several pages.
    ///
    /// The default reports `execution_stacks` as a single final page.
    fn compute_execution_stacks(&self, receiver: Arc<dyn StackReceiver>)
    {
        receiver.deliver(StackEvent::Batch { stacks: self.execution_stacks(), last: true });
    }
}

/// The debugging session the view is attached to.
///
/// All methods are called from the coordination thread.
pub trait Session: Send + Sync
{
    /// Stack currently focused by the session.
    fn current_execution_stack(&self) -> Option<StackRef>;

    /// Frame currently focused by the session.
    fn current_stack_frame(&self) -> Option<FrameRef>;

    /// Present while the debuggee is paused.
    fn suspend_context(&self) -> Option<Arc<dyn SuspendContext>>;

    /// Make `frame` of `stack` the session's current frame.
    fn set_current_stack_frame(&self, stack: &StackRef, frame: &FrameRef, is_top_frame: bool);
}

/// A session a front-end can also drive.
pub trait Debuggee: Session
{
    /// Whether a suspend context is currently available.
    fn is_paused(&self) -> bool
    {
        self.suspend_context().is_some()
    }

    /// Suspend the debuggee.
    fn pause(&self);

    /// Resume the debuggee.
    fn resume(&self);

    /// Flip a display setting and announce it.
    fn toggle_settings(&self);

    /// End the session.
    fn stop(&self);

    /// Take the session event stream. Only the first call returns `Some`.
    fn take_event_receiver(&self) -> Option<SessionEventReceiver>;
}
