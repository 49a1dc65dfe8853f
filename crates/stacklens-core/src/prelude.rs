//! Common module for library exports

pub use crate::error::{ViewError, ViewResult};
pub use crate::events::{SessionEvent, SessionEventReceiver};
pub use crate::loader::{LoaderState, SelectTarget};
pub use crate::model::{FrameEntry, FrameListModel, ThreadEntry, ThreadListModel};
pub use crate::provider::{Debuggee, FrameEvent, FrameReceiver, Session, StackEvent, StackReceiver, SuspendContext};
pub use crate::types::{ExecutionStack, FrameRef, StackFrame, StackId, StackRef};
pub use crate::view::FramesView;
