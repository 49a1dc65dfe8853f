//! # Handle Types
//!
//! Opaque handles for the execution stacks and stack frames reported by a
//! debugging backend. The view never looks inside them beyond the display
//! name, the textual form and the frame equality contract.

pub mod frame;
pub mod stack;

pub use frame::{FrameRef, StackFrame};
pub use stack::{ExecutionStack, StackId, StackRef};
