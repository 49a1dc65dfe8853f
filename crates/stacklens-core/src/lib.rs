//! # stacklens-core
//!
//! Frames and threads view controller for a paused debugging session.
//!
//! This crate provides:
//! - A stack registry that tracks the threads of a suspend context
//! - One incremental frame loader per thread
//! - A thread filter backed by lazily computed stack-trace digests
//! - Per-thread selection memory within one pause
//! - A simulated debuggee for demos and tests
//!
//! ## Threading
//!
//! The backend answers frame and thread requests on whatever thread it likes.
//! Those answers are queued and applied by [`FramesView::process_pending`] on
//! the thread that owns the view, so the models are only ever touched from one
//! place.

pub mod error;
pub mod events;
pub mod filter;
pub mod loader;
pub mod model;
pub mod prelude;
pub mod provider;
mod queue;
pub mod registry;
pub mod sim;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use error::{ViewError, ViewResult};
pub use events::SessionEvent;
pub use queue::Waker;
pub use types::{ExecutionStack, FrameRef, StackFrame, StackId, StackRef};
pub use view::FramesView;
