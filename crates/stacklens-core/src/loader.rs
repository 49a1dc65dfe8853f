//! # Frame Loader
//!
//! Per-stack accumulator for frames streamed in by the backend.
//!
//! A loader owns everything the view knows about one stack's frames: what
//! was loaded so far, the cursor for the next request, the first error and
//! the pending selection target. The loader itself never touches the
//! visible list except through [`FrameLoader::init_model`]; batch splicing
//! and selection happen in the view, which knows whether this stack is the
//! displayed one.
//!
//! ## Cancellation
//!
//! Every `start()` bumps a generation counter and publishes it in a shared
//! atomic. Receivers remember the generation they were created for and
//! report themselves obsolete once the published value moves on, which is
//! what `stop()` and `dispose()` do. The view re-checks the generation when
//! the queued result is finally processed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::model::{FrameEntry, FrameListModel};
use crate::provider::{FrameEvent, FrameReceiver};
use crate::queue::{Task, TaskSender};
use crate::types::{FrameRef, StackId, StackRef};

/// Lifecycle of a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState
{
    /// Created or stopped; results are ignored.
    Idle,
    /// A request is outstanding.
    Running,
    /// The final batch arrived.
    Done,
    /// The backend reported an error. Terminal.
    Errored,
    /// Discarded by a session reset. Terminal.
    Disposed,
}

/// What to select once it shows up in the list.
#[derive(Debug, Clone, Default)]
pub enum SelectTarget
{
    /// Nothing pending.
    #[default]
    None,
    /// A specific frame, located via `StackFrame::same_frame`.
    Frame(FrameRef),
    /// A row index.
    Index(usize),
}

/// Frames of one execution stack.
pub struct FrameLoader
{
    stack: Option<StackRef>,
    stack_id: StackId,
    frames: Vec<FrameRef>,
    error: Option<String>,
    next_index: usize,
    all_loaded: bool,
    state: LoaderState,
    to_select: SelectTarget,
    generation: u64,
    active_generation: Arc<AtomicU64>,
    tasks: TaskSender,
}

impl FrameLoader
{
    pub(crate) fn new(stack: StackRef, tasks: TaskSender) -> Self
    {
        Self {
            stack_id: stack.id(),
            stack: Some(stack),
            frames: Vec::new(),
            error: None,
            next_index: 0,
            all_loaded: false,
            state: LoaderState::Idle,
            to_select: SelectTarget::None,
            generation: 0,
            active_generation: Arc::new(AtomicU64::new(0)),
            tasks,
        }
    }

    /// Stack this loader belongs to.
    #[must_use]
    pub const fn stack_id(&self) -> StackId
    {
        self.stack_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LoaderState
    {
        self.state
    }

    /// Frames loaded so far, in stack order.
    #[must_use]
    pub fn frames(&self) -> &[FrameRef]
    {
        &self.frames
    }

    /// First error reported by the backend.
    #[must_use]
    pub fn error(&self) -> Option<&str>
    {
        self.error.as_deref()
    }

    /// Index the next request starts from.
    #[must_use]
    pub const fn next_index(&self) -> usize
    {
        self.next_index
    }

    /// `true` once the final batch arrived.
    #[must_use]
    pub const fn all_loaded(&self) -> bool
    {
        self.all_loaded
    }

    /// Pending selection target.
    #[must_use]
    pub const fn to_select(&self) -> &SelectTarget
    {
        &self.to_select
    }

    /// Generation of the most recent request.
    #[must_use]
    pub const fn generation(&self) -> u64
    {
        self.generation
    }

    pub(crate) fn set_to_select(&mut self, target: SelectTarget)
    {
        self.to_select = target;
    }

    /// Request frames from the cursor on.
    ///
    /// Returns `false` without contacting the backend if the loader was
    /// disposed, already failed, or has everything.
    pub(crate) fn start(&mut self) -> bool
    {
        let Some(stack) = self.stack.clone() else {
            return false;
        };
        if self.error.is_some() || self.all_loaded {
            return false;
        }

        self.generation += 1;
        self.active_generation.store(self.generation, Ordering::SeqCst);
        self.state = LoaderState::Running;

        debug!(stack = %self.stack_id, generation = self.generation, from = self.next_index, "requesting frames");
        let receiver = Arc::new(LoaderReceiver {
            stack: self.stack_id,
            generation: self.generation,
            active_generation: self.active_generation.clone(),
            tasks: self.tasks.clone(),
        });
        stack.compute_frames(self.next_index, receiver);
        true
    }

    /// Stop honouring results of the outstanding request.
    pub(crate) fn stop(&mut self)
    {
        self.active_generation.store(0, Ordering::SeqCst);
        if self.state == LoaderState::Running {
            self.state = LoaderState::Idle;
        }
    }

    pub(crate) fn dispose(&mut self)
    {
        self.stop();
        self.stack = None;
        self.state = LoaderState::Disposed;
    }

    /// Whether a result tagged with `generation` should be applied.
    pub(crate) fn accepts(&self, generation: u64) -> bool
    {
        self.state == LoaderState::Running && generation == self.generation
    }

    pub(crate) fn append(&mut self, frames: &[FrameRef], last: bool)
    {
        self.frames.extend(frames.iter().cloned());
        self.next_index += frames.len();
        self.all_loaded = last;
        if last {
            self.state = LoaderState::Done;
            self.active_generation.store(0, Ordering::SeqCst);
        }
    }

    /// Record `message` unless an error is already known. Returns whether it was recorded.
    pub(crate) fn record_error(&mut self, message: &str) -> bool
    {
        if self.error.is_some() {
            return false;
        }
        self.error = Some(message.to_string());
        self.state = LoaderState::Errored;
        self.active_generation.store(0, Ordering::SeqCst);
        true
    }

    /// Rebuild `list` from what this loader already holds.
    pub(crate) fn init_model(&self, list: &mut FrameListModel)
    {
        list.clear();
        for frame in &self.frames {
            list.push(FrameEntry::Frame(frame.clone()));
        }
        if let Some(message) = &self.error {
            list.push(FrameEntry::Error(message.clone()));
        } else if !self.all_loaded {
            list.push(FrameEntry::Loading);
        }
    }
}

struct LoaderReceiver
{
    stack: StackId,
    generation: u64,
    active_generation: Arc<AtomicU64>,
    tasks: TaskSender,
}

impl FrameReceiver for LoaderReceiver
{
    fn deliver(&self, event: FrameEvent)
    {
        if self.is_obsolete() {
            return;
        }
        self.tasks.send(Task::Frames {
            stack: self.stack,
            generation: self.generation,
            event,
        });
    }

    fn is_obsolete(&self) -> bool
    {
        self.active_generation.load(Ordering::SeqCst) != self.generation
    }
}
