//! # Frames View
//!
//! Coordinates the stack registry, one frame loader per stack and the
//! thread filter for a single debugging session.
//!
//! ## Threading
//!
//! `FramesView` lives on one coordination thread. Backend results come back
//! on arbitrary threads, get queued, and are applied when the owner calls
//! [`FramesView::process_pending`]. Nothing here blocks.
//!
//! ## Lifecycle
//!
//! ```text
//! session event ──> on_session_event ──> (queued reset) ──> update_frames
//!                                                             │
//!                      provider batches ──> process_pending ──┘ select_current_frame
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{ViewError, ViewResult};
use crate::events::SessionEvent;
use crate::filter::ThreadFilter;
use crate::loader::{FrameLoader, LoaderState, SelectTarget};
use crate::model::{FrameEntry, FrameListModel, ThreadListModel};
use crate::provider::{FrameEvent, Session};
use crate::queue::{LaterInvocator, ResetRequest, Task, Waker};
use crate::registry::StackRegistry;
use crate::types::{FrameRef, StackId, StackRef};

/// Frames and threads view controller.
pub struct FramesView
{
    session: Arc<dyn Session>,
    invocator: LaterInvocator,
    registry: StackRegistry,
    filter: ThreadFilter,
    loaders: HashMap<StackId, FrameLoader>,
    frames: FrameListModel,
    selected_stack: Option<StackRef>,
    selected_frame_index: usize,
    saved_scroll: Option<usize>,
    listeners_enabled: bool,
    refresh: bool,
    clear_requested: bool,
    disposed: bool,
    reported: Vec<ViewError>,
}

impl FramesView
{
    /// Create a view attached to `session`.
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self
    {
        let invocator = LaterInvocator::new();
        let filter = ThreadFilter::new(invocator.sender().clone());
        Self {
            session,
            invocator,
            registry: StackRegistry::default(),
            filter,
            loaders: HashMap::new(),
            frames: FrameListModel::default(),
            selected_stack: None,
            selected_frame_index: 0,
            saved_scroll: None,
            listeners_enabled: false,
            refresh: false,
            clear_requested: false,
            disposed: false,
            reported: Vec::new(),
        }
    }

    /// Install a callback run whenever background work queued a task.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static)
    {
        let waker: Waker = Arc::new(waker);
        self.invocator.set_waker(Some(waker));
    }

    /// Frames of the selected stack.
    #[must_use]
    pub const fn frames(&self) -> &FrameListModel
    {
        &self.frames
    }

    /// Visible thread list and filter field state.
    #[must_use]
    pub const fn threads(&self) -> &ThreadListModel
    {
        self.registry.threads()
    }

    /// All known stacks and remembered selections.
    #[must_use]
    pub const fn registry(&self) -> &StackRegistry
    {
        &self.registry
    }

    /// Digest cache and matching rule.
    #[must_use]
    pub const fn filter(&self) -> &ThreadFilter
    {
        &self.filter
    }

    /// Stack whose frames are displayed.
    #[must_use]
    pub const fn selected_stack(&self) -> Option<&StackRef>
    {
        self.selected_stack.as_ref()
    }

    /// Frame index last selected in the displayed stack.
    #[must_use]
    pub const fn selected_frame_index(&self) -> usize
    {
        self.selected_frame_index
    }

    /// `false` while the first batch of the displayed stack is pending.
    #[must_use]
    pub const fn is_interactive(&self) -> bool
    {
        self.listeners_enabled
    }

    /// State of the loader for `stack`, if one exists.
    #[must_use]
    pub fn loader_state(&self, stack: StackId) -> Option<LoaderState>
    {
        self.loaders.get(&stack).map(FrameLoader::state)
    }

    /// Loader for `stack`, if one exists.
    #[must_use]
    pub fn loader(&self, stack: StackId) -> Option<&FrameLoader>
    {
        self.loaders.get(&stack)
    }

    /// Provider and consistency errors seen since the view was created.
    #[must_use]
    pub fn reported_errors(&self) -> &[ViewError]
    {
        &self.reported
    }

    /// `true` after [`FramesView::dispose`].
    #[must_use]
    pub const fn is_disposed(&self) -> bool
    {
        self.disposed
    }

    /// Entry point for session notifications.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Disposed`] after [`FramesView::dispose`].
    pub fn on_session_event(&mut self, event: SessionEvent) -> ViewResult<()>
    {
        if self.disposed {
            return Err(ViewError::Disposed);
        }

        self.refresh = event == SessionEvent::SettingsChanged;
        if event == SessionEvent::BeforeResume {
            return Ok(());
        }

        let active_stack = self.session.current_execution_stack();
        let active_frame = self.session.current_stack_frame();
        let context = self.session.suspend_context();

        let selected_id = self.selected_stack.as_ref().map(|stack| stack.id());
        let same_stack = selected_id == active_stack.as_ref().map(|stack| stack.id());
        if event == SessionEvent::FrameChanged && same_stack {
            if let Some(frame) = active_frame {
                self.show_session_frame(&frame);
            }
            return Ok(());
        }

        if event == SessionEvent::Paused {
            // Drop stale rows right away instead of waiting for the queued reset.
            self.listeners_enabled = false;
            self.dispose_loaders();
            self.clear_requested = false;
            self.clear();
            // A later reset in the same drain may replace the queued one.
            self.selected_stack = None;
            self.selected_frame_index = 0;
            self.saved_scroll = None;
            self.frames.set_scroll_offset(0);
        }

        debug!(?event, "queueing view reset");
        self.invocator.offer(Task::Reset(ResetRequest { event, active_stack, active_frame, context }));
        Ok(())
    }

    /// Apply everything background work queued so far. Returns the number of tasks run.
    pub fn process_pending(&mut self) -> usize
    {
        let tasks = self.invocator.drain();
        if self.disposed {
            return 0;
        }

        let count = tasks.len();
        for task in tasks {
            match task {
                Task::Reset(request) => self.handle_reset(request),
                Task::Frames { stack, generation, event } => self.handle_frames(stack, generation, event),
                Task::Stacks { discovery, event } => self.registry.on_stacks(discovery, event, &self.filter),
                Task::DigestReady(stack) => self.registry.reveal_if_matching(stack, &self.filter),
                Task::FilterActivity => {
                    let busy = self.filter.computations_in_flight() > 0;
                    self.registry.threads_mut().set_busy(busy);
                }
            }
        }

        if self.clear_requested {
            self.clear_requested = false;
            self.clear();
        }
        count
    }

    /// User picked `stack` in the thread list.
    ///
    /// Returns `false` if the view ignored the request because it is
    /// loading or `stack` is already displayed.
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownStack`] if `stack` is not registered, [`ViewError::Disposed`] after dispose.
    pub fn select_stack(&mut self, stack: StackId) -> ViewResult<bool>
    {
        if self.disposed {
            return Err(ViewError::Disposed);
        }
        let Some(stack) = self.registry.stack(stack).cloned() else {
            return Err(ViewError::UnknownStack(stack));
        };
        if !self.listeners_enabled {
            debug!(stack = %stack.id(), "ignoring stack selection while loading");
            return Ok(false);
        }
        if self.selected_stack.as_ref().is_some_and(|selected| selected.id() == stack.id()) {
            return Ok(false);
        }

        self.refresh = false;
        self.registry.threads_mut().set_selected(Some(stack.id()));
        self.update_frames(Some(stack), None);
        Ok(true)
    }

    /// User picked row `index` of the frame list.
    ///
    /// The selection is always pushed to the session, even if the row was
    /// already selected. Returns `false` while the view is loading.
    ///
    /// # Errors
    ///
    /// [`ViewError::IndexOutOfRange`] or [`ViewError::NotAFrame`] for invalid rows,
    /// [`ViewError::Disposed`] after dispose.
    pub fn select_frame(&mut self, index: usize) -> ViewResult<bool>
    {
        if self.disposed {
            return Err(ViewError::Disposed);
        }
        let Some(entry) = self.frames.get(index) else {
            return Err(ViewError::IndexOutOfRange { index, len: self.frames.len() });
        };
        if entry.as_frame().is_none() {
            return Err(ViewError::NotAFrame(index));
        }
        if !self.listeners_enabled {
            return Ok(false);
        }

        self.frames.select(Some(index));
        self.process_frame_selection(true);
        Ok(true)
    }

    /// Replace the thread filter text and recompute the visible threads.
    pub fn set_filter_text(&mut self, text: impl Into<String>)
    {
        self.registry.apply_filter(text.into(), &self.filter);
    }

    /// Remember where the frame list is scrolled to.
    pub fn set_scroll_offset(&mut self, offset: usize)
    {
        self.frames.set_scroll_offset(offset);
    }

    /// The thread picker opened: enumerate every stack of the pause.
    ///
    /// Returns `true` if a discovery was started.
    pub fn open_thread_picker(&mut self) -> bool
    {
        if self.disposed {
            return false;
        }
        let Some(context) = self.session.suspend_context() else {
            return false;
        };
        self.registry.start_discovery(&context, self.invocator.sender())
    }

    /// The thread picker closed: abandon a running discovery.
    pub fn close_thread_picker(&mut self)
    {
        self.registry.cancel_discovery();
    }

    /// Stop all loaders and discovery; the view ignores everything afterwards.
    pub fn dispose(&mut self)
    {
        if self.disposed {
            return;
        }
        info!("disposing frames view");
        self.dispose_loaders();
        self.registry.cancel_discovery();
        self.invocator.set_waker(None);
        self.disposed = true;
    }

    fn handle_reset(&mut self, request: ResetRequest)
    {
        let ResetRequest { event, active_stack, active_frame, context } = request;
        debug!(?event, "resetting view");

        if event == SessionEvent::SettingsChanged {
            self.saved_scroll = Some(self.frames.scroll_offset());
        } else {
            self.selected_frame_index = 0;
            self.selected_stack = None;
            self.saved_scroll = None;
        }

        self.listeners_enabled = false;
        self.dispose_loaders();

        let Some(context) = context else {
            self.clear_requested = true;
            return;
        };

        if event == SessionEvent::Paused {
            self.clear_requested = false;
            self.clear();
        }

        let active = self.selected_stack.clone().or(active_stack);
        if let Some(stack) = &active {
            self.registry.add_execution_stacks(std::slice::from_ref(stack), &self.filter);
        }

        let stacks = context.execution_stacks();
        self.registry.add_execution_stacks(&stacks, &self.filter);

        let threads = self.registry.threads_mut();
        threads.set_selected(active.as_ref().map(|stack| stack.id()));
        threads.set_chooser_visible(!(stacks.len() == 1 && stacks[0].display_name().is_empty()));

        let frame_to_select = if event == SessionEvent::FrameChanged { active_frame } else { None };
        self.update_frames(active, frame_to_select);
    }

    fn update_frames(&mut self, stack: Option<StackRef>, frame_to_select: Option<FrameRef>)
    {
        if let Some(previous) = &self.selected_stack {
            if let Some(loader) = self.loaders.get_mut(&previous.id()) {
                loader.stop();
            }
        }

        self.selected_stack = stack.clone();
        let Some(stack) = stack else {
            return;
        };
        let id = stack.id();

        self.selected_frame_index = self.registry.remembered_index(id);
        let target = frame_to_select.map_or(SelectTarget::Index(self.selected_frame_index), SelectTarget::Frame);

        let tasks = self.invocator.sender().clone();
        let loader = self.loaders.entry(id).or_insert_with(|| FrameLoader::new(stack, tasks));
        loader.set_to_select(target);
        loader.init_model(&mut self.frames);

        self.listeners_enabled = false;
        let selected = self.select_current_frame(id);
        let started = self.loaders.get_mut(&id).is_some_and(FrameLoader::start);
        self.listeners_enabled = !started || selected;
    }

    fn handle_frames(&mut self, stack: StackId, generation: u64, event: FrameEvent)
    {
        let displayed = self.is_displayed(stack);
        let Some(loader) = self.loaders.get_mut(&stack) else {
            return;
        };
        if !loader.accepts(generation) {
            debug!(%stack, generation, "ignoring obsolete frames");
            return;
        }

        match event {
            FrameEvent::Batch { frames, to_select, last } => {
                loader.append(&frames, last);
                if let Some(frame) = to_select {
                    loader.set_to_select(SelectTarget::Frame(frame));
                }
                if displayed {
                    let entries = frames.into_iter().map(FrameEntry::Frame).collect();
                    self.frames.splice_batch(entries, last);
                    self.select_current_frame(stack);
                }
                if last {
                    if let Some(offset) = self.saved_scroll {
                        self.frames.set_scroll_offset(offset);
                    }
                    self.listeners_enabled = true;
                }
            }
            FrameEvent::Error(message) => {
                if loader.record_error(&message) {
                    if displayed {
                        self.frames.splice_batch(vec![FrameEntry::Error(message.clone())], true);
                    }
                    self.listeners_enabled = true;
                    warn!(%stack, %message, "frame loading failed");
                    self.reported.push(ViewError::Provider { stack, message });
                }
            }
        }
    }

    /// Try to satisfy the pending selection target of `stack` in the visible list.
    fn select_current_frame(&mut self, stack: StackId) -> bool
    {
        let Some(loader) = self.loaders.get(&stack) else {
            return false;
        };
        let all_loaded = loader.all_loaded();

        match loader.to_select().clone() {
            SelectTarget::Frame(target) => {
                let already = self.frames.selected_frame().is_some_and(|frame| frame.same_frame(&*target));
                if !already {
                    if let Some(position) = self.frames.position_of(&*target) {
                        self.frames.select(Some(position));
                        self.process_frame_selection(false);
                        self.listeners_enabled = true;
                        return true;
                    }
                }
                if all_loaded && self.frames.selected_frame().is_none() {
                    let problem = ViewError::FrameNotFound { stack, frame: target.to_string() };
                    error!("{problem}");
                    self.reported.push(problem);
                }
            }
            SelectTarget::Index(index) => {
                let available = self.frames.get(index).is_some_and(|entry| !entry.is_placeholder());
                if self.frames.selected_index() != Some(index) && available {
                    self.frames.select(Some(index));
                    self.process_frame_selection(false);
                    self.listeners_enabled = true;
                    return true;
                }
            }
            SelectTarget::None => {}
        }
        false
    }

    /// Record the list selection and push it to the session when needed.
    fn process_frame_selection(&mut self, force: bool)
    {
        let Some(stack) = self.selected_stack.clone() else {
            return;
        };
        let Some(index) = self.frames.selected_index() else {
            return;
        };

        self.selected_frame_index = index;
        self.registry.remember(stack.id(), index);
        if let Some(loader) = self.loaders.get_mut(&stack.id()) {
            loader.set_to_select(SelectTarget::None);
        }

        let Some(frame) = self.frames.get(index).and_then(FrameEntry::as_frame).cloned() else {
            return;
        };
        let differs = self
            .session
            .current_stack_frame()
            .map_or(true, |current| !current.same_frame(&*frame));
        if force || (!self.refresh && differs) {
            debug!(stack = %stack.id(), index, "pushing frame selection to session");
            self.session.set_current_stack_frame(&stack, &frame, index == 0);
        }
    }

    /// Fast path for `FrameChanged` on the displayed stack.
    fn show_session_frame(&mut self, frame: &FrameRef)
    {
        let Some(position) = self.frames.position_of(&**frame) else {
            return;
        };
        self.frames.select(Some(position));
        self.selected_frame_index = position;
        if let Some(stack) = &self.selected_stack {
            self.registry.remember(stack.id(), position);
        }
    }

    fn is_displayed(&self, stack: StackId) -> bool
    {
        self.selected_stack.as_ref().is_some_and(|selected| selected.id() == stack)
    }

    fn dispose_loaders(&mut self)
    {
        for loader in self.loaders.values_mut() {
            loader.dispose();
        }
        self.loaders.clear();
    }

    fn clear(&mut self)
    {
        self.registry.clear();
        self.frames.clear();
        self.filter.invalidate();
    }
}

impl Drop for FramesView
{
    fn drop(&mut self)
    {
        self.dispose();
    }
}
