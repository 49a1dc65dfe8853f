//! # Stack Registry
//!
//! Known execution stacks of the current pause, their remembered frame
//! selection, and the thread list shown to the user.
//!
//! Stacks enter the registry from the suspend context when the session
//! pauses, and optionally from a paginated discovery started when the user
//! opens the thread picker. Either way they are deduplicated by
//! [`StackId`] and get a remembered selection of 0.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::filter::ThreadFilter;
use crate::model::ThreadListModel;
use crate::provider::{StackEvent, StackReceiver, SuspendContext};
use crate::queue::{Task, TaskSender};
use crate::types::{StackId, StackRef};

struct Discovery
{
    id: u64,
    obsolete: Arc<AtomicBool>,
}

/// Execution stacks known to the view.
#[derive(Default)]
pub struct StackRegistry
{
    known: Vec<StackRef>,
    selection: HashMap<StackId, usize>,
    threads: ThreadListModel,
    threads_calculated: bool,
    discovery: Option<Discovery>,
    next_discovery: u64,
}

impl StackRegistry
{
    /// Every known stack in discovery order, ignoring the filter.
    #[must_use]
    pub fn known_stacks(&self) -> &[StackRef]
    {
        &self.known
    }

    /// Known stack with this id.
    #[must_use]
    pub fn stack(&self, id: StackId) -> Option<&StackRef>
    {
        self.known.iter().find(|stack| stack.id() == id)
    }

    /// Visible thread list.
    #[must_use]
    pub const fn threads(&self) -> &ThreadListModel
    {
        &self.threads
    }

    pub(crate) fn threads_mut(&mut self) -> &mut ThreadListModel
    {
        &mut self.threads
    }

    /// Remembered frame index of `stack`, 0 if none.
    #[must_use]
    pub fn remembered_index(&self, stack: StackId) -> usize
    {
        self.selection.get(&stack).copied().unwrap_or(0)
    }

    /// `true` once a discovery delivered its final page during this pause.
    #[must_use]
    pub const fn threads_calculated(&self) -> bool
    {
        self.threads_calculated
    }

    /// `true` while a discovery is running.
    #[must_use]
    pub const fn is_discovering(&self) -> bool
    {
        self.discovery.is_some()
    }

    pub(crate) fn remember(&mut self, stack: StackId, index: usize)
    {
        self.selection.insert(stack, index);
    }

    /// Register unseen stacks and show the ones passing the filter.
    pub(crate) fn add_execution_stacks(&mut self, stacks: &[StackRef], filter: &ThreadFilter)
    {
        for stack in stacks {
            let id = stack.id();
            if self.selection.contains_key(&id) {
                continue;
            }
            self.selection.insert(id, 0);
            self.known.push(stack.clone());
            if filter.matches(stack, self.threads.filter_text()) {
                self.threads.push_stack(stack.clone());
            }
        }
    }

    /// Recompute the visible threads for `text`.
    pub(crate) fn apply_filter(&mut self, text: String, filter: &ThreadFilter)
    {
        let visible = self.known.iter().filter(|stack| filter.matches(stack, &text)).cloned().collect();
        self.threads.set_filter_text(text);
        self.threads.replace_stacks(visible);
    }

    /// Show `stack` if it passes the current filter and is not shown yet.
    pub(crate) fn reveal_if_matching(&mut self, stack: StackId, filter: &ThreadFilter)
    {
        let Some(stack) = self.stack(stack).cloned() else {
            return;
        };
        if !self.threads.contains(stack.id()) && filter.matches(&stack, self.threads.filter_text()) {
            self.threads.push_stack(stack);
        }
    }

    /// Start enumerating every stack of `context`. No-op if already done or running.
    pub(crate) fn start_discovery(&mut self, context: &Arc<dyn SuspendContext>, tasks: &TaskSender) -> bool
    {
        if self.threads_calculated || self.discovery.is_some() {
            return false;
        }

        self.next_discovery += 1;
        let id = self.next_discovery;
        let obsolete = Arc::new(AtomicBool::new(false));
        self.threads.insert_placeholder();
        self.discovery = Some(Discovery { id, obsolete: obsolete.clone() });

        debug!(discovery = id, "discovering execution stacks");
        context.compute_execution_stacks(Arc::new(ThreadsReceiver { id, obsolete, tasks: tasks.clone() }));
        true
    }

    /// Abandon a running discovery and drop its placeholder.
    pub(crate) fn cancel_discovery(&mut self)
    {
        if let Some(discovery) = self.discovery.take() {
            discovery.obsolete.store(true, Ordering::SeqCst);
            self.threads.remove_placeholder();
        }
    }

    pub(crate) fn on_stacks(&mut self, discovery: u64, event: StackEvent, filter: &ThreadFilter)
    {
        let current = self
            .discovery
            .as_ref()
            .is_some_and(|running| running.id == discovery && !running.obsolete.load(Ordering::SeqCst));
        if !current {
            debug!(discovery, "ignoring stacks of an obsolete discovery");
            return;
        }

        match event {
            StackEvent::Batch { stacks, last } => {
                if last {
                    self.threads.remove_placeholder();
                    self.threads_calculated = true;
                    self.discovery = None;
                }
                self.add_execution_stacks(&stacks, filter);
            }
            StackEvent::Error(message) => {
                warn!(discovery, %message, "execution stack discovery failed");
                self.threads.remove_placeholder();
                self.discovery = None;
            }
        }
    }

    pub(crate) fn clear(&mut self)
    {
        self.cancel_discovery();
        self.known.clear();
        self.selection.clear();
        self.threads.clear();
        self.threads_calculated = false;
    }
}

struct ThreadsReceiver
{
    id: u64,
    obsolete: Arc<AtomicBool>,
    tasks: TaskSender,
}

impl StackReceiver for ThreadsReceiver
{
    fn deliver(&self, event: StackEvent)
    {
        if self.is_obsolete() {
            return;
        }
        self.tasks.send(Task::Stacks { discovery: self.id, event });
    }

    fn is_obsolete(&self) -> bool
    {
        self.obsolete.load(Ordering::SeqCst)
    }
}
