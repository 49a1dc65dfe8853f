//! # Coordination Queue
//!
//! Everything that touches view state runs on one coordination thread.
//! Provider results arrive on arbitrary threads and are turned into [`Task`]s
//! pushed through a channel; the owner of the view drains the channel with
//! [`FramesView::process_pending`](crate::view::FramesView::process_pending).
//!
//! Draining merges the batch: a session reset supersedes every earlier reset
//! still waiting in the queue, and repeated filter activity notices collapse
//! into the last one.

use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::events::SessionEvent;
use crate::provider::{FrameEvent, StackEvent, SuspendContext};
use crate::types::{FrameRef, StackId, StackRef};

/// Callback invoked after a task was queued, so a front-end can schedule a drain.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Snapshot of the session taken when a session event arrived.
pub(crate) struct ResetRequest
{
    pub event: SessionEvent,
    pub active_stack: Option<StackRef>,
    pub active_frame: Option<FrameRef>,
    pub context: Option<Arc<dyn SuspendContext>>,
}

/// Unit of work for the coordination thread.
pub(crate) enum Task
{
    /// Rebuild the view after a session event.
    Reset(ResetRequest),
    /// Result of a frame loader request.
    Frames
    {
        stack: StackId,
        generation: u64,
        event: FrameEvent,
    },
    /// Result of a thread discovery page.
    Stacks
    {
        discovery: u64,
        event: StackEvent,
    },
    /// A stack-trace digest became available.
    DigestReady(StackId),
    /// The number of running digest computations left or reached zero.
    ///
    /// Carries no state: the count is read when the task runs, so notices
    /// overtaking each other between threads cannot leave a stale value.
    FilterActivity,
}

impl fmt::Debug for Task
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Reset(request) => write!(f, "Reset({:?})", request.event),
            Self::Frames { stack, generation, .. } => write!(f, "Frames({stack}, gen {generation})"),
            Self::Stacks { discovery, .. } => write!(f, "Stacks(discovery {discovery})"),
            Self::DigestReady(stack) => write!(f, "DigestReady({stack})"),
            Self::FilterActivity => f.write_str("FilterActivity"),
        }
    }
}

/// Cloneable handle used by receivers to post tasks.
#[derive(Clone)]
pub(crate) struct TaskSender
{
    sender: mpsc::Sender<Task>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl TaskSender
{
    pub(crate) fn send(&self, task: Task)
    {
        trace!(?task, "queueing task");
        if self.sender.send(task).is_err() {
            // View dropped; results have nowhere to go.
            return;
        }
        let waker = self.waker.lock().ok().and_then(|guard| guard.clone());
        if let Some(waker) = waker {
            waker();
        }
    }
}

/// Merging task queue owned by the view.
pub(crate) struct LaterInvocator
{
    sender: TaskSender,
    receiver: mpsc::Receiver<Task>,
}

impl LaterInvocator
{
    pub(crate) fn new() -> Self
    {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender: TaskSender { sender, waker: Arc::new(Mutex::new(None)) },
            receiver,
        }
    }

    pub(crate) fn sender(&self) -> &TaskSender
    {
        &self.sender
    }

    pub(crate) fn offer(&self, task: Task)
    {
        self.sender.send(task);
    }

    pub(crate) fn set_waker(&self, waker: Option<Waker>)
    {
        if let Ok(mut slot) = self.sender.waker.lock() {
            *slot = waker;
        }
    }

    /// Take everything queued so far, merged.
    pub(crate) fn drain(&self) -> Vec<Task>
    {
        merge(self.receiver.try_iter().collect())
    }
}

fn merge(tasks: Vec<Task>) -> Vec<Task>
{
    let last_reset = tasks.iter().rposition(|task| matches!(task, Task::Reset(_)));
    let last_activity = tasks.iter().rposition(|task| matches!(task, Task::FilterActivity));

    tasks
        .into_iter()
        .enumerate()
        .filter(|(index, task)| match task {
            Task::Reset(_) => Some(*index) == last_reset,
            Task::FilterActivity => Some(*index) == last_activity,
            _ => true,
        })
        .map(|(_, task)| task)
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn reset(event: SessionEvent) -> Task
    {
        Task::Reset(ResetRequest { event, active_stack: None, active_frame: None, context: None })
    }

    fn describe(tasks: &[Task]) -> Vec<String>
    {
        tasks.iter().map(|task| format!("{task:?}")).collect()
    }

    #[test]
    fn test_merge_keeps_last_reset_only()
    {
        let stack = StackId::from(7);
        let tasks = vec![
            reset(SessionEvent::Paused),
            Task::DigestReady(stack),
            reset(SessionEvent::Resumed),
        ];

        assert_eq!(describe(&merge(tasks)), vec!["DigestReady(#7)", "Reset(Resumed)"]);
    }

    #[test]
    fn test_merge_keeps_last_filter_activity()
    {
        let tasks = vec![
            Task::FilterActivity,
            Task::DigestReady(StackId::from(1)),
            Task::FilterActivity,
            Task::DigestReady(StackId::from(2)),
        ];
        assert_eq!(describe(&merge(tasks)), vec!["DigestReady(#1)", "FilterActivity", "DigestReady(#2)"]);
    }

    #[test]
    fn test_drain_preserves_frame_order()
    {
        let queue = LaterInvocator::new();
        for generation in 1..=3 {
            queue.offer(Task::Frames {
                stack: StackId::from(1),
                generation,
                event: FrameEvent::Error(String::new()),
            });
        }

        assert_eq!(
            describe(&queue.drain()),
            vec!["Frames(#1, gen 1)", "Frames(#1, gen 2)", "Frames(#1, gen 3)"]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_waker_runs_after_send()
    {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let queue = LaterInvocator::new();
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = woken.clone();
        queue.set_waker(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        queue.offer(Task::FilterActivity);
        queue.sender().send(Task::DigestReady(StackId::from(3)));

        assert_eq!(woken.load(Ordering::SeqCst), 2);
    }
}
