//! # Simulated Debuggee
//!
//! An in-process stand-in for a debugging backend. Every pause produces a
//! fresh set of synthetic threads; frame and thread requests are served from
//! worker threads after a configurable latency, in batches, exactly like a
//! remote backend would.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stacklens_core::provider::Debuggee;
//! use stacklens_core::sim::{SimConfig, SimDebuggee};
//! use stacklens_core::view::FramesView;
//!
//! let debuggee = Arc::new(SimDebuggee::new(SimConfig::default()));
//! let mut view = FramesView::new(debuggee.clone());
//! debuggee.pause();
//! view.on_session_event(stacklens_core::events::SessionEvent::Paused)?;
//! # Ok::<(), stacklens_core::error::ViewError>(())
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::events::{event_channel, SessionEvent, SessionEventReceiver, SessionEventSender};
use crate::provider::{Debuggee, FrameReceiver, Session, StackEvent, StackReceiver, SuspendContext};
use crate::types::{ExecutionStack, FrameRef, StackFrame, StackId, StackRef};

const FUNCTIONS: &[(&str, &str)] = &[
    ("std::rt::lang_start", "library/std/src/rt.rs"),
    ("tokio::runtime::park::block_on", "tokio/src/runtime/park.rs"),
    ("app::main", "src/main.rs"),
    ("app::server::accept_loop", "src/server.rs"),
    ("app::server::handle_connection", "src/server.rs"),
    ("app::http::parse_request", "src/http/parser.rs"),
    ("app::router::dispatch", "src/router.rs"),
    ("app::db::pool::acquire", "src/db/pool.rs"),
    ("app::db::query::execute", "src/db/query.rs"),
    ("app::cache::lookup", "src/cache.rs"),
    ("serde_json::de::from_slice", "serde_json/src/de.rs"),
    ("core::ops::function::FnOnce::call_once", "library/core/src/ops/function.rs"),
];

/// Knobs of the simulated debuggee.
#[derive(Debug, Clone)]
pub struct SimConfig
{
    /// Number of threads per pause (at least one).
    pub threads: usize,
    /// Frames per thread.
    pub depth: usize,
    /// Frames per delivered batch.
    pub batch_size: usize,
    /// Delay before each batch or discovery page.
    pub latency: Duration,
    /// Thread whose frame requests fail after the first batch.
    pub failing_thread: Option<String>,
    /// Threads per discovery page.
    pub discovery_page: usize,
}

impl Default for SimConfig
{
    fn default() -> Self
    {
        Self {
            threads: 6,
            depth: 24,
            batch_size: 8,
            latency: Duration::from_millis(40),
            failing_thread: None,
            discovery_page: 2,
        }
    }
}

/// Synthetic frame. Two frames are the same when they share stack and depth.
#[derive(Debug)]
pub struct SimFrame
{
    stack: StackId,
    depth: usize,
    function: &'static str,
    file: &'static str,
    line: u32,
    verbose: Arc<AtomicBool>,
}

impl SimFrame
{
    /// Position of this frame in its stack, 0 being the top.
    #[must_use]
    pub const fn depth(&self) -> usize
    {
        self.depth
    }
}

impl fmt::Display for SimFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.verbose.load(Ordering::Relaxed) {
            write!(f, "{} at {}:{} [#{}]", self.function, self.file, self.line, self.depth)
        } else {
            write!(f, "{}:{}", self.function, self.line)
        }
    }
}

impl StackFrame for SimFrame
{
    fn as_any(&self) -> &dyn Any
    {
        self
    }

    fn same_frame(&self, other: &dyn StackFrame) -> bool
    {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.stack == self.stack && other.depth == self.depth)
    }
}

struct SimThread
{
    id: StackId,
    name: String,
    seed: u64,
    depth: usize,
    batch_size: usize,
    latency: Duration,
    fails: bool,
    verbose: Arc<AtomicBool>,
}

impl SimThread
{
    fn frame(&self, depth: usize) -> FrameRef
    {
        let mixed = self.seed.wrapping_mul(31).wrapping_add(depth as u64 * 7);
        let (function, file) = FUNCTIONS[usize::try_from(mixed).unwrap_or(0) % FUNCTIONS.len()];
        let line = u32::try_from(10 + (mixed % 400)).unwrap_or(10);
        Arc::new(SimFrame {
            stack: self.id,
            depth,
            function,
            file,
            line,
            verbose: self.verbose.clone(),
        })
    }
}

impl ExecutionStack for SimThread
{
    fn id(&self) -> StackId
    {
        self.id
    }

    fn display_name(&self) -> &str
    {
        &self.name
    }

    fn compute_frames(&self, first_index: usize, receiver: Arc<dyn FrameReceiver>)
    {
        let frames: Vec<FrameRef> = (first_index..self.depth).map(|depth| self.frame(depth)).collect();
        let batch_size = self.batch_size.max(1);
        let latency = self.latency;
        let fails = self.fails;
        let name = self.name.clone();

        thread::spawn(move || {
            if frames.is_empty() {
                receiver.add_frames(Vec::new(), true);
                return;
            }
            let batches = frames.chunks(batch_size).count();
            for (index, batch) in frames.chunks(batch_size).enumerate() {
                thread::sleep(latency);
                if receiver.is_obsolete() {
                    debug!(thread = %name, "frame request abandoned");
                    return;
                }
                if fails && index == 1 {
                    receiver.error(format!("Unable to read frames of {name}: target memory unreadable"));
                    return;
                }
                receiver.add_frames(batch.to_vec(), index + 1 == batches);
            }
        });
    }
}

struct SimContext
{
    stacks: Vec<StackRef>,
    latency: Duration,
    page: usize,
}

impl SuspendContext for SimContext
{
    fn active_execution_stack(&self) -> Option<StackRef>
    {
        self.stacks.first().cloned()
    }

    fn execution_stacks(&self) -> Vec<StackRef>
    {
        // The first two threads are known up front; the rest needs discovery.
        self.stacks.iter().take(2).cloned().collect()
    }

    fn compute_execution_stacks(&self, receiver: Arc<dyn StackReceiver>)
    {
        let stacks = self.stacks.clone();
        let latency = self.latency;
        let page = self.page.max(1);

        thread::spawn(move || {
            let pages = stacks.chunks(page).count();
            for (index, chunk) in stacks.chunks(page).enumerate() {
                thread::sleep(latency);
                if receiver.is_obsolete() {
                    return;
                }
                receiver.deliver(StackEvent::Batch { stacks: chunk.to_vec(), last: index + 1 == pages });
            }
        });
    }
}

#[derive(Default)]
struct SimState
{
    context: Option<Arc<SimContext>>,
    current_stack: Option<StackRef>,
    current_frame: Option<FrameRef>,
    stopped: bool,
}

/// Simulated debugging session.
pub struct SimDebuggee
{
    config: SimConfig,
    state: Mutex<SimState>,
    pauses: AtomicU64,
    verbose: Arc<AtomicBool>,
    events: SessionEventSender,
    receiver: Mutex<Option<SessionEventReceiver>>,
}

impl SimDebuggee
{
    /// Create a running (not paused) debuggee.
    #[must_use]
    pub fn new(config: SimConfig) -> Self
    {
        let (events, receiver) = event_channel();
        Self {
            config,
            state: Mutex::new(SimState::default()),
            pauses: AtomicU64::new(0),
            verbose: Arc::new(AtomicBool::new(false)),
            events,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SimConfig
    {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SimState>
    {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: SessionEvent)
    {
        debug!(?event, "publishing session event");
        // Nobody listening is fine: the receiver may not have been taken yet.
        let _ = self.events.send(event);
    }

    fn build_threads(&self, pause: u64) -> Vec<StackRef>
    {
        let count = self.config.threads.max(1);
        (0..count)
            .map(|index| {
                let name = if index == 0 { "main".to_string() } else { format!("tokio-runtime-worker-{index}") };
                let fails = self.config.failing_thread.as_deref() == Some(name.as_str());
                let thread: StackRef = Arc::new(SimThread {
                    id: StackId::next(),
                    name,
                    seed: pause * 1000 + index as u64,
                    depth: self.config.depth,
                    batch_size: self.config.batch_size,
                    latency: self.config.latency,
                    fails,
                    verbose: self.verbose.clone(),
                });
                thread
            })
            .collect()
    }
}

impl Session for SimDebuggee
{
    fn current_execution_stack(&self) -> Option<StackRef>
    {
        self.lock().current_stack.clone()
    }

    fn current_stack_frame(&self) -> Option<FrameRef>
    {
        self.lock().current_frame.clone()
    }

    fn suspend_context(&self) -> Option<Arc<dyn SuspendContext>>
    {
        self.lock().context.clone().map(|context| context as Arc<dyn SuspendContext>)
    }

    fn set_current_stack_frame(&self, stack: &StackRef, frame: &FrameRef, is_top_frame: bool)
    {
        {
            let mut state = self.lock();
            if state.context.is_none() {
                return;
            }
            state.current_stack = Some(stack.clone());
            state.current_frame = Some(frame.clone());
        }
        debug!(stack = %stack.id(), %frame, is_top_frame, "current frame changed");
        self.publish(SessionEvent::FrameChanged);
    }
}

impl Debuggee for SimDebuggee
{
    fn pause(&self)
    {
        let pause = self.pauses.fetch_add(1, Ordering::SeqCst) + 1;
        let stacks = self.build_threads(pause);
        {
            let mut state = self.lock();
            if state.stopped {
                return;
            }
            let context = Arc::new(SimContext {
                stacks,
                latency: self.config.latency,
                page: self.config.discovery_page,
            });
            state.current_stack = context.active_execution_stack();
            state.current_frame = None;
            state.context = Some(context);
        }
        info!(pause, "debuggee paused");
        self.publish(SessionEvent::Paused);
    }

    fn resume(&self)
    {
        {
            let mut state = self.lock();
            if state.stopped || state.context.is_none() {
                return;
            }
            self.publish(SessionEvent::BeforeResume);
            state.context = None;
            state.current_stack = None;
            state.current_frame = None;
        }
        info!("debuggee resumed");
        self.publish(SessionEvent::Resumed);
    }

    fn toggle_settings(&self)
    {
        let verbose = !self.verbose.fetch_xor(true, Ordering::SeqCst);
        debug!(verbose, "frame rendering toggled");
        self.publish(SessionEvent::SettingsChanged);
    }

    fn stop(&self)
    {
        {
            let mut state = self.lock();
            if state.stopped {
                return;
            }
            *state = SimState { stopped: true, ..SimState::default() };
        }
        info!("session stopped");
        self.publish(SessionEvent::SessionStopped);
    }

    fn take_event_receiver(&self) -> Option<SessionEventReceiver>
    {
        self.receiver.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

#[cfg(test)]
mod tests
{
    use std::sync::mpsc;

    use super::*;
    use crate::provider::FrameEvent;

    struct Collect(mpsc::Sender<FrameEvent>);

    impl FrameReceiver for Collect
    {
        fn deliver(&self, event: FrameEvent)
        {
            let _ = self.0.send(event);
        }
    }

    fn quick() -> SimConfig
    {
        SimConfig {
            threads: 3,
            depth: 5,
            batch_size: 2,
            latency: Duration::from_millis(1),
            failing_thread: Some("tokio-runtime-worker-2".to_string()),
            discovery_page: 2,
        }
    }

    #[test]
    fn test_pause_publishes_event_and_context()
    {
        let debuggee = SimDebuggee::new(quick());
        let events = debuggee.take_event_receiver().unwrap();
        assert!(debuggee.take_event_receiver().is_none());

        debuggee.pause();
        assert_eq!(events.recv().unwrap(), SessionEvent::Paused);
        assert!(debuggee.is_paused());
        assert_eq!(debuggee.current_execution_stack().unwrap().display_name(), "main");

        debuggee.resume();
        assert_eq!(events.recv().unwrap(), SessionEvent::BeforeResume);
        assert_eq!(events.recv().unwrap(), SessionEvent::Resumed);
        assert!(!debuggee.is_paused());
    }

    #[test]
    fn test_frames_arrive_in_batches()
    {
        let debuggee = SimDebuggee::new(quick());
        debuggee.pause();
        let stack = debuggee.current_execution_stack().unwrap();

        let (sender, receiver) = mpsc::channel();
        stack.compute_frames(0, Arc::new(Collect(sender)));

        let mut sizes = Vec::new();
        let mut last = false;
        while !last {
            match receiver.recv().unwrap() {
                FrameEvent::Batch { frames, last: done, .. } => {
                    sizes.push(frames.len());
                    last = done;
                }
                FrameEvent::Error(message) => panic!("unexpected error: {message}"),
            }
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_failing_thread_reports_error_after_first_batch()
    {
        let debuggee = SimDebuggee::new(quick());
        debuggee.pause();
        let context = debuggee.suspend_context().unwrap();
        // The failing thread is only reachable through discovery.
        assert_eq!(context.execution_stacks().len(), 2);
        let failing = debuggee.lock().context.as_ref().unwrap().stacks[2].clone();
        assert_eq!(failing.display_name(), "tokio-runtime-worker-2");

        let (sender, receiver) = mpsc::channel();
        failing.compute_frames(0, Arc::new(Collect(sender)));

        assert!(matches!(receiver.recv().unwrap(), FrameEvent::Batch { last: false, .. }));
        assert!(matches!(receiver.recv().unwrap(), FrameEvent::Error(_)));
    }

    #[test]
    fn test_frame_equality_ignores_allocation()
    {
        let debuggee = SimDebuggee::new(quick());
        debuggee.pause();
        let thread = debuggee.lock().context.as_ref().unwrap().stacks[0].clone();

        let (sender, receiver) = mpsc::channel();
        thread.compute_frames(1, Arc::new(Collect(sender.clone())));
        thread.compute_frames(1, Arc::new(Collect(sender)));
        let first = match receiver.recv().unwrap() {
            FrameEvent::Batch { frames, .. } => frames[0].clone(),
            FrameEvent::Error(message) => panic!("{message}"),
        };
        let second = match receiver.recv().unwrap() {
            FrameEvent::Batch { frames, .. } => frames[0].clone(),
            FrameEvent::Error(message) => panic!("{message}"),
        };

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(first.same_frame(&*second));
    }

    #[test]
    fn test_settings_toggle_changes_rendering()
    {
        let debuggee = SimDebuggee::new(quick());
        let thread = &debuggee.build_threads(1)[0];
        let (sender, receiver) = mpsc::channel();
        thread.compute_frames(0, Arc::new(Collect(sender)));
        let frame = match receiver.recv().unwrap() {
            FrameEvent::Batch { frames, .. } => frames[0].clone(),
            FrameEvent::Error(message) => panic!("{message}"),
        };

        let terse = frame.to_string();
        debuggee.toggle_settings();
        let verbose = frame.to_string();
        assert_ne!(terse, verbose);
        assert!(verbose.contains(" at "));
    }
}
