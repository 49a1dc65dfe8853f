//! Deterministic backend fakes.
//!
//! Nothing here spawns threads: every request is recorded and the test
//! decides when, and with what, it is answered.

#![allow(dead_code)]

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use stacklens_core::model::FrameEntry;
use stacklens_core::provider::{FrameReceiver, Session, StackEvent, StackReceiver, SuspendContext};
use stacklens_core::types::{ExecutionStack, FrameRef, StackFrame, StackId, StackRef};
use stacklens_core::FramesView;

/// Frame identified by its stack and depth; the label is only for display.
#[derive(Debug)]
pub struct FakeFrame
{
    pub owner: StackId,
    pub depth: usize,
    pub label: String,
}

impl fmt::Display for FakeFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.label)
    }
}

impl StackFrame for FakeFrame
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
            .is_some_and(|other| other.owner == self.owner && other.depth == self.depth)
    }
}

/// Stack answering nothing until told to.
pub struct FakeStack
{
    id: StackId,
    name: String,
    functions: Vec<String>,
    requests: Mutex<Vec<(usize, Arc<dyn FrameReceiver>)>>,
}

impl FakeStack
{
    pub fn new(name: &str, functions: &[&str]) -> Arc<Self>
    {
        Arc::new(Self {
            id: StackId::next(),
            name: name.to_string(),
            functions: functions.iter().map(|function| (*function).to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Stack with `depth` frames labelled `<name>::fn<depth>`.
    pub fn with_depth(name: &str, depth: usize) -> Arc<Self>
    {
        let functions: Vec<String> = (0..depth).map(|index| format!("{name}::fn{index}")).collect();
        let functions: Vec<&str> = functions.iter().map(String::as_str).collect();
        Self::new(name, &functions)
    }

    pub fn handle(self: &Arc<Self>) -> StackRef
    {
        self.clone()
    }

    /// A fresh frame object equal to the one at `depth`.
    pub fn frame(&self, depth: usize) -> FrameRef
    {
        Arc::new(FakeFrame {
            owner: self.id,
            depth,
            label: self.functions.get(depth).cloned().unwrap_or_else(|| format!("{}::unknown{depth}", self.name)),
        })
    }

    pub fn frames(&self, range: std::ops::Range<usize>) -> Vec<FrameRef>
    {
        range.map(|depth| self.frame(depth)).collect()
    }

    pub fn request_count(&self) -> usize
    {
        self.requests.lock().unwrap().len()
    }

    /// First frame index asked for by request `request`.
    pub fn first_index(&self, request: usize) -> usize
    {
        self.requests.lock().unwrap()[request].0
    }

    pub fn receiver(&self, request: usize) -> Arc<dyn FrameReceiver>
    {
        self.requests.lock().unwrap()[request].1.clone()
    }

    pub fn deliver(&self, request: usize, range: std::ops::Range<usize>, last: bool)
    {
        self.receiver(request).add_frames(self.frames(range), last);
    }

    /// Deliver every frame for `request` in one final batch.
    pub fn deliver_all(&self, request: usize)
    {
        let from = self.first_index(request);
        self.deliver(request, from..self.functions.len(), true);
    }

    pub fn fail(&self, request: usize, message: &str)
    {
        self.receiver(request).error(message);
    }
}

impl ExecutionStack for FakeStack
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
        self.requests.lock().unwrap().push((first_index, receiver));
    }
}

/// Suspend context whose first `initial` stacks are known without discovery.
pub struct FakeContext
{
    stacks: Vec<StackRef>,
    initial: usize,
    discoveries: Mutex<Vec<Arc<dyn StackReceiver>>>,
}

impl FakeContext
{
    pub fn new(stacks: &[&Arc<FakeStack>]) -> Arc<Self>
    {
        Self::partial(stacks, stacks.len())
    }

    pub fn partial(stacks: &[&Arc<FakeStack>], initial: usize) -> Arc<Self>
    {
        Arc::new(Self {
            stacks: stacks.iter().map(|stack| stack.handle()).collect(),
            initial,
            discoveries: Mutex::new(Vec::new()),
        })
    }

    pub fn discovery_count(&self) -> usize
    {
        self.discoveries.lock().unwrap().len()
    }

    pub fn discovery(&self, index: usize) -> Arc<dyn StackReceiver>
    {
        self.discoveries.lock().unwrap()[index].clone()
    }

    pub fn page(&self, index: usize, stacks: &[&Arc<FakeStack>], last: bool)
    {
        let stacks = stacks.iter().map(|stack| stack.handle()).collect();
        self.discovery(index).deliver(StackEvent::Batch { stacks, last });
    }
}

impl SuspendContext for FakeContext
{
    fn active_execution_stack(&self) -> Option<StackRef>
    {
        self.stacks.first().cloned()
    }

    fn execution_stacks(&self) -> Vec<StackRef>
    {
        self.stacks.iter().take(self.initial).cloned().collect()
    }

    fn compute_execution_stacks(&self, receiver: Arc<dyn StackReceiver>)
    {
        self.discoveries.lock().unwrap().push(receiver);
    }
}

#[derive(Default)]
struct SessionState
{
    context: Option<Arc<FakeContext>>,
    stack: Option<StackRef>,
    frame: Option<FrameRef>,
}

/// A pushed `set_current_stack_frame` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push
{
    pub stack: StackId,
    pub frame: String,
    pub is_top: bool,
}

/// Session whose state is set directly by the test.
#[derive(Default)]
pub struct FakeSession
{
    state: Mutex<SessionState>,
    pushes: Mutex<Vec<Push>>,
}

impl FakeSession
{
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self::default())
    }

    pub fn pause(&self, context: &Arc<FakeContext>)
    {
        let mut state = self.state.lock().unwrap();
        state.stack = context.active_execution_stack();
        state.frame = None;
        state.context = Some(context.clone());
    }

    pub fn resume(&self)
    {
        *self.state.lock().unwrap() = SessionState::default();
    }

    /// Change the session's focus without going through the view.
    pub fn focus(&self, stack: &Arc<FakeStack>, frame: Option<FrameRef>)
    {
        let mut state = self.state.lock().unwrap();
        state.stack = Some(stack.handle());
        state.frame = frame;
    }

    pub fn pushes(&self) -> Vec<Push>
    {
        self.pushes.lock().unwrap().clone()
    }
}

impl Session for FakeSession
{
    fn current_execution_stack(&self) -> Option<StackRef>
    {
        self.state.lock().unwrap().stack.clone()
    }

    fn current_stack_frame(&self) -> Option<FrameRef>
    {
        self.state.lock().unwrap().frame.clone()
    }

    fn suspend_context(&self) -> Option<Arc<dyn SuspendContext>>
    {
        self.state.lock().unwrap().context.clone().map(|context| context as Arc<dyn SuspendContext>)
    }

    fn set_current_stack_frame(&self, stack: &StackRef, frame: &FrameRef, is_top_frame: bool)
    {
        self.pushes.lock().unwrap().push(Push { stack: stack.id(), frame: frame.to_string(), is_top: is_top_frame });
        let mut state = self.state.lock().unwrap();
        state.stack = Some(stack.clone());
        state.frame = Some(frame.clone());
    }
}

/// Frame list as text: frames by label, errors prefixed, placeholders as `Loading...`.
pub fn render(view: &FramesView) -> Vec<String>
{
    view.frames()
        .entries()
        .iter()
        .map(|entry| match entry {
            FrameEntry::Frame(frame) => frame.to_string(),
            FrameEntry::Error(message) => format!("error: {message}"),
            FrameEntry::Loading => "Loading...".to_string(),
        })
        .collect()
}

/// Names of the visible threads, `Loading...` for the placeholder.
pub fn thread_names(view: &FramesView) -> Vec<String>
{
    view.threads()
        .entries()
        .iter()
        .map(|entry| entry.as_stack().map_or_else(|| "Loading...".to_string(), |stack| stack.display_name().to_string()))
        .collect()
}
