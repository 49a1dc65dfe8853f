//! Tests for handle types and session events

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use stacklens_core::events::{event_channel, SessionEvent};
use stacklens_core::types::{FrameRef, StackFrame, StackId};

#[derive(Debug)]
struct Plain(u8);

impl fmt::Display for Plain
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "plain {}", self.0)
    }
}

impl StackFrame for Plain
{
    fn as_any(&self) -> &dyn Any
    {
        self
    }
}

#[test]
fn test_stack_id_from_u64()
{
    let id = StackId::from(42);
    assert_eq!(id.raw(), 42);
    assert_eq!(id, StackId::from(42));
    assert_ne!(id, StackId::from(43));
}

#[test]
fn test_stack_id_display()
{
    assert_eq!(StackId::from(7).to_string(), "#7");
}

#[test]
fn test_stack_id_next_is_unique()
{
    let first = StackId::next();
    let second = StackId::next();
    assert_ne!(first, second);
    assert!(second > first);
}

#[test]
fn test_default_same_frame_is_identity()
{
    let first: FrameRef = Arc::new(Plain(1));
    let twin: FrameRef = Arc::new(Plain(1));
    let alias = first.clone();

    assert!(first.same_frame(&*alias));
    assert!(!first.same_frame(&*twin));
    assert_eq!(format!("{:?}", &*first), "StackFrame(plain 1)");
}

#[test]
fn test_session_event_describe()
{
    assert_eq!(SessionEvent::Paused.describe(), "Debuggee paused");
    assert_eq!(SessionEvent::SessionStopped.describe(), "Session stopped");
}

#[test]
fn test_event_channel_delivers_in_order()
{
    let (sender, receiver) = event_channel();
    sender.send(SessionEvent::Paused).unwrap();
    sender.send(SessionEvent::FrameChanged).unwrap();
    drop(sender);

    let events: Vec<SessionEvent> = receiver.iter().collect();
    assert_eq!(events, vec![SessionEvent::Paused, SessionEvent::FrameChanged]);
}
