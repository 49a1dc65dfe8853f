//! Session event types and helpers.
//!
//! Backends publish these whenever the debuggee changes state; the frames
//! view consumes them through [`FramesView::on_session_event`](crate::view::FramesView::on_session_event).

use std::sync::mpsc;

/// Event emitted by a debugging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent
{
    /// The debuggee stopped and a suspend context is available.
    Paused,
    /// The debuggee is about to resume. Ignored by the view.
    BeforeResume,
    /// The debuggee resumed execution.
    Resumed,
    /// The session's current frame changed.
    FrameChanged,
    /// Display settings changed; loaded data should be re-rendered.
    SettingsChanged,
    /// The session ended.
    SessionStopped,
}

impl SessionEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub const fn describe(self) -> &'static str
    {
        match self {
            Self::Paused => "Debuggee paused",
            Self::BeforeResume => "Debuggee about to resume",
            Self::Resumed => "Debuggee resumed",
            Self::FrameChanged => "Current frame changed",
            Self::SettingsChanged => "Display settings changed",
            Self::SessionStopped => "Session stopped",
        }
    }
}

/// Sender side of the session event channel.
pub type SessionEventSender = mpsc::Sender<SessionEvent>;
/// Receiver side of the session event channel.
pub type SessionEventReceiver = mpsc::Receiver<SessionEvent>;

/// Create a new session event channel.
#[must_use]
pub fn event_channel() -> (SessionEventSender, SessionEventReceiver)
{
    mpsc::channel()
}
