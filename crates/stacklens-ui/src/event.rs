//! Event handling for the TUI

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use stacklens_core::events::{SessionEvent, SessionEventReceiver};
use stacklens_utils::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TICK_RATE: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events that can occur in the TUI
#[derive(Debug, Clone)]
pub enum Event
{
    /// Keyboard input event
    Key(KeyEvent),
    /// Periodic update
    Tick,
    /// The debugging session changed state.
    Session(SessionEvent),
    /// Background frame or thread results are waiting to be applied.
    Wake,
}

/// Reads crossterm input on a blocking task and turns it into [`Event`]s.
pub struct EventHandler
{
    receiver: mpsc::Receiver<Event>,
    sender: mpsc::Sender<Event>,
    should_stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl EventHandler
{
    /// Spawn the input reader.
    #[must_use]
    pub fn new() -> Self
    {
        let (sender, receiver) = mpsc::channel(100);
        let should_stop = Arc::new(AtomicBool::new(false));

        let input_sender = sender.clone();
        let stop = should_stop.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                let timeout = TICK_RATE.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    if let Ok(CrosstermEvent::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press && input_sender.blocking_send(Event::Key(key)).is_err() {
                            break;
                        }
                    }
                }

                if last_tick.elapsed() >= TICK_RATE {
                    if input_sender.blocking_send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { receiver, sender, should_stop, handles: vec![handle] }
    }

    /// Forward session events from `events` until stopped.
    ///
    /// The session channel is polled so a quiet session cannot keep the
    /// runtime from shutting down.
    pub fn forward_session_events(&mut self, events: SessionEventReceiver)
    {
        let sender = self.sender.clone();
        let stop = self.should_stop.clone();
        self.handles.push(tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::Relaxed) {
                match events.recv_timeout(POLL_INTERVAL) {
                    Ok(event) => {
                        if sender.blocking_send(Event::Session(event)).is_err() {
                            break;
                        }
                    }
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                        debug!("session event channel closed");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the background tasks.
    ///
    /// They notice on their next poll; the receiver is closed right away so
    /// pending sends fail.
    pub fn stop(&mut self)
    {
        self.should_stop.store(true, Ordering::Relaxed);
        drop(std::mem::replace(&mut self.receiver, {
            let (_sender, receiver) = mpsc::channel(1);
            receiver
        }));
    }

    /// Whether any background task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool
    {
        self.handles.iter().any(|handle| !handle.is_finished())
    }

    /// Get the next event (async)
    pub async fn next(&mut self) -> Option<Event>
    {
        self.receiver.recv().await
    }

    /// Get a sender that can be used to push events into the queue.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<Event>
    {
        self.sender.clone()
    }
}

impl Default for EventHandler
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Drop for EventHandler
{
    fn drop(&mut self)
    {
        self.stop();
    }
}
