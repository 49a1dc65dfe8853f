//! Terminal User Interface initialization and management

use std::io::{self, Stdout, Write};
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use stacklens_core::provider::Debuggee;
use stacklens_utils::{info, warn};

use crate::app::App;
use crate::event::{Event, EventHandler};

/// Terminal front-end for a frames view
///
/// Owns the terminal while alive: raw mode and the alternate screen are
/// entered on creation and left on drop or panic.
pub struct Tui
{
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui
{
    /// Take over the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the alternate screen cannot be entered.
    pub fn new() -> io::Result<Self>
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = Self::restore();
            original_hook(panic_info);
        }));

        Ok(Self { terminal })
    }

    /// Show `debuggee` until the user quits.
    ///
    /// Session events are taken from the debuggee and applied as they
    /// arrive; background frame results wake the loop through the view's
    /// waker. `filter` pre-fills the thread filter.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing or terminal restoration fails.
    pub async fn run<D: Debuggee + 'static>(&mut self, debuggee: Arc<D>, filter: Option<String>) -> io::Result<()>
    {
        info!("stacklens TUI started");

        let mut app = App::new(debuggee.clone());
        if let Some(text) = filter {
            app.set_filter(text);
        }

        let mut events = EventHandler::new();
        let waker = events.sender();
        app.view.set_waker(move || {
            // A full queue already holds a pending wake-up.
            let _ = waker.try_send(Event::Wake);
        });
        match debuggee.take_event_receiver() {
            Some(receiver) => events.forward_session_events(receiver),
            None => warn!("session events already taken; the view will not follow the debuggee"),
        }

        loop {
            if app.should_quit {
                break;
            }

            self.terminal.draw(|frame| crate::ui::draw(frame, &mut app))?;

            match tokio::time::timeout(Duration::from_millis(100), events.next()).await {
                Ok(Some(Event::Key(key_event))) => {
                    if app.handle_key_event(key_event) {
                        break;
                    }
                }
                Ok(Some(Event::Tick)) => app.tick(),
                Ok(Some(Event::Wake)) => app.process_pending(),
                Ok(Some(Event::Session(event))) => app.handle_session_event(event),
                Ok(None) => break,
                Err(_) => {}
            }
        }

        info!("stacklens TUI closing");
        Self::restore()?;
        events.stop();
        app.view.dispose();
        debuggee.stop();
        let _ = io::stdout().flush();

        info!(tasks_running = events.is_running(), "stacklens TUI closed");
        Ok(())
    }

    /// Restore the terminal to its original state
    ///
    /// # Errors
    ///
    /// Returns an error if leaving raw mode or the alternate screen fails.
    pub fn restore() -> io::Result<()>
    {
        disable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for Tui
{
    fn drop(&mut self)
    {
        let _ = Self::restore();
    }
}
