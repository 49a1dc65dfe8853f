//! Application state and logic

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::TableState;
use stacklens_core::events::SessionEvent;
use stacklens_core::model::ThreadEntry;
use stacklens_core::provider::Debuggee;
use stacklens_core::FramesView;
use stacklens_utils::{debug, info};

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus
{
    /// Frame list of the selected thread
    #[default]
    Frames,
    /// Thread list
    Threads,
    /// Thread filter text field
    Filter,
}

/// Application state
pub struct App<D: Debuggee>
{
    /// The session being shown
    pub debuggee: Arc<D>,
    /// Frames and threads controller
    pub view: FramesView,
    /// Panel receiving navigation keys
    pub focus: Focus,
    /// Cursor of the thread table
    pub threads_state: TableState,
    /// Selection and scroll position of the frame table
    pub frames_state: TableState,
    /// Text of the filter field
    pub filter_input: String,
    /// Whether the full thread list was requested
    pub picker_open: bool,
    /// Last informational message
    pub status_message: Option<String>,
    /// Last error to display
    pub error_message: Option<String>,
    /// Whether the session ended
    pub stopped: bool,
    /// Whether the application should exit
    pub should_quit: bool,
    seen_errors: usize,
}

impl<D: Debuggee + 'static> App<D>
{
    /// Create the app and its view for `debuggee`.
    pub fn new(debuggee: Arc<D>) -> Self
    {
        let view = FramesView::new(debuggee.clone());
        Self {
            debuggee,
            view,
            focus: Focus::default(),
            threads_state: TableState::default(),
            frames_state: TableState::default(),
            filter_input: String::new(),
            picker_open: false,
            status_message: None,
            error_message: None,
            stopped: false,
            should_quit: false,
            seen_errors: 0,
        }
    }

    /// Replace the thread filter.
    pub fn set_filter(&mut self, text: impl Into<String>)
    {
        self.filter_input = text.into();
        self.view.set_filter_text(self.filter_input.clone());
        self.sync_selection();
    }

    /// Handle a keyboard event
    ///
    /// Returns `true` if the application should quit, `false` otherwise.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> bool
    {
        if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return true;
        }
        if self.focus == Focus::Filter {
            self.handle_filter_key(key_event);
            return false;
        }

        self.error_message = None;
        match key_event.code {
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => {
                self.should_quit = true;
                return true;
            }
            KeyCode::Tab => {
                self.focus = if self.focus == Focus::Frames { Focus::Threads } else { Focus::Frames };
            }
            KeyCode::Char('/') => self.focus = Focus::Filter,
            KeyCode::Up | KeyCode::Char('k') => self.navigate(false),
            KeyCode::Down | KeyCode::Char('j') => self.navigate(true),
            KeyCode::Enter if self.focus == Focus::Threads => self.activate_thread(),
            KeyCode::Char('t') => self.toggle_picker(),
            KeyCode::Char('p') => {
                if self.debuggee.is_paused() {
                    self.status_message = Some("Already paused".to_string());
                } else {
                    self.debuggee.pause();
                }
            }
            KeyCode::Char('r') => {
                if self.debuggee.is_paused() {
                    self.debuggee.resume();
                } else {
                    self.status_message = Some("Not paused".to_string());
                }
            }
            KeyCode::Char('s') => self.debuggee.toggle_settings(),
            KeyCode::Char('x') => self.debuggee.stop(),
            _ => {}
        }

        self.sync_selection();
        false
    }

    fn handle_filter_key(&mut self, key_event: KeyEvent)
    {
        match key_event.code {
            KeyCode::Char('u') if key_event.modifiers.contains(KeyModifiers::CONTROL) => self.set_filter(""),
            KeyCode::Char(c) => {
                let mut text = self.filter_input.clone();
                text.push(c);
                self.set_filter(text);
            }
            KeyCode::Backspace => {
                let mut text = self.filter_input.clone();
                text.pop();
                self.set_filter(text);
            }
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Threads,
            _ => {}
        }
    }

    fn navigate(&mut self, down: bool)
    {
        match self.focus {
            Focus::Frames => self.move_frame(down),
            Focus::Threads => self.move_thread_cursor(down),
            Focus::Filter => {}
        }
    }

    fn move_frame(&mut self, down: bool)
    {
        let frames = self.view.frames();
        if frames.is_empty() {
            return;
        }
        let current = frames.selected_index();
        let next = match current {
            None => 0,
            Some(index) if down => index + 1,
            Some(index) => index.saturating_sub(1),
        };
        if Some(next) == current {
            return;
        }

        match self.view.select_frame(next) {
            Ok(true) => {}
            Ok(false) => self.status_message = Some("Frames are still loading".to_string()),
            Err(error) => debug!(%error, "frame selection rejected"),
        }
    }

    fn move_thread_cursor(&mut self, down: bool)
    {
        let len = self.view.threads().entries().len();
        if len == 0 {
            return;
        }
        let current = self.threads_state.selected().unwrap_or(0).min(len - 1);
        let next = if down {
            if current + 1 >= len { 0 } else { current + 1 }
        } else if current == 0 {
            len - 1
        } else {
            current - 1
        };
        self.threads_state.select(Some(next));
    }

    fn activate_thread(&mut self)
    {
        let Some(index) = self.threads_state.selected() else {
            return;
        };
        let Some(stack) = self.view.threads().entries().get(index).and_then(ThreadEntry::as_stack).map(|stack| stack.id())
        else {
            return;
        };

        match self.view.select_stack(stack) {
            Ok(true) => self.focus = Focus::Frames,
            Ok(false) => {
                if self.view.selected_stack().is_some_and(|selected| selected.id() == stack) {
                    self.focus = Focus::Frames;
                } else {
                    self.status_message = Some("Frames are still loading".to_string());
                }
            }
            Err(error) => self.error_message = Some(error.to_string()),
        }
    }

    fn toggle_picker(&mut self)
    {
        if self.picker_open {
            self.view.close_thread_picker();
            self.picker_open = false;
            return;
        }

        self.focus = Focus::Threads;
        if self.view.open_thread_picker() {
            self.picker_open = true;
        } else if !self.view.registry().threads_calculated() {
            self.status_message = Some("No paused threads to list".to_string());
        }
    }

    /// Forward a session event to the view.
    pub fn handle_session_event(&mut self, event: SessionEvent)
    {
        info!(?event, "session event");
        if let Err(error) = self.view.on_session_event(event) {
            self.error_message = Some(error.to_string());
            return;
        }

        match event {
            SessionEvent::Paused | SessionEvent::Resumed => self.picker_open = false,
            SessionEvent::SessionStopped => {
                self.picker_open = false;
                self.stopped = true;
            }
            _ => {}
        }
        self.status_message = Some(event.describe().to_string());
        self.process_pending();
    }

    /// Apply queued background results and refresh table state.
    pub fn process_pending(&mut self)
    {
        self.view.process_pending();

        let errors = self.view.reported_errors();
        if errors.len() > self.seen_errors {
            self.seen_errors = errors.len();
            self.error_message = errors.last().map(ToString::to_string);
        }
        if self.picker_open && !self.view.registry().is_discovering() {
            self.picker_open = false;
        }
        self.sync_selection();
    }

    /// Update the application state (called on each tick)
    pub fn tick(&mut self)
    {
        self.process_pending();
    }

    /// Push the view's selection into the table states.
    fn sync_selection(&mut self)
    {
        let frames = self.view.frames();
        self.frames_state.select(frames.selected_index());
        *self.frames_state.offset_mut() = frames.scroll_offset();

        let threads = self.view.threads();
        if self.focus == Focus::Threads {
            let len = threads.entries().len();
            let cursor = self.threads_state.selected().filter(|index| *index < len);
            self.threads_state.select(cursor.or_else(|| threads.selected().and_then(|id| threads.position(id))));
        } else {
            self.threads_state.select(threads.selected().and_then(|id| threads.position(id)));
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::thread;
    use std::time::{Duration, Instant};

    use crossterm::event::KeyEventKind;
    use stacklens_core::sim::{SimConfig, SimDebuggee};
    use stacklens_core::prelude::Session;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent
    {
        let mut event = KeyEvent::new(code, KeyModifiers::NONE);
        event.kind = KeyEventKind::Press;
        event
    }

    fn paused_app() -> App<SimDebuggee>
    {
        let debuggee = Arc::new(SimDebuggee::new(SimConfig {
            threads: 3,
            depth: 6,
            batch_size: 4,
            latency: Duration::from_millis(1),
            failing_thread: None,
            discovery_page: 2,
        }));
        let mut app = App::new(debuggee.clone());
        debuggee.pause();
        app.handle_session_event(SessionEvent::Paused);
        settle(&mut app, |app| app.view.frames().len() == 6 && !app.view.frames().has_loading_tail());
        app
    }

    fn settle(app: &mut App<SimDebuggee>, done: impl Fn(&App<SimDebuggee>) -> bool)
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(app) {
            assert!(Instant::now() < deadline, "view did not settle");
            thread::sleep(Duration::from_millis(2));
            app.process_pending();
        }
    }

    #[test]
    fn test_quit_keys()
    {
        let mut app = paused_app();
        assert!(!app.handle_key_event(key(KeyCode::Char('j'))));
        assert!(app.handle_key_event(key(KeyCode::Char('q'))));
        assert!(app.should_quit);
    }

    #[test]
    fn test_frame_navigation_pushes_selection()
    {
        let mut app = paused_app();
        assert_eq!(app.frames_state.selected(), Some(0));

        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Down));

        assert_eq!(app.view.frames().selected_index(), Some(2));
        assert_eq!(app.frames_state.selected(), Some(2));
        let current = app.debuggee.current_stack_frame().unwrap();
        assert!(current.same_frame(&**app.view.frames().selected_frame().unwrap()));
    }

    #[test]
    fn test_filter_typing_updates_view()
    {
        let mut app = paused_app();
        app.handle_key_event(key(KeyCode::Char('/')));
        assert_eq!(app.focus, Focus::Filter);

        app.handle_key_event(key(KeyCode::Char('m')));
        app.handle_key_event(key(KeyCode::Char('a')));
        app.handle_key_event(key(KeyCode::Char('q')));
        app.handle_key_event(key(KeyCode::Backspace));
        assert_eq!(app.view.threads().filter_text(), "ma");
        assert!(!app.should_quit);

        app.handle_key_event(key(KeyCode::Esc));
        assert_eq!(app.focus, Focus::Threads);
    }

    #[test]
    fn test_thread_activation_switches_stack()
    {
        let mut app = paused_app();
        app.handle_key_event(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Threads);
        assert_eq!(app.threads_state.selected(), Some(0));

        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.focus, Focus::Frames);
        let second = app.view.threads().entries()[1].as_stack().unwrap().id();
        assert_eq!(app.view.selected_stack().map(|stack| stack.id()), Some(second));
    }

    #[test]
    fn test_resume_clears_panels()
    {
        let mut app = paused_app();
        app.handle_key_event(key(KeyCode::Char('r')));
        app.handle_session_event(SessionEvent::Resumed);

        assert!(app.view.frames().is_empty());
        assert!(app.view.threads().entries().is_empty());
        assert_eq!(app.status_message.as_deref(), Some("Debuggee resumed"));
    }
}
