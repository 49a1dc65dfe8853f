//! UI rendering logic

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use stacklens_core::provider::Debuggee;

use crate::app::{App, Focus};

/// Draw the UI
pub fn draw<D: Debuggee>(frame: &mut Frame, app: &mut App<D>)
{
    let footer_height = if app.error_message.is_some() { 5 } else { 4 };
    let chunks = Layout::vertical([Constraint::Length(3), Constraint::Min(0), Constraint::Length(footer_height)])
        .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_footer(frame, chunks[2], app);
}

/// Draw the header bar
fn draw_header<D: Debuggee>(frame: &mut Frame, area: Rect, app: &App<D>)
{
    let state = if app.stopped {
        "Session stopped"
    } else if app.debuggee.is_paused() {
        "Paused"
    } else {
        "Running"
    };
    let known = app.view.registry().known_stacks().len();
    let title = if known > 0 { format!("stacklens - {state} ({known} threads known)") } else { format!("stacklens - {state}") };

    let header = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("stacklens"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    frame.render_widget(header, area);
}

/// Draw the thread and frame panels
fn draw_main_content<D: Debuggee>(frame: &mut Frame, area: Rect, app: &mut App<D>)
{
    if !app.view.threads().is_chooser_visible() {
        crate::widgets::draw_frames(frame, area, app);
        return;
    }

    let columns = Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).split(area);
    let left = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(columns[0]);

    crate::widgets::draw_filter(frame, left[0], app);
    crate::widgets::draw_threads(frame, left[1], app);
    crate::widgets::draw_frames(frame, columns[1], app);
}

/// Draw the footer with help text
fn draw_footer<D: Debuggee>(frame: &mut Frame, area: Rect, app: &App<D>)
{
    let help_text = match app.focus {
        Focus::Frames => "↑/↓:Frame | Tab:Threads | /:Filter | t:All threads | p:Pause r:Resume s:Settings x:Stop | q:Quit",
        Focus::Threads => "↑/↓:Move Enter:Show | Tab:Frames | /:Filter | t:All threads | p:Pause r:Resume | q:Quit",
        Focus::Filter => "Type to filter by name or frame text | Backspace:Delete Ctrl+U:Clear | Enter/Esc:Done",
    };

    let mut lines = vec![Line::from(help_text)];
    if let Some(status) = &app.status_message {
        lines.push(Line::from(Span::styled(status.clone(), Style::default().fg(Color::Gray))));
    }
    if let Some(error) = &app.error_message {
        lines.push(Line::from(Span::styled(format!("Error: {error}"), Style::default().fg(Color::Red))));
    }

    let footer = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests
{
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use stacklens_core::sim::{SimConfig, SimDebuggee};

    use super::*;

    fn screen(app: &mut App<SimDebuggee>) -> String
    {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_running_session_shows_hint()
    {
        let mut app = App::new(Arc::new(SimDebuggee::new(SimConfig::default())));
        let text = screen(&mut app);
        assert!(text.contains("stacklens - Running"));
        assert!(text.contains("Not paused"));
    }

    #[test]
    fn test_paused_session_shows_threads_and_placeholder()
    {
        let debuggee = Arc::new(SimDebuggee::new(SimConfig::default()));
        let mut app = App::new(debuggee.clone());
        debuggee.pause();
        app.view.on_session_event(stacklens_core::SessionEvent::Paused).unwrap();
        app.view.process_pending();

        let text = screen(&mut app);
        assert!(text.contains("Paused"));
        assert!(text.contains("main"));
        assert!(text.contains("Loading..."));
        assert!(text.contains("Frames - main"));
    }
}
