//! Panel widgets

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;
use stacklens_core::model::{FrameEntry, ThreadEntry};
use stacklens_core::provider::Debuggee;

use crate::app::{App, Focus};

const LOADING: &str = "Loading...";

fn panel<'a, D: Debuggee>(title: String, app: &App<D>, focus: Focus) -> Block<'a>
{
    let border = if app.focus == focus { Style::default().fg(Color::Cyan) } else { Style::default() };
    Block::default().borders(Borders::ALL).border_style(border).title(title)
}

/// Draw the thread filter field
pub fn draw_filter<D: Debuggee>(frame: &mut Frame, area: Rect, app: &App<D>)
{
    let busy = app.view.threads().is_busy();
    let title = if busy { "Filter (searching stacks)" } else { "Filter" };
    let style = if busy { Style::default().fg(Color::Yellow) } else { Style::default().fg(Color::White) };

    let mut text = app.filter_input.clone();
    if app.focus == Focus::Filter {
        text.push('_');
    }

    let field = Paragraph::new(text).style(style).block(panel(title.to_string(), app, Focus::Filter));
    frame.render_widget(field, area);
}

/// Draw the thread list
pub fn draw_threads<D: Debuggee>(frame: &mut Frame, area: Rect, app: &mut App<D>)
{
    let threads = app.view.threads();
    let selected = threads.selected();

    let rows: Vec<Row> = threads
        .entries()
        .iter()
        .map(|entry| match entry {
            ThreadEntry::Stack(stack) => {
                let is_selected = selected == Some(stack.id());
                let prefix = if is_selected { "→ " } else { "  " };
                let name = if stack.display_name().is_empty() { "<unnamed>" } else { stack.display_name() };
                Row::new(vec![Cell::from(format!("{prefix}{name}")), Cell::from(stack.id().to_string())])
            }
            ThreadEntry::Loading => Row::new(vec![Cell::from(LOADING)])
                .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)),
        })
        .collect();

    let title = format!("Threads ({})", threads.stacks().count());
    let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(8)])
        .block(panel(title, app, Focus::Threads))
        .header(Row::new(vec![
            Cell::from("Name").style(Style::default().add_modifier(Modifier::BOLD)),
            Cell::from("Id").style(Style::default().add_modifier(Modifier::BOLD)),
        ]))
        .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.threads_state);
}

/// Draw the frames of the selected thread
pub fn draw_frames<D: Debuggee>(frame: &mut Frame, area: Rect, app: &mut App<D>)
{
    let frames = app.view.frames();
    let rows: Vec<Row> = frames
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            FrameEntry::Frame(stack_frame) => {
                Row::new(vec![Cell::from(index.to_string()), Cell::from(stack_frame.to_string())])
            }
            FrameEntry::Error(message) => {
                Row::new(vec![Cell::from("!"), Cell::from(message.clone())]).style(Style::default().fg(Color::Red))
            }
            FrameEntry::Loading => Row::new(vec![Cell::from(""), Cell::from(LOADING)])
                .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)),
        })
        .collect();

    let title = match app.view.selected_stack() {
        Some(stack) if !stack.display_name().is_empty() => format!("Frames - {}", stack.display_name()),
        _ => "Frames".to_string(),
    };

    if rows.is_empty() {
        let hint = if app.debuggee.is_paused() { LOADING } else { "Not paused. Press p to pause." };
        let empty = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(title, app, Focus::Frames));
        frame.render_widget(empty, area);
        return;
    }

    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(20)])
        .block(panel(title, app, Focus::Frames))
        .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.frames_state);
    app.view.set_scroll_offset(app.frames_state.offset());
}
