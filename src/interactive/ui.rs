use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::app::{Focus, InteractiveApp};

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

/// Main render function
pub fn render(f: &mut Frame, app: &InteractiveApp) {
    let selection_height = if app.selection().is_empty() {
        0
    } else {
        (app.selection().entries().len() as u16 + 2).min(8)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                // Query input
            Constraint::Length(1),                // Status line
            Constraint::Min(1),                   // Results
            Constraint::Length(selection_height), // Selection
            Constraint::Length(1),                // Footer
        ])
        .split(f.area());

    render_input(f, chunks[0], app);
    render_status(f, chunks[1], app);
    render_results(f, chunks[2], app);
    if selection_height > 0 {
        render_selection(f, chunks[3], app);
    }
    render_footer(f, chunks[4]);
}

fn render_input(f: &mut Frame, area: Rect, app: &InteractiveApp) {
    let view = app.view();
    let directory_status = if view.loading {
        "loading symbols... ".to_string()
    } else {
        format!("{} symbols ", view.directory_len)
    };

    // Push the directory status to the right edge of the title
    let title_left = " Search for a stock symbol ";
    let available = area.width.saturating_sub(2) as usize;
    let spacing = available.saturating_sub(title_left.chars().count() + directory_status.chars().count());

    let block = Block::default()
        .borders(Borders::ALL)
        .title_top(Line::from(vec![
            Span::raw(title_left),
            Span::raw(" ".repeat(spacing)),
            Span::styled(directory_status, Style::default().fg(MUTED)),
        ]))
        .border_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    f.render_widget(Paragraph::new(app.input().value()).block(block), area);

    let cursor_x = area.x + 1 + app.input().visual_cursor() as u16;
    f.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

fn render_status(f: &mut Frame, area: Rect, app: &InteractiveApp) {
    let view = app.view();

    let line = if let Some(error) = &view.error {
        Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
    } else if view.loading {
        Line::from(Span::styled("Loading...", Style::default().fg(Color::Yellow)))
    } else if let Some(message) = app.info_message() {
        Line::from(Span::styled(message, Style::default().fg(Color::Green)))
    } else {
        Line::from(Span::styled(
            format!("{} results", app.results().results().len()),
            Style::default().fg(MUTED),
        ))
    };

    f.render_widget(Paragraph::new(line), area);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(MUTED)
    }
}

fn render_results(f: &mut Frame, area: Rect, app: &InteractiveApp) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Results ")
        .border_style(border_style(app.focus() == Focus::Results));

    let items: Vec<ListItem> = app
        .results()
        .results()
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", entry.symbol),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::raw(entry.name.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 40)).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !app.results().is_empty() {
        state.select(Some(app.results().selected_index()));
    }

    f.render_stateful_widget(list, area, &mut state);
}

fn render_selection(f: &mut Frame, area: Rect, app: &InteractiveApp) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Selected Stocks ({}) ", app.selection().entries().len()))
        .border_style(border_style(app.focus() == Focus::Selection));

    let items: Vec<ListItem> = app
        .selection()
        .entries()
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<8}", entry.symbol), Style::default().fg(Color::Green)),
                Span::raw(" "),
                Span::raw(entry.name.as_str()),
            ]))
        })
        .collect();

    let mut list = List::new(items).block(block);
    let mut state = ListState::default();
    if app.focus() == Focus::Selection {
        list = list
            .highlight_style(Style::default().bg(Color::Rgb(40, 40, 40)).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
    }
    state.select(Some(app.selection().highlighted_index()));

    f.render_stateful_widget(list, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let text = |t: &'static str| Span::styled(t, Style::default().fg(MUTED));

    let footer = Line::from(vec![
        key("↑↓"),
        text(" navigate  "),
        key("Enter"),
        text(" select  "),
        key("Tab"),
        text(" switch list  "),
        key("Ctrl+X"),
        text(" remove  "),
        key("Ctrl+R"),
        text(" refresh  "),
        key("Esc"),
        text(" quit"),
    ]);

    f.render_widget(Paragraph::new(footer), area);
}
