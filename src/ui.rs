use crate::app::{ActiveInput, App, InputMode, LoadState};
use crate::models::{TaskPriority, TaskRecord, TaskStatus};
use ansi_parser::{AnsiParser, Output};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

// Share of a terminal dimension, computed wide enough for any u16 size
fn percent_of(length: u16, percent: u16) -> u16 {
    (u32::from(length) * u32::from(percent) / 100) as u16
}

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

pub fn ansi_to_text(ansi_str: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for ansi_line in ansi_str.lines() {
        let mut spans = Vec::new();
        let parsed = ansi_line.ansi_parse();
        for item in parsed {
            match item {
                Output::TextBlock(text) => {
                    spans.push(Span::raw(text.to_string()));
                }
                Output::Escape(_escape) => {}
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn status_style(status: TaskStatus) -> (&'static str, Style) {
    match status {
        TaskStatus::Pending => ("TODO ", Style::default().fg(Color::Blue)),
        TaskStatus::InProgress => ("DOING", Style::default().fg(Color::Yellow)),
        TaskStatus::Completed => ("DONE ", Style::default().fg(Color::Green)),
        TaskStatus::Cancelled => ("DROP ", Style::default().fg(Color::DarkGray)),
    }
}

fn priority_style(priority: TaskPriority) -> Style {
    match priority {
        TaskPriority::Urgent => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        TaskPriority::High => Style::default().fg(Color::LightRed),
        TaskPriority::Medium => Style::default().fg(Color::Cyan),
        TaskPriority::Low => Style::default().fg(Color::Gray),
    }
}

fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(format!(" {} ", key), Style::default().fg(Color::Red)),
        Span::raw(format!(": {} ", label)),
    ]
}

fn get_legend(input_mode: &InputMode) -> Text<'static> {
    let hints: &[(&'static str, &'static str)] = match input_mode {
        InputMode::Normal => &[
            ("q", "Quit"),
            ("j/k", "Move"),
            ("/", "Search"),
            ("f", "Filter"),
            ("m", "Mine"),
            ("u", "Urgent"),
            ("o", "Overdue"),
            ("c", "Clear"),
            ("s/S", "Sort"),
            ("x", "Done"),
            ("p", "Start"),
            ("X", "Cancel"),
            ("R", "Reopen"),
            ("a", "Add"),
            ("r", "Reload"),
        ],
        InputMode::Search => &[("Enter", "Apply"), ("Esc", "Revert")],
        InputMode::Filter => &[("Enter", "Apply"), ("Esc", "Cancel")],
        InputMode::Editing => &[
            ("i", "Insert"),
            ("Tab", "Switch Field"),
            ("Enter", "Submit"),
            ("Esc", "Cancel"),
        ],
        InputMode::Insert => &[("Esc", "Done Typing")],
    };
    let spans: Vec<Span<'static>> = hints
        .iter()
        .flat_map(|&(key, label)| key_hint(key, label))
        .collect();
    Text::from(Line::from(spans))
}

fn header_line(app: &App) -> Line<'static> {
    let stats = app.view.stats();
    let sort = app.view.sort();
    let mut spans = vec![Span::styled(
        format!(" {} tasks ", stats.total),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for status in TaskStatus::ALL {
        let (label, style) = status_style(status);
        spans.push(Span::styled(
            format!(" {} {} ", label.trim(), stats.count(status)),
            style,
        ));
    }
    spans.push(Span::raw(format!(
        "  filters: {}  sort: {} ",
        app.view.active_filter_count(),
        sort
    )));
    if let Some(search) = app.view.pending_search() {
        spans.push(Span::styled(
            format!(" searching \"{}\"… ", search),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn task_item<'a>(app: &'a App, task: &'a TaskRecord) -> ListItem<'a> {
    let (label, style) = status_style(task.status);
    let project = app.project(&task.project_id);
    let project_style = project
        .and_then(|p| p.color.as_deref())
        .and_then(|c| c.parse::<Color>().ok())
        .map(|c| Style::default().fg(c))
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(label, style),
        Span::raw(" "),
        Span::styled(format!("{:<6}", task.priority.as_str()), priority_style(task.priority)),
        Span::raw(" "),
        Span::raw(task.title.as_str()),
        Span::raw("  "),
        Span::styled(app.project_name(&task.project_id), project_style),
    ];
    if let Some(due) = task.due_date {
        spans.push(Span::styled(
            format!("  {}", due),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn detail_lines(app: &App, task: &TaskRecord, width: u16) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(name, bold), Span::raw(value)])
    };

    let mut lines: Vec<Line<'static>> = vec![
        Line::from(Span::styled(task.title.clone(), bold)),
        Line::default(),
        field("Status: ", task.status.to_string()),
        field("Priority: ", task.priority.to_string()),
        field(
            "Due Date: ",
            task.due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "No due date".to_string()),
        ),
        field(
            "Assignee: ",
            task.assigned_to.clone().unwrap_or_else(|| "Unassigned".to_string()),
        ),
        field("Project: ", app.project_name(&task.project_id).to_string()),
        field("Updated: ", task.updated_at.format("%Y-%m-%d %H:%M").to_string()),
        Line::default(),
        Line::from(Span::styled("Description: ", bold)),
    ];

    match task.description.as_deref().map(str::trim) {
        Some(desc) if !desc.is_empty() && desc != "<p></p>" => {
            let width = width.saturating_sub(2).max(10) as usize;
            let ansi_text = html2text::from_read(desc.as_bytes(), width);
            lines.append(&mut ansi_to_text(&ansi_text));
        }
        _ => lines.push(Line::from(Span::raw("No description".to_string()))),
    }
    lines
}

fn draw_prompt(f: &mut Frame, area: Rect, title: &str, text: &str) {
    let popup_width = percent_of(area.width, 60).max(20);
    let popup_area = centered_rect_absolute(popup_width, 3, area);
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));
    let input = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::White))
        .block(block);
    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

fn draw_task_form(f: &mut Frame, app: &App, area: Rect) {
    let popup_width = percent_of(area.width, 60).max(30);
    let popup_area = centered_rect_absolute(popup_width, 8, area);
    f.render_widget(Clear, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)].as_ref())
        .split(popup_area);

    let style_for = |input: ActiveInput| {
        if app.active_input == input {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let title = Paragraph::new(app.new_task_title.as_str())
        .block(
            Block::default()
                .title("New Task (!priority due:YYYY-MM-DD)")
                .borders(Borders::ALL)
                .style(style_for(ActiveInput::Title)),
        )
        .wrap(Wrap { trim: false });
    let description = Paragraph::new(app.new_task_description.as_str())
        .block(
            Block::default()
                .title("Description")
                .borders(Borders::ALL)
                .style(style_for(ActiveInput::Description)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(title, chunks[0]);
    f.render_widget(description, chunks[1]);
}

fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(size);

    let header_chunk = chunks[0];
    let body_chunk = chunks[1];
    let footer_chunk = chunks[2];

    f.render_widget(Paragraph::new(header_line(app)), header_chunk);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(body_chunk);

    let list_title = format!(
        "Tasks ({}/{})",
        app.view.visible().len(),
        app.view.tasks().len()
    );
    let list_block = Block::default().borders(Borders::ALL).title(list_title);

    match &app.load_state {
        LoadState::Loading => {
            let placeholder = Paragraph::new("Loading tasks…")
                .block(list_block)
                .alignment(Alignment::Center);
            f.render_widget(placeholder, panes[0]);
        }
        LoadState::Failed(err) => {
            let text = format!("Could not load tasks: {}\n\nPress r to retry.", err);
            let paragraph = Paragraph::new(text)
                .block(list_block)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, panes[0]);
        }
        LoadState::Ready => {
            let tasks_widget = if app.view.visible().is_empty() {
                List::new(vec![ListItem::new("No tasks match the current filters")])
                    .block(list_block)
            } else {
                let items: Vec<ListItem> = app
                    .view
                    .visible()
                    .iter()
                    .map(|task| task_item(app, task))
                    .collect();
                List::new(items)
                    .block(list_block)
                    .highlight_style(
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD),
                    )
                    .highlight_symbol(">> ")
            };
            let mut state = app.state.clone();
            f.render_stateful_widget(tasks_widget, panes[0], &mut state);
            *app.state.offset_mut() = state.offset();
        }
    }

    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let detail = match app.selected_task() {
        Some(task) => Paragraph::new(detail_lines(app, task, panes[1].width)),
        None => Paragraph::new("No task selected"),
    };
    f.render_widget(detail.block(detail_block).wrap(Wrap { trim: true }), panes[1]);

    match app.input_mode {
        InputMode::Search => draw_prompt(f, body_chunk, "Search", &app.search_input),
        InputMode::Filter => draw_prompt(
            f,
            body_chunk,
            "Filter (status: priority: project: assignee: due:A..B)",
            &app.filter_input,
        ),
        InputMode::Editing | InputMode::Insert => draw_task_form(f, app, body_chunk),
        InputMode::Normal => {}
    }

    let mut footer = get_legend(&app.input_mode);
    if let Some(message) = &app.message {
        footer.push_line(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    let legend = Paragraph::new(footer)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, footer_chunk);
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if app.load_state == LoadState::Loading {
            app.reload().await;
            continue;
        }

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_input(key).await {
                    return Ok(());
                }
            }
        }
        app.tick(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_width_on_wide_terminals() {
        assert_eq!(percent_of(80, 60), 48);
        assert_eq!(percent_of(2000, 60), 1200);
        assert_eq!(percent_of(u16::MAX, 60), 39321);
    }

    #[test]
    fn test_centered_popup_fits_area() {
        let area = Rect::new(0, 0, 3000, 20);
        let popup = centered_rect_absolute(percent_of(area.width, 60), 3, area);
        assert_eq!(popup.width, 1800);
        assert_eq!(popup.height, 3);
        assert_eq!(popup.x, 600);
        assert_eq!(popup.y, 8);
    }
}
