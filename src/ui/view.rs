use std::time::Instant;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::filter::counts;
use crate::shell::Route;
use crate::task::{Priority, StatusFilter, Task, DUE_DATE_FORMAT};
use crate::views::View;

use super::app::{AppState, InputMode, StatusKind};
use super::form::{field_value, FormEditor, FormField};

const CHECK_WIDTH: usize = 3;
const PRIORITY_WIDTH: usize = 6;
const DUE_WIDTH: usize = 10;
const FORM_LABEL_WIDTH: usize = 10;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);

pub fn render(frame: &mut Frame, app: &AppState, now: Instant) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);
    let tabs = chunks[0];
    let main = chunks[1];
    let footer = chunks[2];

    render_tabs(frame, app, tabs);

    let displayed = app.shell.displayed_route(now);
    let offset = app.shell.transition().offset(main.width, now);
    if let Some(body) = slide_rect(main, offset) {
        match displayed {
            Route::Welcome => render_welcome(frame, app, body),
            Route::TaskList => render_task_list(frame, app, body),
            Route::Completed => render_completed(frame, app, body),
        }
    }

    render_footer(frame, app, footer);

    if let InputMode::Form(editor) = &app.mode {
        if displayed == Route::TaskList {
            render_form_modal(frame, area, app, editor);
        }
    }
}

/// Part of `area` still covered by a body shifted `offset` cells sideways.
fn slide_rect(area: Rect, offset: i32) -> Option<Rect> {
    let shift = offset.unsigned_abs().min(u32::from(area.width)) as u16;
    let width = area.width - shift;
    if width == 0 {
        return None;
    }
    let x = if offset > 0 { area.x + shift } else { area.x };
    Some(Rect::new(x, area.y, width, area.height))
}

fn render_tabs(frame: &mut Frame, app: &AppState, area: Rect) {
    let current = app.shell.route();
    let tabs = [
        (Route::Welcome, None, COLOR_INFO),
        (
            Route::TaskList,
            Some(app.shell.todo_list.tasks().len()),
            COLOR_ACCENT,
        ),
        (
            Route::Completed,
            Some(app.shell.completed.tasks().len()),
            COLOR_SUCCESS,
        ),
    ];

    let mut spans = Vec::new();
    for (idx, (route, count, color)) in tabs.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  ", Style::default().fg(COLOR_MUTED_DARK)));
        }
        let text = match count {
            Some(count) if app.shell.view(route).is_mounted() => {
                format!("{} {} ({count})", idx + 1, route.title())
            }
            _ => format!("{} {}", idx + 1, route.title()),
        };
        let style = if route == current {
            Style::default()
                .fg(color)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(COLOR_MUTED)
        };
        spans.push(Span::styled(text, style));
    }

    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(COLOR_BG_MUTED)),
    );
    frame.render_widget(widget, area);
}

fn render_welcome(frame: &mut Frame, app: &AppState, area: Rect) {
    let welcome = &app.shell.welcome;
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Welcome to TaskFlow",
            Style::default()
                .fg(COLOR_TEXT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            welcome.formatted_date(),
            Style::default().fg(COLOR_MUTED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Completed: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                welcome.completed_count().to_string(),
                Style::default()
                    .fg(COLOR_SUCCESS)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Press enter to get started",
            Style::default().fg(COLOR_INFO),
        )),
    ];

    if welcome.menu_open() {
        let width = area.width.saturating_sub(2) as usize;
        lines.push(Line::from(""));
        lines.push(help_line("s", "Tasks", width));
        lines.push(help_line("c", "Completed", width));
        lines.push(help_line("m", "Close menu", width));
        lines.push(help_line("q", "Quit", width));
    }

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("TaskFlow")
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

fn render_task_list(frame: &mut Frame, app: &AppState, area: Rect) {
    let todo = &app.shell.todo_list;
    let content_width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();

    let search_label = match (&app.mode, todo.search()) {
        (InputMode::Search, term) => format!("search: {term}_"),
        (_, "") => "search:".to_string(),
        (_, term) => format!("search: {term}"),
    };
    let tally = counts(todo.tasks());
    let mut header = vec![
        Span::styled(search_label, Style::default().fg(COLOR_INFO)),
        Span::raw("  "),
    ];
    for (idx, filter) in StatusFilter::ALL.into_iter().enumerate() {
        if idx > 0 {
            header.push(Span::raw(" "));
        }
        let text = format!("{} ({})", filter.label(), tally.get(filter));
        let style = if filter == todo.filter() {
            Style::default()
                .fg(COLOR_WARNING)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(COLOR_MUTED)
        };
        header.push(Span::styled(text, style));
    }
    if todo.loading() {
        header.push(Span::raw("  "));
        header.push(Span::styled("saving...", Style::default().fg(COLOR_MUTED_DARK)));
    }
    lines.push(Line::from(header));
    lines.push(Line::from(""));

    let visible = todo.visible();
    if !todo.loaded() {
        lines.push(Line::from(Span::styled(
            "Loading...",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    } else if visible.is_empty() {
        let message = if todo.search().is_empty() && todo.filter() == StatusFilter::All {
            "No tasks yet. Press n to add one."
        } else {
            "No matches"
        };
        lines.push(Line::from(message));
    } else {
        let list_height = area
            .height
            .saturating_sub(2)
            .saturating_sub(lines.len() as u16) as usize;
        let (start, end) = list_window(visible.len(), Some(app.task_selected), list_height);
        for (pos, task) in visible.iter().enumerate().take(end).skip(start) {
            lines.push(render_task_row(task, pos == app.task_selected, content_width));
        }
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Tasks")
            .border_style(Style::default().fg(COLOR_BORDER_LIST)),
    );
    frame.render_widget(widget, area);
}

fn render_completed(frame: &mut Frame, app: &AppState, area: Rect) {
    let completed = &app.shell.completed;
    let content_width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();

    let tasks = completed.tasks();
    if !completed.loaded() {
        lines.push(Line::from(Span::styled(
            "Loading...",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    } else if tasks.is_empty() {
        lines.push(Line::from("No completed tasks"));
    } else {
        let list_height = area.height.saturating_sub(2) as usize;
        let (start, end) = list_window(tasks.len(), Some(app.completed_selected), list_height);
        for (pos, task) in tasks.iter().enumerate().take(end).skip(start) {
            lines.push(render_task_row(
                task,
                pos == app.completed_selected,
                content_width,
            ));
        }
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Completed ({})", tasks.len()))
            .border_style(Style::default().fg(COLOR_SUCCESS)),
    );
    frame.render_widget(widget, area);
}

fn render_task_row(task: &Task, selected: bool, width: usize) -> Line<'static> {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let due = task
        .due_date
        .map(|date| date.format(DUE_DATE_FORMAT).to_string())
        .unwrap_or_default();
    let category = task
        .category
        .as_deref()
        .map(|value| format!("  #{value}"))
        .unwrap_or_default();
    let used = CHECK_WIDTH + PRIORITY_WIDTH + DUE_WIDTH + 4;
    let text_width = width.saturating_sub(used + category.chars().count());
    let text_style = if task.completed {
        Style::default()
            .fg(COLOR_MUTED_DARK)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(COLOR_TEXT)
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            check.to_string(),
            Style::default().fg(if task.completed {
                COLOR_SUCCESS
            } else {
                COLOR_MUTED
            }),
        ),
        Span::raw(" "),
        Span::styled(
            pad_text(task.priority.as_str(), PRIORITY_WIDTH),
            Style::default()
                .fg(priority_color(task.priority))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(pad_text(&due, DUE_WIDTH), Style::default().fg(COLOR_MUTED)),
        Span::raw(" "),
        Span::styled(truncate_text(&task.text, text_width), text_style),
        Span::styled(category, Style::default().fg(COLOR_ACCENT)),
    ];

    if selected {
        for span in &mut spans {
            span.style = span.style.add_modifier(Modifier::REVERSED);
        }
    }

    Line::from(spans)
}

fn render_form_modal(frame: &mut Frame, area: Rect, app: &AppState, editor: &FormEditor) {
    let form = &app.shell.todo_list.form;
    let width = 60u16.min(area.width.saturating_sub(4));
    let height = (FormField::ALL.len() as u16 + 6).min(area.height.saturating_sub(2));
    let modal = centered_rect(width, height, area);
    frame.render_widget(Clear, modal);

    let value_width = (width as usize).saturating_sub(FORM_LABEL_WIDTH + 4);
    let mut lines = Vec::new();
    for field in FormField::ALL {
        let active = editor.active() == field;
        let label_style = if active {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED_DARK)
        };
        let value = field_value(form, field);
        let value_span = if field == FormField::Priority {
            let text = format!("< {value} >");
            let style = Style::default()
                .fg(priority_color(form.priority))
                .add_modifier(Modifier::BOLD);
            Span::styled(text, if active { style.add_modifier(Modifier::REVERSED) } else { style })
        } else if value.is_empty() && !active {
            Span::styled(
                field.placeholder().to_string(),
                Style::default().fg(COLOR_MUTED_DARK),
            )
        } else {
            let shown = tail_text(&value, value_width.saturating_sub(1));
            let caret = if active { "_" } else { "" };
            Span::styled(format!("{shown}{caret}"), Style::default().fg(COLOR_TEXT))
        };
        lines.push(Line::from(vec![
            Span::styled(pad_text(field.label(), FORM_LABEL_WIDTH), label_style),
            Span::raw(" "),
            value_span,
        ]));
    }

    lines.push(Line::from(""));
    match app.shell.todo_list.error() {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        ))),
        None => lines.push(Line::from("")),
    }
    lines.push(Line::from(Span::styled(
        "enter next/submit  esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("New Task")
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, modal);
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint = app.footer_hint();
    let hint_span = Span::styled(hint, Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let counts_line = match footer_counts(app) {
        Some(text) => Line::from(Span::styled(text, Style::default().fg(COLOR_ACCENT))),
        None => Line::default(),
    };
    let widget = Paragraph::new(vec![line, counts_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

/// Tally for the mounted list; nothing on screens without live tasks.
fn footer_counts(app: &AppState) -> Option<String> {
    if app.shell.todo_list.is_mounted() {
        let tally = counts(app.shell.todo_list.tasks());
        return Some(format!(
            "{} tasks  {} active  {} completed",
            tally.all, tally.active, tally.completed
        ));
    }
    if app.shell.completed.is_mounted() {
        return Some(format!("{} completed", app.shell.completed.tasks().len()));
    }
    None
}

fn help_line(keys: &str, desc: &str, width: usize) -> Line<'static> {
    let key_width = 6usize.min(width);
    Line::from(vec![
        Span::styled(
            pad_text(keys, key_width),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            truncate_text(desc, width.saturating_sub(key_width + 1)),
            Style::default().fg(COLOR_MUTED),
        ),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => COLOR_ERROR,
        Priority::Medium => COLOR_WARNING,
        Priority::Low => COLOR_INFO,
    }
}

fn pad_text(value: &str, width: usize) -> String {
    let text = truncate_text(value, width);
    let len = text.chars().count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

/// Last `max` characters, so the caret end of a long input stays visible
fn tail_text(value: &str, max: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let start = chars.len().saturating_sub(max);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::TaskRepository;
    use crate::shell::Shell;
    use crate::store::MemoryStore;
    use crate::task::NewTask;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn list_window_follows_selection() {
        assert_eq!(list_window(0, None, 5), (0, 0));
        assert_eq!(list_window(3, Some(2), 5), (0, 3));
        assert_eq!(list_window(20, Some(10), 5), (8, 13));
        assert_eq!(list_window(20, Some(19), 5), (15, 20));
    }

    #[test]
    fn slide_rect_shrinks_toward_the_moving_edge() {
        let area = Rect::new(0, 1, 80, 20);
        assert_eq!(slide_rect(area, 0), Some(area));
        assert_eq!(slide_rect(area, -30), Some(Rect::new(0, 1, 50, 20)));
        assert_eq!(slide_rect(area, 30), Some(Rect::new(30, 1, 50, 20)));
        assert_eq!(slide_rect(area, -80), None);
    }

    #[tokio::test]
    async fn footer_counts_follow_the_mounted_view() {
        let store = Arc::new(MemoryStore::new());
        let repo = TaskRepository::new(store);
        repo.add(NewTask::new("open")).await.expect("add");
        let mut shell = Shell::new(repo, Priority::Medium, Duration::ZERO);
        shell.start(Route::TaskList);
        let mut app = AppState::new(shell, Duration::from_millis(120));
        app.shell.todo_list.next_update().await;
        assert_eq!(
            footer_counts(&app).as_deref(),
            Some("1 tasks  1 active  0 completed")
        );

        app.shell.navigate(Route::Completed);
        assert_eq!(footer_counts(&app).as_deref(), Some("0 completed"));

        app.shell.navigate(Route::Welcome);
        assert_eq!(footer_counts(&app), None);
    }

    #[test]
    fn text_helpers_respect_width() {
        assert_eq!(truncate_text("groceries", 6), "gro...");
        assert_eq!(pad_text("low", 6), "low   ");
        assert_eq!(tail_text("2026-10-21", 5), "10-21");
    }
}
