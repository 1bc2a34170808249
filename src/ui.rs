use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, SelectableList, TextView};
use crate::model::FocusPanel;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let namespace = match app.selection().namespace() {
        "" => "-",
        namespace => namespace,
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " kubenav ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" {} @ {} ", app.context(), app.cluster()),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns:{namespace} "),
        Color::White,
        PL_C,
        PL_D,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.selection().kind().title()),
        Color::White,
        PL_D,
        BG,
    );
    if let Some(refreshed) = app.last_refresh() {
        spans.push(Span::styled(
            format!(" refreshed {}", refreshed.format("%H:%M:%S")),
            Style::default().fg(MUTED).bg(BG),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(50),
        ])
        .split(rows[0]);

    let focus = app.focus();
    render_list(
        frame,
        lists[0],
        FocusPanel::Namespaces.title(),
        app.namespace_list(),
        focus == FocusPanel::Namespaces,
    );
    render_list(
        frame,
        lists[1],
        FocusPanel::Kinds.title(),
        app.kind_list(),
        focus == FocusPanel::Kinds,
    );
    render_list(
        frame,
        lists[2],
        &app.resource_panel_title(),
        app.resource_list(),
        focus == FocusPanel::Resources,
    );

    if app.log_view_visible() {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        render_text_view(frame, panes[0], app.detail_view_mut(), false);
        render_text_view(frame, panes[1], app.log_view_mut(), true);
    } else {
        render_text_view(frame, rows[1], app.detail_view_mut(), false);
    }
}

fn render_list(frame: &mut Frame, area: Rect, title: &str, list: &SelectableList, focused: bool) {
    let rows = list.rows().iter().map(|row| {
        Row::new(vec![
            Cell::from(row.label.clone()).style(Style::default().fg(Color::White)),
            Cell::from(row.detail.clone()).style(Style::default().fg(MUTED)),
        ])
    });

    let block = Block::default()
        .title(format!("{title} ({})", list.item_count()))
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL));

    let table = Table::new(
        rows,
        [Constraint::Percentage(60), Constraint::Percentage(40)],
    )
    .block(block)
    .column_spacing(1)
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(24, 36, 58))
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(list.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_text_view(frame: &mut Frame, area: Rect, view: &mut TextView, live: bool) {
    view.set_viewport(area.height.saturating_sub(2) as usize);
    let lines = view
        .visible_lines()
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect::<Vec<_>>();

    let title = if live && !view.is_following() {
        format!("{} [paused, f to follow]", view.title())
    } else {
        view.title().to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(PANEL));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let (text, fg, bg) = match app.pending_confirmation_prompt() {
        Some(prompt) => (format!("{prompt}? (y/n)"), Color::Black, WARN),
        None if status_reports_failure(app.status()) => {
            (app.status().to_string(), Color::Black, ERROR)
        }
        None => (app.status().to_string(), Color::White, PL_B),
    };

    let width_hint = area.width.saturating_sub(18).max(24) as usize;
    let mut spans = Vec::new();
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(&text, width_hint)),
        fg,
        bg,
        BG,
    );
    spans.push(Span::styled(
        " ? help  q quit",
        Style::default().fg(MUTED).bg(BG),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(64, 60, frame.area());
    frame.render_widget(Clear, area);

    let lines = [
        "kubenav help",
        "",
        "Tab / Shift+Tab   move focus between panels",
        "Up/Down  j/k      move the cursor",
        "PgUp/PgDn  g/G    page, jump to top or bottom",
        "Enter             open namespace, type, resource or container",
        "Esc               leave the container list and stop logs",
        "Shift+Up/Down     scroll details or logs, f resumes following",
        "r                 refresh namespaces and the current list",
        "Ctrl+D            delete the highlighted namespace or resource",
        "y / n             confirm or cancel a pending delete",
        "q                 quit",
    ]
    .into_iter()
    .map(Line::from)
    .collect::<Vec<_>>();

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn status_reports_failure(status: &str) -> bool {
    let status = status.to_ascii_lowercase();
    ["failed", "error", "not found", "forbidden", "no namespace selected"]
        .iter()
        .any(|needle| status.contains(needle))
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
