// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use alarmdesk_app::{
    AppMode, AppState, Endpoint, Incident, IncidentAction, IncidentState, PickerDate, ScreenKind,
    User, month_name,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::collections::BTreeSet;

use crate::{DetailUiState, PickerUiState, ViewData, visible_incidents};

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

pub(crate) fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = ScreenKind::ALL
        .iter()
        .position(|screen| *screen == state.screen)
        .unwrap_or(0);
    let titles = ScreenKind::ALL
        .iter()
        .map(|screen| screen_title(*screen, state))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("alarmdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[2]);

    if let Some(picker) = &view_data.picker {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(picker_overlay_lines(picker)).block(
            Block::default()
                .title("history range")
                .borders(Borders::ALL),
        );
        frame.render_widget(widget, area);
    }

    if let Some(detail) = &view_data.detail {
        let area = centered_rect(80, 70, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(detail_overlay_text(detail))
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(detail.scroll).unwrap_or(u16::MAX), 0))
            .block(
                Block::default()
                    .title(format!("incident {}", detail.incident.id))
                    .borders(Borders::ALL),
            );
        frame.render_widget(widget, area);
    }

    if let Some(action) = &view_data.pending_action {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(action_prompt_text(action, &view_data.incidents))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(action.kind().label())
                    .borders(Borders::ALL),
            );
        frame.render_widget(widget, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn screen_title(screen: ScreenKind, state: &AppState) -> String {
    match screen {
        ScreenKind::Active => screen.label().to_owned(),
        ScreenKind::History => format!("{} ({})", screen.label(), state.history_range),
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let visible = visible_incidents(state, view_data);
    let title = if state.query.is_empty() {
        format!("{} incidents", visible.len())
    } else {
        format!(
            "{} of {} incidents match {:?}",
            visible.len(),
            view_data.incidents.len(),
            state.query
        )
    };

    let headers = column_headers(view_data.show_calls);
    let widths = headers
        .iter()
        .map(|header| match *header {
            "" => Constraint::Length(1),
            "pri" => Constraint::Length(3),
            "state" => Constraint::Length(12),
            "case" => Constraint::Length(6),
            "created" => Constraint::Length(13),
            _ => Constraint::Min(10),
        })
        .collect::<Vec<_>>();
    let header = Row::new(headers.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = visible.iter().enumerate().map(|(index, incident)| {
        let marked = view_data.marked.contains(&incident.id);
        let state_color = match incident.state() {
            IncidentState::Error => Color::Red,
            IncidentState::Acknowledged => Color::Yellow,
            IncidentState::Resolved => Color::Green,
        };
        let mut row_style = Style::default();
        if index == view_data.cursor {
            row_style = row_style.bg(Color::DarkGray);
        }
        let cells = incident_cells(incident, marked, view_data.show_calls)
            .into_iter()
            .enumerate()
            .map(|(column, text)| {
                let cell = Cell::from(text);
                if column == 2 {
                    cell.style(Style::default().fg(state_color))
                } else {
                    cell
                }
            })
            .collect::<Vec<_>>();
        Row::new(cells).style(row_style)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn column_headers(show_calls: bool) -> Vec<&'static str> {
    let mut headers = vec!["", "pri", "state", "company", "case", "assigned"];
    if show_calls {
        headers.push("called");
    }
    headers.push("created");
    headers
}

pub(crate) fn incident_cells(incident: &Incident, marked: bool, show_calls: bool) -> Vec<String> {
    let mut cells = vec![
        (if marked { "*" } else { "" }).to_owned(),
        format!("P{}", incident.priority),
        incident.state().as_str().to_owned(),
        incident.company_public.name.clone(),
        incident
            .case_number
            .map(|case| case.to_string())
            .unwrap_or_else(|| "-".to_owned()),
        user_names(&incident.users),
    ];
    if show_calls {
        cells.push(user_names(&incident.calls));
    }
    cells.push(format_created(incident));
    cells
}

fn user_names(users: &[User]) -> String {
    if users.is_empty() {
        return "-".to_owned();
    }
    let names = users.iter().map(User::display_name).collect::<BTreeSet<_>>();
    names.into_iter().collect::<Vec<_>>().join(", ")
}

fn format_created(incident: &Incident) -> String {
    let created = incident.created_at;
    format!(
        "{} {:02}:{:02}",
        short_date(incident.created_on()),
        created.hour(),
        created.minute()
    )
}

fn short_date(date: PickerDate) -> String {
    format!(
        "{:>2} {}",
        date.day,
        alarmdesk_app::month_abbreviation(date.month)
    )
}

pub(crate) fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }

    let (mode, hints) = match state.mode {
        AppMode::Nav if view_data.detail.is_some() => ("NAV", "j/k scroll | esc close"),
        AppMode::Nav => (
            "NAV",
            "j/k move | b/f screen | / search | a ack | r resolve | space mark | m merge | enter alarms | d range | ? help | ctrl+q",
        ),
        AppMode::Search => ("SEARCH", "enter keep | esc restore"),
        AppMode::Picker => ("RANGE", "c confirm | esc cancel"),
        AppMode::Action(_) => ("CONFIRM", "y apply | n cancel"),
    };

    let mut parts = vec![mode.to_owned()];
    if state.mode == AppMode::Search {
        parts.push(format!("/{}_", state.query));
    } else if !state.query.is_empty() {
        parts.push(format!("filter: {}", state.query));
    }
    if !view_data.marked.is_empty() {
        parts.push(format!("{} marked", view_data.marked.len()));
    }
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    parts.push(hints.to_owned());
    parts.join(" | ")
}

pub(crate) fn picker_overlay_lines(ui: &PickerUiState) -> Vec<Line<'static>> {
    let (year, month) = ui.picker.view();
    let endpoint_line = |endpoint: Endpoint, date: PickerDate| {
        let marker = if ui.picker.active() == endpoint {
            ">"
        } else {
            " "
        };
        Line::from(format!("{marker} {:<5} {date}", endpoint.label()))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} {year}", month_name(month)),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        endpoint_line(Endpoint::Start, ui.picker.start()),
        endpoint_line(Endpoint::End, ui.picker.end()),
        Line::from(""),
        Line::from(
            WEEKDAYS
                .iter()
                .map(|day| format!(" {day} "))
                .collect::<String>(),
        ),
    ];

    for week in ui.picker.month_grid() {
        if week.iter().all(Option::is_none) {
            continue;
        }
        let spans = week
            .iter()
            .map(|cell| match cell {
                None => Span::raw("    "),
                Some(day) => {
                    let date = PickerDate::new(*day, month, year);
                    let text = if date == ui.cursor {
                        format!("[{day:>2}]")
                    } else {
                        format!(" {day:>2} ")
                    };
                    Span::styled(text, day_style(ui, date))
                }
            })
            .collect::<Vec<_>>();
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from("h/l day | j/k week | H/L month | tab endpoint"));
    lines.push(Line::from("enter pick | c confirm | esc cancel"));
    lines
}

fn day_style(ui: &PickerUiState, date: PickerDate) -> Style {
    let mut style = Style::default();
    if ui.picker.in_range(date) {
        style = style.bg(Color::Blue);
    }
    if date == ui.picker.start() || date == ui.picker.end() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if !date.is_on_or_before(&ui.today) {
        style = style.fg(Color::DarkGray);
    }
    if date == ui.cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

pub(crate) fn detail_overlay_text(detail: &DetailUiState) -> String {
    let incident = &detail.incident;
    let case = incident
        .case_number
        .map(|case| format!("case {case}"))
        .unwrap_or_else(|| "no case".to_owned());
    let resolved = incident
        .resolved_at
        .map(|at| {
            format!(
                "{} {:02}:{:02}",
                PickerDate::from(at.date()),
                at.hour(),
                at.minute()
            )
        })
        .unwrap_or_else(|| "-".to_owned());

    let mut lines = vec![
        format!(
            "P{} | {} | {}",
            incident.priority,
            incident.state().as_str(),
            case
        ),
        format!(
            "company: {} ({})",
            incident.company_public.name, incident.company_public.id
        ),
        format!(
            "created: {} | resolved: {resolved}",
            format_created(incident).trim_start()
        ),
        format!("assigned: {}", user_details(&incident.users)),
        format!("called: {}", user_details(&incident.calls)),
        String::new(),
        format!("alarms ({}):", detail.alarms.len()),
    ];
    if detail.alarms.is_empty() {
        lines.push("  (none)".to_owned());
    }
    for alarm in &detail.alarms {
        lines.push(format!(
            "  {:02}:{:02}  {:<12} {}",
            alarm.created_at.hour(),
            alarm.created_at.minute(),
            alarm.service,
            alarm.message
        ));
    }
    lines.join("\n")
}

fn user_details(users: &[User]) -> String {
    if users.is_empty() {
        return "-".to_owned();
    }
    users
        .iter()
        .map(|user| {
            let mut text = user.display_name().to_owned();
            if let Some(team) = &user.team {
                text.push_str(&format!(" ({team})"));
            }
            if let Some(phone) = &user.phone {
                text.push_str(&format!(" {phone}"));
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn action_prompt_text(action: &IncidentAction, incidents: &[Incident]) -> String {
    let label = |id| {
        incidents
            .iter()
            .find(|incident| incident.id == id)
            .map(|incident| match incident.case_number {
                Some(case) => format!("{id} ({} #{case})", incident.company_public.name),
                None => format!("{id} ({})", incident.company_public.name),
            })
            .unwrap_or_else(|| id.to_string())
    };

    let question = match action {
        IncidentAction::Acknowledge { incident } => {
            format!("acknowledge incident {}?", label(*incident))
        }
        IncidentAction::Resolve { incident } => {
            format!("resolve incident {}?", label(*incident))
        }
        IncidentAction::Merge { target, sources } => {
            let sources = sources
                .iter()
                .map(|id| label(*id))
                .collect::<Vec<_>>()
                .join(", ");
            format!("merge {sources} into {}?", label(*target))
        }
    };
    format!("{question}\n\ny apply | n cancel")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
nav: j/k move | g/G top/bottom | b/f or shift+tab/tab screen | R reload\n\
nav: / search | enter alarms | c toggle called column\n\
actions: a acknowledge | r resolve | space mark | m merge marked into selected | esc clear marks\n\
confirm: y or enter apply | n or esc cancel\n\
search: type to filter | backspace | enter keep | esc restore\n\
range (history): d open | h/l day | j/k week | H/L month | tab endpoint | enter pick | c confirm | esc cancel\n\
alarms: j/k scroll | esc close"
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
