// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod render;

use alarmdesk_app::{
    ActionKind, Alarm, AppCommand, AppEvent, AppMode, AppState, DateRange, DateRangePicker,
    Endpoint, Incident, IncidentAction, IncidentId, PickerDate, ScreenKind, filter_sorted,
};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);

/// Everything the UI needs from the outside world. The CLI provides one
/// backed by the incident API and one backed by generated demo data.
pub trait AppRuntime {
    fn load_incidents(&mut self, screen: ScreenKind, range: DateRange) -> Result<Vec<Incident>>;
    fn load_alarms(&mut self, incident: IncidentId) -> Result<Vec<Alarm>>;
    fn apply_action(&mut self, action: &IncidentAction) -> Result<()>;
    fn save_query(&mut self, query: &str) -> Result<()>;
    fn save_history_range(&mut self, range: DateRange) -> Result<()>;
    fn show_calls(&mut self) -> Result<bool> {
        Ok(true)
    }
    fn save_show_calls(&mut self, _show: bool) -> Result<()> {
        Ok(())
    }
    /// Local date used by the picker. Implementations read the clock with an
    /// offset captured before any thread started.
    fn today(&mut self) -> PickerDate;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PickerUiState {
    picker: DateRangePicker,
    cursor: PickerDate,
    today: PickerDate,
}

impl PickerUiState {
    fn new(range: DateRange, today: PickerDate) -> Self {
        let mut picker = DateRangePicker::from_range(range);
        picker.set_active(Endpoint::Start);
        Self {
            cursor: picker.start(),
            picker,
            today,
        }
    }

    fn move_cursor_days(&mut self, days: i64) {
        let next = self
            .cursor
            .to_date()
            .and_then(|date| date.checked_add(time::Duration::days(days)));
        if let Some(next) = next {
            self.cursor = PickerDate::from(next);
            self.picker.show_month(self.cursor.year, self.cursor.month);
        }
    }

    fn move_cursor_months(&mut self, forward: bool) {
        self.picker.show_month(self.cursor.year, self.cursor.month);
        if forward {
            self.picker.next_month();
        } else {
            self.picker.prev_month();
        }
        let (year, month) = self.picker.view();
        self.cursor = PickerDate::clamped(u32::from(self.cursor.day), u32::from(month), year);
    }

    fn toggle_endpoint(&mut self) {
        self.picker.toggle_active();
        self.cursor = match self.picker.active() {
            Endpoint::Start => self.picker.start(),
            Endpoint::End => self.picker.end(),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DetailUiState {
    incident: Incident,
    alarms: Vec<Alarm>,
    scroll: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    incidents: Vec<Incident>,
    cursor: usize,
    marked: BTreeSet<IncidentId>,
    query_before_search: String,
    picker: Option<PickerUiState>,
    detail: Option<DetailUiState>,
    pending_action: Option<IncidentAction>,
    help_visible: bool,
    show_calls: bool,
    status_token: u64,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            incidents: Vec::new(),
            cursor: 0,
            marked: BTreeSet::new(),
            query_before_search: String::new(),
            picker: None,
            detail: None,
            pending_action: None,
            help_visible: false,
            show_calls: true,
            status_token: 0,
        }
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    match runtime.show_calls() {
        Ok(show) => view_data.show_calls = show,
        Err(error) => warn!(%error, "read show-calls preference"),
    }
    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        emit_status(
            state,
            &mut view_data,
            &internal_tx,
            format!("load failed: {error:#}"),
        );
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render::render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    match state.mode {
        AppMode::Picker => handle_picker_key(state, runtime, view_data, internal_tx, key),
        AppMode::Search => handle_search_key(state, runtime, view_data, internal_tx, key),
        AppMode::Action(_) => handle_action_key(state, runtime, view_data, internal_tx, key),
        AppMode::Nav if view_data.detail.is_some() => handle_detail_key(view_data, key),
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('f'), KeyModifiers::NONE) | (KeyCode::Tab, _) => {
            switch_screen(state, runtime, view_data, internal_tx, AppCommand::NextScreen);
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::BackTab, _) => {
            switch_screen(state, runtime, view_data, internal_tx, AppCommand::PrevScreen);
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => move_cursor(state, view_data, 1),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => move_cursor(state, view_data, -1),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => view_data.cursor = 0,
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => {
            view_data.cursor = visible_incidents(state, view_data).len().saturating_sub(1);
        }
        (KeyCode::Char('/'), _) => {
            view_data.query_before_search = state.query.clone();
            dispatch(state, view_data, internal_tx, AppCommand::EnterSearch);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            begin_action(state, runtime, view_data, internal_tx, ActionKind::Acknowledge);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            begin_action(state, runtime, view_data, internal_tx, ActionKind::Resolve);
        }
        (KeyCode::Char('m'), KeyModifiers::NONE) => {
            begin_action(state, runtime, view_data, internal_tx, ActionKind::Merge);
        }
        (KeyCode::Char(' '), _) => toggle_mark(state, view_data, internal_tx),
        (KeyCode::Enter, _) => open_detail(state, runtime, view_data, internal_tx),
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            open_picker(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => {
            toggle_calls(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('R'), _) => match refresh_view_data(state, runtime, view_data) {
            Ok(()) => {
                let count = visible_incidents(state, view_data).len();
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("refreshed {count} incidents"),
                );
            }
            Err(error) => emit_status(
                state,
                view_data,
                internal_tx,
                format!("load failed: {error:#}"),
            ),
        },
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Esc, _) if !view_data.marked.is_empty() => {
            view_data.marked.clear();
            emit_status(state, view_data, internal_tx, "merge marks cleared");
        }
        _ => {}
    }
}

fn handle_search_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            let previous = std::mem::take(&mut view_data.query_before_search);
            set_query(state, view_data, previous);
            dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
        }
        KeyCode::Enter => {
            dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
            if let Err(error) = runtime.save_query(&state.query) {
                warn!(%error, "save query");
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("save search failed: {error:#}"),
                );
            }
        }
        KeyCode::Backspace => {
            let mut query = state.query.clone();
            query.pop();
            set_query(state, view_data, query);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut query = state.query.clone();
            query.push(ch);
            set_query(state, view_data, query);
        }
        _ => {}
    }
}

fn set_query(state: &mut AppState, view_data: &mut ViewData, query: String) {
    let events = state.dispatch(AppCommand::SetQuery(query));
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::QueryChanged(_)))
    {
        view_data.cursor = 0;
    }
}

fn handle_action_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
            let Some(action) = view_data.pending_action.take() else {
                return;
            };
            match runtime.apply_action(&action) {
                Ok(()) => {
                    info!(action = action.kind().label(), incident = %action.incident(), "action applied");
                    if matches!(action, IncidentAction::Merge { .. }) {
                        view_data.marked.clear();
                    }
                    let message = match refresh_view_data(state, runtime, view_data) {
                        Ok(()) => action.describe(),
                        Err(error) => format!("{}; reload failed: {error:#}", action.describe()),
                    };
                    emit_status(state, view_data, internal_tx, message);
                }
                Err(error) => {
                    warn!(action = action.kind().label(), %error, "action failed");
                    emit_status(
                        state,
                        view_data,
                        internal_tx,
                        format!("{} failed: {error:#}", action.kind().label()),
                    );
                }
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            let label = view_data
                .pending_action
                .take()
                .map_or("action", |action| action.kind().label());
            dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, format!("{label} canceled"));
        }
        _ => {}
    }
}

fn begin_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ActionKind,
) {
    let Some(selected) = selected_incident_id(state, view_data) else {
        emit_status(state, view_data, internal_tx, "no incident selected");
        return;
    };
    let action = match kind {
        ActionKind::Acknowledge => IncidentAction::Acknowledge { incident: selected },
        ActionKind::Resolve => IncidentAction::Resolve { incident: selected },
        ActionKind::Merge => {
            // Marks hidden by the current filter stay marked but are not merged.
            let visible: BTreeSet<IncidentId> = visible_incidents(state, view_data)
                .iter()
                .map(|incident| incident.id)
                .collect();
            IncidentAction::Merge {
                target: selected,
                sources: view_data.marked.intersection(&visible).copied().collect(),
            }
        }
    };
    if let Err(error) = action.validate(&view_data.incidents) {
        emit_status(state, view_data, internal_tx, error.to_string());
        return;
    }

    view_data.pending_action = Some(action);
    dispatch_and_refresh(
        state,
        runtime,
        view_data,
        AppCommand::OpenAction(kind),
        internal_tx,
    );
}

fn toggle_mark(state: &mut AppState, view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    let Some(selected) = selected_incident_id(state, view_data) else {
        return;
    };
    if !view_data.marked.remove(&selected) {
        view_data.marked.insert(selected);
    }
    let count = view_data.marked.len();
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("{count} marked for merge"),
    );
}

fn toggle_calls<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    view_data.show_calls = !view_data.show_calls;
    let label = if view_data.show_calls {
        "called users shown"
    } else {
        "called users hidden"
    };
    match runtime.save_show_calls(view_data.show_calls) {
        Ok(()) => emit_status(state, view_data, internal_tx, label),
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("{label}; save failed: {error:#}"),
        ),
    }
}

fn open_detail<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(incident) = selected_incident(state, view_data).cloned() else {
        emit_status(state, view_data, internal_tx, "no incident selected");
        return;
    };
    match runtime.load_alarms(incident.id) {
        Ok(alarms) => {
            debug!(incident = %incident.id, alarms = alarms.len(), "opened incident detail");
            view_data.detail = Some(DetailUiState {
                incident,
                alarms,
                scroll: 0,
            });
        }
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("load alarms failed: {error:#}"),
        ),
    }
}

fn handle_detail_key(view_data: &mut ViewData, key: KeyEvent) {
    let Some(detail) = view_data.detail.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => view_data.detail = None,
        KeyCode::Char('j') | KeyCode::Down => {
            detail.scroll = (detail.scroll + 1).min(detail.alarms.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => detail.scroll = detail.scroll.saturating_sub(1),
        _ => {}
    }
}

fn open_picker<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    dispatch(state, view_data, internal_tx, AppCommand::OpenPicker);
    if state.mode == AppMode::Picker {
        view_data.picker = Some(PickerUiState::new(state.history_range, runtime.today()));
    }
}

fn handle_picker_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(picker) = view_data.picker.as_mut() else {
        dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            view_data.picker = None;
            dispatch(state, view_data, internal_tx, AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "date range unchanged");
        }
        KeyCode::Char('h') | KeyCode::Left => picker.move_cursor_days(-1),
        KeyCode::Char('l') | KeyCode::Right => picker.move_cursor_days(1),
        KeyCode::Char('j') | KeyCode::Down => picker.move_cursor_days(7),
        KeyCode::Char('k') | KeyCode::Up => picker.move_cursor_days(-7),
        KeyCode::Char('H') => picker.move_cursor_months(false),
        KeyCode::Char('L') => picker.move_cursor_months(true),
        KeyCode::Tab => picker.toggle_endpoint(),
        KeyCode::Enter | KeyCode::Char(' ') => picker.picker.press(picker.cursor),
        KeyCode::Char('c') => {
            let range = picker.picker.confirm(picker.today);
            view_data.picker = None;
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::ApplyRange(range),
                internal_tx,
            );
            if let Err(error) = runtime.save_history_range(range) {
                warn!(%error, "save history range");
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("save range failed: {error:#}"),
                );
            }
        }
        _ => {}
    }
}

fn switch_screen<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    view_data.marked.clear();
    view_data.cursor = 0;
    dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
}

fn move_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let len = visible_incidents(state, view_data).len();
    if len == 0 {
        view_data.cursor = 0;
        return;
    }
    let next = view_data.cursor.saturating_add_signed(delta);
    view_data.cursor = next.min(len - 1);
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData) {
    let len = visible_incidents(state, view_data).len();
    view_data.cursor = view_data.cursor.min(len.saturating_sub(1));
}

/// Incidents on screen, in display order.
fn visible_incidents<'a>(state: &AppState, view_data: &'a ViewData) -> Vec<&'a Incident> {
    let mut visible = filter_sorted(&view_data.incidents, &state.query);
    match state.screen {
        ScreenKind::Active => visible.retain(|incident| !incident.resolved),
        ScreenKind::History => {
            visible.retain(|incident| incident.created_within(state.history_range));
        }
    }
    visible
}

fn selected_incident<'a>(state: &AppState, view_data: &'a ViewData) -> Option<&'a Incident> {
    visible_incidents(state, view_data)
        .get(view_data.cursor)
        .copied()
}

fn selected_incident_id(state: &AppState, view_data: &ViewData) -> Option<IncidentId> {
    selected_incident(state, view_data).map(|incident| incident.id)
}

fn dispatch(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) -> Vec<AppEvent> {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
    events
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = dispatch(state, view_data, internal_tx, command);
    if should_refresh_view(&events)
        && let Err(error) = refresh_view_data(state, runtime, view_data)
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error:#}"),
        );
    }
}

fn should_refresh_view(events: &[AppEvent]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            AppEvent::ScreenChanged(_) | AppEvent::RangeChanged(_)
        )
    })
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.incidents = runtime.load_incidents(state.screen, state.history_range)?;
    let known = view_data
        .incidents
        .iter()
        .map(|incident| incident.id)
        .collect::<BTreeSet<_>>();
    view_data.marked.retain(|id| known.contains(id));
    clamp_cursor(state, view_data);
    debug!(
        screen = state.screen.label(),
        count = view_data.incidents.len(),
        "loaded incidents"
    );
    Ok(())
}
