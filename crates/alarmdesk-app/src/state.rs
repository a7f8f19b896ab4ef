// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::calendar::{DateRange, today};
use crate::{ActionKind, AppMode, ScreenKind};

pub const DEFAULT_HISTORY_DAYS: u16 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub screen: ScreenKind,
    pub query: String,
    pub history_range: DateRange,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            ScreenKind::Active,
            DateRange::trailing_days(today(0), DEFAULT_HISTORY_DAYS),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    EnterSearch,
    ExitToNav,
    SetQuery(String),
    OpenPicker,
    ApplyRange(DateRange),
    OpenAction(ActionKind),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    QueryChanged(String),
    RangeChanged(DateRange),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(screen: ScreenKind, history_range: DateRange) -> Self {
        Self {
            mode: AppMode::Nav,
            screen,
            query: String::new(),
            history_range,
            status_line: None,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::EnterSearch => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetQuery(query) => {
                if query == self.query {
                    return Vec::new();
                }
                self.query = query;
                vec![AppEvent::QueryChanged(self.query.clone())]
            }
            AppCommand::OpenPicker => {
                if self.screen != ScreenKind::History {
                    return vec![self.set_status("date range applies to history only")];
                }
                self.mode = AppMode::Picker;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ApplyRange(range) => {
                self.history_range = range;
                self.mode = AppMode::Nav;
                vec![
                    AppEvent::RangeChanged(range),
                    AppEvent::ModeChanged(self.mode),
                    self.set_status(&format!("history {range}")),
                ]
            }
            AppCommand::OpenAction(kind) => {
                self.mode = AppMode::Action(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let screens = ScreenKind::ALL;
        let current = screens
            .iter()
            .position(|screen| *screen == self.screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.screen = screens[next];
        vec![AppEvent::ScreenChanged(self.screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
