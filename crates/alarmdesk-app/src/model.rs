// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::calendar::{DateRange, PickerDate};
use crate::ids::*;

/// Incident severity, 1 (most severe) through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(4);

    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= 4 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("priority must be 1-4, got {value}"))
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub team: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("?")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyPublic {
    pub id: CompanyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub priority: Priority,
    pub resolved: bool,
    pub users: Vec<User>,
    pub calls: Vec<User>,
    pub company_public: CompanyPublic,
    pub case_number: Option<i64>,
    pub created_at: OffsetDateTime,
    pub resolved_at: Option<OffsetDateTime>,
    pub alarm_count: usize,
}

impl Incident {
    pub fn state(&self) -> IncidentState {
        derive_state(self)
    }

    pub fn created_on(&self) -> PickerDate {
        PickerDate::from(self.created_at.date())
    }

    pub fn created_within(&self, range: DateRange) -> bool {
        range.contains(self.created_on())
    }
}

/// Display state of an incident. Never stored; always computed from the
/// resolution flag and the assigned users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentState {
    Error,
    Acknowledged,
    Resolved,
}

impl IncidentState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }
}

pub fn derive_state(incident: &Incident) -> IncidentState {
    if incident.resolved {
        IncidentState::Resolved
    } else if incident.users.is_empty() {
        IncidentState::Error
    } else {
        IncidentState::Acknowledged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub incident_id: IncidentId,
    pub service: String,
    pub message: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenKind {
    Active,
    History,
}

impl ScreenKind {
    pub const ALL: [Self; 2] = [Self::Active, Self::History];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::History => "history",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Acknowledge,
    Resolve,
    Merge,
}

impl ActionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Resolve => "resolve",
            Self::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Picker,
    Action(ActionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    SessionCookie,
    Username,
    LastQuery,
    HistoryRange,
    ShowCalls,
}

impl SettingKey {
    pub const ALL: [Self; 5] = [
        Self::SessionCookie,
        Self::Username,
        Self::LastQuery,
        Self::HistoryRange,
        Self::ShowCalls,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionCookie => "api.session_cookie",
            Self::Username => "api.username",
            Self::LastQuery => "ui.last_query",
            Self::HistoryRange => "ui.history_range",
            Self::ShowCalls => "ui.show_calls",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "api.session_cookie" => Some(Self::SessionCookie),
            "api.username" => Some(Self::Username),
            "ui.last_query" => Some(Self::LastQuery),
            "ui.history_range" => Some(Self::HistoryRange),
            "ui.show_calls" => Some(Self::ShowCalls),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SessionCookie => "session",
            Self::Username => "username",
            Self::LastQuery => "last search",
            Self::HistoryRange => "history range",
            Self::ShowCalls => "show called users",
        }
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::SessionCookie | Self::Username | Self::LastQuery => SettingValueKind::Text,
            Self::HistoryRange => SettingValueKind::Range,
            Self::ShowCalls => SettingValueKind::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValueKind {
    Bool,
    Text,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
    Range(DateRange),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(Self::Bool(true)),
                "0" | "false" | "off" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            SettingValueKind::Text => Some(Self::Text(raw.to_owned())),
            SettingValueKind::Range => {
                let (start, end) = raw.split_once("..")?;
                let start = PickerDate::parse(start.trim())?;
                let end = PickerDate::parse(end.trim())?;
                DateRange::new(start, end).map(Self::Range)
            }
        }
    }

    pub fn to_storage(&self, key: SettingKey) -> Option<String> {
        match (key.expected_value_kind(), self) {
            (SettingValueKind::Bool, Self::Bool(value)) => {
                Some(if *value { "true" } else { "false" }.to_owned())
            }
            (SettingValueKind::Text, Self::Text(value)) => Some(value.clone()),
            (SettingValueKind::Range, Self::Range(range)) => {
                Some(format!("{}..{}", range.start(), range.end()))
            }
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "on".to_owned(),
            Self::Bool(false) => "off".to_owned(),
            Self::Text(value) => value.clone(),
            Self::Range(range) => range.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: SettingKey,
    pub value: SettingValue,
}
