// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod wire;

use alarmdesk_app::{Alarm, DateRange, Incident, IncidentAction, IncidentId, PickerDate};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{COOKIE, SET_COOKIE};
use std::time::Duration;
use time::macros::format_description;
use tracing::{debug, info, warn};
use url::Url;

use crate::wire::{AlarmRecord, ErrorEnvelope, IncidentRecord, LoginRequest, MergeRequest};

/// Cookie the server hands back on login, in `name=value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub cookie: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    session: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty -- set it in the config file");
        }
        Url::parse(&base_url).with_context(|| {
            format!("api.base_url {base_url:?} is not a valid URL -- use e.g. https://alarms.example.com/api")
        })?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            session: None,
            http,
        })
    }

    pub fn with_session(mut self, cookie: impl Into<String>) -> Self {
        self.session = Some(cookie.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        if username.trim().is_empty() {
            bail!("username must not be empty -- set api.username in the config file");
        }
        if password.is_empty() {
            bail!("password must not be empty");
        }

        let response = self
            .http
            .post(self.endpoint("/auth/login")?)
            .json(&LoginRequest { username, password })
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            bail!("login rejected for {username:?} -- check the username and password");
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .find(|pair| pair.contains('='))
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("login succeeded but the server set no session cookie"))?;

        info!(username, "logged in");
        self.session = Some(cookie.clone());
        Ok(Session {
            username: username.to_owned(),
            cookie,
        })
    }

    pub fn list_active(&self) -> Result<Vec<Incident>> {
        let url = self.endpoint_with_query("/incidents", &[("resolved", "false")])?;
        let records: Vec<IncidentRecord> = self.get_json(url, "active incidents")?;
        convert_incidents(records)
    }

    pub fn list_history(&self, range: DateRange) -> Result<Vec<Incident>> {
        let from = iso_date(range.start())?;
        let to = iso_date(range.end())?;
        let url = self.endpoint_with_query("/incidents", &[("from", &from), ("to", &to)])?;
        let records: Vec<IncidentRecord> = self.get_json(url, "incident history")?;
        convert_incidents(records)
    }

    pub fn list_alarms(&self, incident: IncidentId) -> Result<Vec<Alarm>> {
        let url = self.endpoint(&format!("/incidents/{incident}/alarms"))?;
        let records: Vec<AlarmRecord> = self.get_json(url, "incident alarms")?;
        records
            .into_iter()
            .map(|record| record.into_alarm(incident))
            .collect()
    }

    pub fn apply(&self, action: &IncidentAction) -> Result<()> {
        let incident = action.incident();
        let request = match action {
            IncidentAction::Acknowledge { .. } => self
                .http
                .post(self.endpoint(&format!("/incidents/{incident}/acknowledge"))?),
            IncidentAction::Resolve { .. } => self
                .http
                .post(self.endpoint(&format!("/incidents/{incident}/resolve"))?),
            IncidentAction::Merge { sources, .. } => self
                .http
                .post(self.endpoint(&format!("/incidents/{incident}/merge"))?)
                .json(&MergeRequest {
                    sources: sources.iter().map(|id| id.get()).collect(),
                }),
        };

        self.send(request)?;
        info!(action = action.kind().label(), %incident, "applied incident action");
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        let response = self.send(self.http.get(url))?;
        response
            .json()
            .with_context(|| format!("decode {what} -- the server sent unexpected JSON"))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let cookie = self
            .session
            .as_deref()
            .ok_or_else(|| anyhow!("not logged in -- run `alarmdesk --login` first"))?;

        let request = request.header(COOKIE, cookie);
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");
        if status == StatusCode::UNAUTHORIZED {
            warn!("session rejected by server");
            bail!("session expired; log in again with `alarmdesk --login`");
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).with_context(|| format!("build request URL {raw}"))
    }

    fn endpoint_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse_with_params(&raw, query).with_context(|| format!("build request URL {raw}"))
    }
}

fn convert_incidents(records: Vec<IncidentRecord>) -> Result<Vec<Incident>> {
    records
        .into_iter()
        .map(IncidentRecord::into_incident)
        .collect()
}

/// `YYYY-MM-DD`, the form the incident endpoints filter on.
pub fn iso_date(date: PickerDate) -> Result<String> {
    let value = date
        .to_date()
        .ok_or_else(|| anyhow!("invalid calendar date {date}"))?;
    value
        .format(format_description!("[year]-[month]-[day]"))
        .context("format request date")
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!(
            "request to {base_url} timed out -- raise api.timeout or check the network ({error})"
        );
    }
    anyhow!("cannot reach {base_url} -- check api.base_url and your network ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed
            .error
            .or(parsed.message)
            .filter(|message| !message.trim().is_empty())
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}
