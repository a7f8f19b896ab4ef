// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Response records as the incident API sends them. Everything optional on
//! the wire is `Option` here; conversion into model types happens once, in
//! the `into_*` functions, and fails loudly on records the client cannot use.

use alarmdesk_app::{
    Alarm, AlarmId, CompanyId, CompanyPublic, Incident, IncidentId, Priority, User, UserId,
};
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncidentRecord {
    id: i64,
    priority: i64,
    #[serde(default)]
    resolved: bool,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    calls: Vec<UserRecord>,
    company_public: Option<CompanyRecord>,
    case_number: Option<i64>,
    created_at: String,
    resolved_at: Option<String>,
    #[serde(default)]
    alarm_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRecord {
    id: i64,
    name: Option<String>,
    team: Option<String>,
    phone: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompanyRecord {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlarmRecord {
    id: i64,
    incident_id: Option<i64>,
    #[serde(default)]
    service: String,
    #[serde(default)]
    message: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MergeRequest {
    pub sources: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl IncidentRecord {
    pub(crate) fn into_incident(self) -> Result<Incident> {
        let id = self.id;
        let priority = u8::try_from(self.priority)
            .ok()
            .and_then(Priority::new)
            .ok_or_else(|| {
                anyhow!(
                    "incident {id} has priority {} outside 1-4; the server sent a malformed incident",
                    self.priority
                )
            })?;
        let Some(company) = self.company_public else {
            bail!("incident {id} has no companyPublic; the server sent a malformed incident");
        };
        if company.id.trim().is_empty() {
            bail!("incident {id} has an empty company id");
        }

        Ok(Incident {
            id: IncidentId::new(id),
            priority,
            resolved: self.resolved,
            users: self.users.into_iter().map(UserRecord::into_user).collect(),
            calls: self.calls.into_iter().map(UserRecord::into_user).collect(),
            company_public: CompanyPublic {
                name: company.name.unwrap_or_else(|| company.id.clone()),
                id: CompanyId::new(company.id),
            },
            case_number: self.case_number,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("incident {id} createdAt"))?,
            resolved_at: self
                .resolved_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .with_context(|| format!("incident {id} resolvedAt"))?,
            alarm_count: self.alarm_count,
        })
    }
}

impl UserRecord {
    fn into_user(self) -> User {
        User {
            id: UserId::new(self.id),
            name: self.name,
            team: self.team,
            phone: self.phone,
            email: self.email,
        }
    }
}

impl AlarmRecord {
    pub(crate) fn into_alarm(self, parent: IncidentId) -> Result<Alarm> {
        let incident_id = self.incident_id.map_or(parent, IncidentId::new);
        if incident_id != parent {
            bail!(
                "alarm {} belongs to incident {incident_id}, not {parent}",
                self.id
            );
        }
        Ok(Alarm {
            id: AlarmId::new(self.id),
            incident_id,
            service: self.service,
            message: self.message,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("alarm {} createdAt", self.id))?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .with_context(|| format!("invalid RFC 3339 timestamp {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::{AlarmRecord, IncidentRecord};
    use alarmdesk_app::{IncidentId, IncidentState};
    use anyhow::Result;

    fn decode(json: &str) -> Result<IncidentRecord> {
        Ok(serde_json::from_str(json)?)
    }

    #[test]
    fn full_record_converts() -> Result<()> {
        let incident = decode(
            r#"{
                "id": 12,
                "priority": 2,
                "resolved": false,
                "users": [{"id": 1, "name": "Dana", "team": "Night"}],
                "calls": [{"id": 2}],
                "companyPublic": {"id": "acme", "name": "Acme"},
                "caseNumber": 4411,
                "createdAt": "2024-06-10T08:30:00Z",
                "alarmCount": 3
            }"#,
        )?
        .into_incident()?;

        assert_eq!(incident.id, IncidentId::new(12));
        assert_eq!(incident.priority.get(), 2);
        assert_eq!(incident.state(), IncidentState::Acknowledged);
        assert_eq!(incident.calls[0].name, None);
        assert_eq!(incident.case_number, Some(4411));
        assert_eq!(incident.alarm_count, 3);
        Ok(())
    }

    #[test]
    fn sparse_record_uses_defaults() -> Result<()> {
        let incident = decode(
            r#"{"id": 1, "priority": 4, "companyPublic": {"id": "globex"},
                "createdAt": "2024-06-10T08:30:00+02:00"}"#,
        )?
        .into_incident()?;

        assert!(incident.users.is_empty());
        assert_eq!(incident.state(), IncidentState::Error);
        assert_eq!(incident.company_public.name, "globex");
        assert_eq!(incident.case_number, None);
        Ok(())
    }

    #[test]
    fn out_of_range_priority_is_rejected() -> Result<()> {
        let error = decode(
            r#"{"id": 5, "priority": 7, "companyPublic": {"id": "acme"},
                "createdAt": "2024-06-10T08:30:00Z"}"#,
        )?
        .into_incident()
        .expect_err("priority 7 is invalid");
        assert!(error.to_string().contains("outside 1-4"));
        Ok(())
    }

    #[test]
    fn missing_company_is_rejected() -> Result<()> {
        let error = decode(r#"{"id": 5, "priority": 1, "createdAt": "2024-06-10T08:30:00Z"}"#)?
            .into_incident()
            .expect_err("company is required");
        assert!(error.to_string().contains("companyPublic"));
        Ok(())
    }

    #[test]
    fn alarm_for_another_incident_is_rejected() -> Result<()> {
        let alarm: AlarmRecord = serde_json::from_str(
            r#"{"id": 9, "incidentId": 3, "service": "db", "message": "down",
                "createdAt": "2024-06-10T08:30:00Z"}"#,
        )?;
        assert!(alarm.into_alarm(IncidentId::new(4)).is_err());
        Ok(())
    }
}
