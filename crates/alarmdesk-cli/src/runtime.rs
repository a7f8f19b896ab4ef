// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use alarmdesk_api::Client;
use alarmdesk_app::{
    Alarm, DateRange, IdSequence, Incident, IncidentAction, IncidentId, PickerDate, ScreenKind,
};
use alarmdesk_db::Store;
use alarmdesk_testkit::IncidentFaker;
use alarmdesk_tui::AppRuntime;
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

pub const DEMO_SEED: u64 = 2026;
const DEMO_INCIDENTS: usize = 60;
const DEMO_OPERATOR: &str = "You (demo)";

/// Talks to the incident API and keeps preferences in the local store.
pub struct ApiRuntime<'a> {
    client: Client,
    store: &'a Store,
    utc_offset: UtcOffset,
}

impl<'a> ApiRuntime<'a> {
    pub fn new(client: Client, store: &'a Store, utc_offset: UtcOffset) -> Self {
        Self {
            client,
            store,
            utc_offset,
        }
    }
}

impl AppRuntime for ApiRuntime<'_> {
    fn load_incidents(&mut self, screen: ScreenKind, range: DateRange) -> Result<Vec<Incident>> {
        match screen {
            ScreenKind::Active => self.client.list_active(),
            ScreenKind::History => self.client.list_history(range),
        }
    }

    fn load_alarms(&mut self, incident: IncidentId) -> Result<Vec<Alarm>> {
        self.client.list_alarms(incident)
    }

    fn apply_action(&mut self, action: &IncidentAction) -> Result<()> {
        self.client.apply(action)
    }

    fn save_query(&mut self, query: &str) -> Result<()> {
        self.store.put_last_query(query)
    }

    fn save_history_range(&mut self, range: DateRange) -> Result<()> {
        self.store.put_history_range(range)
    }

    fn show_calls(&mut self) -> Result<bool> {
        self.store.show_calls()
    }

    fn save_show_calls(&mut self, show: bool) -> Result<()> {
        self.store.put_show_calls(show)
    }

    fn today(&mut self) -> PickerDate {
        alarmdesk_app::today_at(self.utc_offset, 0)
    }
}

/// Generated incidents kept in memory. Actions mutate the local copy the way
/// the server would, so every screen can be tried without a backend.
pub struct DemoRuntime<'a> {
    store: &'a Store,
    faker: IncidentFaker,
    incidents: Vec<Incident>,
    alarms: BTreeMap<IncidentId, Vec<Alarm>>,
    utc_offset: UtcOffset,
}

impl<'a> DemoRuntime<'a> {
    pub fn new(store: &'a Store, seed: u64, now: OffsetDateTime) -> Self {
        let utc_offset = now.offset();
        let mut faker = IncidentFaker::new(seed, IdSequence::default());
        let incidents = faker.incidents_before(now, DEMO_INCIDENTS);
        info!(seed, count = incidents.len(), "generated demo incidents");
        Self {
            store,
            faker,
            incidents,
            alarms: BTreeMap::new(),
            utc_offset,
        }
    }

    fn incident_mut(&mut self, id: IncidentId) -> Result<&mut Incident> {
        self.incidents
            .iter_mut()
            .find(|incident| incident.id == id)
            .ok_or_else(|| anyhow!("incident {id} not found"))
    }

    fn alarms_mut(&mut self, id: IncidentId) -> Result<&mut Vec<Alarm>> {
        if !self.alarms.contains_key(&id) {
            let incident = self
                .incidents
                .iter()
                .find(|incident| incident.id == id)
                .ok_or_else(|| anyhow!("incident {id} not found"))?;
            let generated = self.faker.alarms_for(incident);
            self.alarms.insert(id, generated);
        }
        self.alarms
            .get_mut(&id)
            .ok_or_else(|| anyhow!("alarms for incident {id} missing"))
    }
}

impl AppRuntime for DemoRuntime<'_> {
    fn load_incidents(&mut self, screen: ScreenKind, range: DateRange) -> Result<Vec<Incident>> {
        Ok(self
            .incidents
            .iter()
            .filter(|incident| match screen {
                ScreenKind::Active => !incident.resolved,
                ScreenKind::History => incident.created_within(range),
            })
            .cloned()
            .collect())
    }

    fn load_alarms(&mut self, incident: IncidentId) -> Result<Vec<Alarm>> {
        Ok(self.alarms_mut(incident)?.clone())
    }

    fn apply_action(&mut self, action: &IncidentAction) -> Result<()> {
        action.validate(&self.incidents)?;
        match action {
            IncidentAction::Acknowledge { incident } => {
                let mut operator = self.faker.user();
                operator.name = Some(DEMO_OPERATOR.to_owned());
                operator.team = None;
                self.incident_mut(*incident)?.users.push(operator);
            }
            IncidentAction::Resolve { incident } => {
                let incident = self.incident_mut(*incident)?;
                incident.resolved = true;
                incident.resolved_at = Some(OffsetDateTime::now_utc());
            }
            IncidentAction::Merge { target, sources } => {
                let mut moved = Vec::new();
                for source in sources {
                    moved.append(self.alarms_mut(*source)?);
                    self.alarms.remove(source);
                    self.incidents.retain(|incident| incident.id != *source);
                }
                for alarm in &mut moved {
                    alarm.incident_id = *target;
                }
                let count = moved.len();
                self.alarms_mut(*target)?.append(&mut moved);
                self.incident_mut(*target)?.alarm_count += count;
            }
        }
        debug!(action = action.kind().label(), incident = %action.incident(), "applied demo action");
        Ok(())
    }

    fn save_query(&mut self, query: &str) -> Result<()> {
        self.store.put_last_query(query)
    }

    fn save_history_range(&mut self, range: DateRange) -> Result<()> {
        self.store.put_history_range(range)
    }

    fn show_calls(&mut self) -> Result<bool> {
        self.store.show_calls()
    }

    fn save_show_calls(&mut self, show: bool) -> Result<()> {
        self.store.put_show_calls(show)
    }

    fn today(&mut self) -> PickerDate {
        alarmdesk_app::today_at(self.utc_offset, 0)
    }
}
