// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use alarmdesk_app::{
    Alarm, CompanyId, CompanyPublic, IdSequence, Incident, Priority, User,
};
use std::collections::BTreeMap;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const REFERENCE_NOW: OffsetDateTime = datetime!(2026-01-01 0:00 UTC);

const COMPANIES: [(&str, &str); 10] = [
    ("acme", "Acme Logistics"),
    ("globex", "Globex Energy"),
    ("initech", "Initech Payments"),
    ("umbrella", "Umbrella Health"),
    ("hooli", "Hooli Cloud"),
    ("stark", "Stark Fabrication"),
    ("wayne", "Wayne Transit"),
    ("tyrell", "Tyrell Robotics"),
    ("soylent", "Soylent Foods"),
    ("wonka", "Wonka Retail"),
];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const TEAMS: [&str; 6] = [
    "Night Shift",
    "Platform",
    "Networking",
    "Database",
    "Field Ops",
    "Security",
];

const SERVICES: [&str; 12] = [
    "api-gateway",
    "auth",
    "billing",
    "db-primary",
    "db-replica",
    "dns",
    "edge-cache",
    "ingest",
    "queue",
    "scheduler",
    "search",
    "storage",
];
const SYMPTOMS: [&str; 10] = [
    "health check failing",
    "p99 latency above threshold",
    "error rate above 5%",
    "disk usage above 90%",
    "replication lag",
    "certificate expires soon",
    "connection pool exhausted",
    "heartbeat missed",
    "memory pressure",
    "queue depth growing",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    /// True with probability `percent`/100.
    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Fabricates incidents, users and alarms from a seed. Ids come from the
/// sequence the caller hands in, so two fakers never collide unless they are
/// given the same sequence state.
#[derive(Debug, Clone)]
pub struct IncidentFaker {
    rng: DeterministicRng,
    ids: IdSequence,
    case_numbers: BTreeMap<String, i64>,
}

impl IncidentFaker {
    pub fn new(seed: u64, ids: IdSequence) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            ids,
            case_numbers: BTreeMap::new(),
        }
    }

    pub fn ids(&self) -> &IdSequence {
        &self.ids
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn company(&mut self) -> CompanyPublic {
        let (id, name) = COMPANIES[self.rng.int_n(COMPANIES.len())];
        CompanyPublic {
            id: CompanyId::new(id),
            name: name.to_owned(),
        }
    }

    /// Some users come back from the API without a name or team.
    pub fn user(&mut self) -> User {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let name = (!self.rng.chance(10)).then(|| format!("{first} {last}"));
        let team = (!self.rng.chance(30)).then(|| self.pick(&TEAMS).to_owned());
        let phone = self
            .rng
            .chance(60)
            .then(|| format!("+1 555 01{:02}", self.rng.int_n(100)));
        let email = name.as_ref().map(|_| {
            format!(
                "{}.{}@example.com",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            )
        });
        User {
            id: self.ids.next_id(),
            name,
            team,
            phone,
            email,
        }
    }

    pub fn incident(&mut self) -> Incident {
        self.incident_before(REFERENCE_NOW)
    }

    /// An incident created within the 30 days before `now`.
    pub fn incident_before(&mut self, now: OffsetDateTime) -> Incident {
        let created_at = self.datetime_between(now - Duration::days(30), now);
        let company = self.company();
        let case_number = if self.rng.chance(85) {
            let next = self
                .case_numbers
                .entry(company.id.as_str().to_owned())
                .or_insert(1000);
            *next += 1;
            Some(*next)
        } else {
            None
        };

        let priority = Priority::new(self.rng.int_n(4) as u8 + 1).unwrap_or(Priority::LOWEST);
        let users = self.users(0, 2);
        let calls = self.users(0, 3);
        let resolved = self.rng.chance(25);
        let resolved_at = resolved.then(|| {
            let hours = self.rng.int_n(48) as i64 + 1;
            created_at + Duration::hours(hours)
        });

        Incident {
            id: self.ids.next_id(),
            priority,
            resolved,
            users,
            calls,
            company_public: company,
            case_number,
            created_at,
            resolved_at,
            alarm_count: self.rng.int_n(6) + 1,
        }
    }

    pub fn incidents_before(&mut self, now: OffsetDateTime, count: usize) -> Vec<Incident> {
        (0..count).map(|_| self.incident_before(now)).collect()
    }

    pub fn alarms_for(&mut self, incident: &Incident) -> Vec<Alarm> {
        (0..incident.alarm_count)
            .map(|index| Alarm {
                id: self.ids.next_id(),
                incident_id: incident.id,
                service: self.pick(&SERVICES).to_owned(),
                message: self.pick(&SYMPTOMS).to_owned(),
                created_at: incident.created_at + Duration::minutes(index as i64 * 3),
            })
            .collect()
    }

    fn users(&mut self, min: usize, max: usize) -> Vec<User> {
        let count = min + self.rng.int_n(max - min + 1);
        (0..count).map(|_| self.user()).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn datetime_between(&mut self, start: OffsetDateTime, end: OffsetDateTime) -> OffsetDateTime {
        let start_ts = start.unix_timestamp();
        let end_ts = end.unix_timestamp();
        if end_ts <= start_ts {
            return start;
        }
        let span = (end_ts - start_ts) as u64;
        let offset = self.rng.next_u64() % (span + 1);
        OffsetDateTime::from_unix_timestamp(start_ts + offset as i64).unwrap_or(start)
    }
}

pub fn reference_now() -> OffsetDateTime {
    REFERENCE_NOW
}

#[cfg(test)]
mod tests {
    use super::{IncidentFaker, reference_now};
    use alarmdesk_app::{IdSequence, IncidentState};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_incidents() {
        let mut left = IncidentFaker::new(42, IdSequence::default());
        let mut right = IncidentFaker::new(42, IdSequence::default());
        assert_eq!(left.incident(), right.incident());
    }

    #[test]
    fn ids_come_from_the_supplied_sequence() {
        let mut faker = IncidentFaker::new(7, IdSequence::starting_at(500));
        let incident = faker.incident();
        assert!(incident.id.get() >= 500);
        for user in incident.users.iter().chain(&incident.calls) {
            assert!(user.id.get() >= 500);
            assert_ne!(user.id.get(), incident.id.get());
        }
        assert!(faker.ids().peek() > incident.id.get());
    }

    #[test]
    fn ids_are_unique_across_records() {
        let mut faker = IncidentFaker::new(3, IdSequence::default());
        let incidents = faker.incidents_before(reference_now(), 40);
        let ids = incidents
            .iter()
            .map(|incident| incident.id.get())
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), incidents.len());
    }

    #[test]
    fn case_numbers_unique_per_company() {
        let mut faker = IncidentFaker::new(11, IdSequence::default());
        let incidents = faker.incidents_before(reference_now(), 200);
        let mut seen = BTreeSet::new();
        for incident in &incidents {
            if let Some(case) = incident.case_number {
                assert!(
                    seen.insert((incident.company_public.id.clone(), case)),
                    "duplicate case {case} for {}",
                    incident.company_public.id
                );
            }
        }
    }

    #[test]
    fn incidents_fall_in_the_trailing_month() {
        let mut faker = IncidentFaker::new(5, IdSequence::default());
        let now = reference_now();
        for incident in faker.incidents_before(now, 50) {
            assert!(incident.created_at <= now);
            assert!(incident.created_at >= now - time::Duration::days(30));
            assert_eq!(incident.resolved, incident.resolved_at.is_some());
            assert!(incident.alarm_count >= 1);
        }
    }

    #[test]
    fn every_state_shows_up() {
        let mut faker = IncidentFaker::new(9, IdSequence::default());
        let states = faker
            .incidents_before(reference_now(), 100)
            .iter()
            .map(|incident| incident.state())
            .collect::<BTreeSet<_>>();
        assert!(states.contains(&IncidentState::Error));
        assert!(states.contains(&IncidentState::Acknowledged));
        assert!(states.contains(&IncidentState::Resolved));
    }

    #[test]
    fn alarms_match_their_incident() {
        let mut faker = IncidentFaker::new(13, IdSequence::default());
        let incident = faker.incident();
        let alarms = faker.alarms_for(&incident);
        assert_eq!(alarms.len(), incident.alarm_count);
        assert!(alarms.iter().all(|alarm| alarm.incident_id == incident.id));
        assert!(alarms.iter().all(|alarm| !alarm.service.is_empty()));
    }

    #[test]
    fn variety_across_seeds() {
        let mut companies = BTreeSet::new();
        for seed in 0_u64..20_u64 {
            let mut faker = IncidentFaker::new(seed, IdSequence::default());
            companies.insert(faker.company().id);
        }
        assert!(companies.len() >= 5, "got {}", companies.len());
    }
}
