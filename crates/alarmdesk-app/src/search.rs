// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::model::{Incident, IncidentState, User};

/// Free-text incident search. Every whitespace-separated token has to hit at
/// least one searchable field; an empty query matches everything.
pub fn matches(incident: &Incident, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }

    let query = query.to_lowercase();
    query
        .split(char::is_whitespace)
        .all(|token| token.is_empty() || token_hits(incident, token))
}

fn token_hits(incident: &Incident, token: &str) -> bool {
    contains_folded(&incident.company_public.name, token)
        || incident
            .case_number
            .is_some_and(|case| case.to_string().contains(token))
        || incident.calls.iter().any(|user| user_hits(user, token))
        || incident.users.iter().any(|user| user_hits(user, token))
        || incident.priority.to_string().contains(token)
}

fn user_hits(user: &User, token: &str) -> bool {
    user.name
        .as_deref()
        .is_some_and(|name| contains_folded(name, token))
        || user
            .team
            .as_deref()
            .is_some_and(|team| contains_folded(team, token))
}

fn contains_folded(haystack: &str, token: &str) -> bool {
    haystack.to_lowercase().contains(token)
}

/// Display order: priority, then unacknowledged before acknowledged, then
/// company, then case number.
///
/// Not a strict order. Incidents of equal priority whose states differ other
/// than error/acknowledged compare equal, as do incidents of one company when
/// either case number is missing. Use it with a stable sort.
pub fn compare(a: &Incident, b: &Incident) -> Ordering {
    match a.priority.cmp(&b.priority) {
        Ordering::Equal => {}
        other => return other,
    }

    let (left, right) = (a.state(), b.state());
    match (left, right) {
        (IncidentState::Error, IncidentState::Acknowledged) => return Ordering::Less,
        (IncidentState::Acknowledged, IncidentState::Error) => return Ordering::Greater,
        _ if left != right => return Ordering::Equal,
        _ => {}
    }

    let company = a
        .company_public
        .id
        .as_str()
        .to_lowercase()
        .cmp(&b.company_public.id.as_str().to_lowercase());
    if company != Ordering::Equal {
        return company;
    }

    match (a.case_number, b.case_number) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => Ordering::Equal,
    }
}

pub fn sort_incidents(incidents: &mut [Incident]) {
    incidents.sort_by(compare);
}

/// Matching incidents in display order.
pub fn filter_sorted<'a>(incidents: &'a [Incident], query: &str) -> Vec<&'a Incident> {
    let mut visible = incidents
        .iter()
        .filter(|incident| matches(incident, query))
        .collect::<Vec<_>>();
    visible.sort_by(|a, b| compare(a, b));
    visible
}
