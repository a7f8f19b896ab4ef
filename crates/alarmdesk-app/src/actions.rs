// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeSet;

use crate::{ActionKind, Incident, IncidentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentAction {
    Acknowledge {
        incident: IncidentId,
    },
    Resolve {
        incident: IncidentId,
    },
    /// Folds every source incident (and its alarms) into `target`.
    Merge {
        target: IncidentId,
        sources: Vec<IncidentId>,
    },
}

impl IncidentAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Acknowledge { .. } => ActionKind::Acknowledge,
            Self::Resolve { .. } => ActionKind::Resolve,
            Self::Merge { .. } => ActionKind::Merge,
        }
    }

    /// The incident the action is addressed to.
    pub fn incident(&self) -> IncidentId {
        match self {
            Self::Acknowledge { incident } | Self::Resolve { incident } => *incident,
            Self::Merge { target, .. } => *target,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Acknowledge { incident } => format!("acknowledged incident {incident}"),
            Self::Resolve { incident } => format!("resolved incident {incident}"),
            Self::Merge { target, sources } => {
                let plural = if sources.len() == 1 { "" } else { "s" };
                format!(
                    "merged {} incident{plural} into {target}",
                    sources.len()
                )
            }
        }
    }

    /// Checks the action against the incidents currently on screen before it
    /// is sent anywhere.
    pub fn validate(&self, incidents: &[Incident]) -> Result<()> {
        match self {
            Self::Acknowledge { incident } => {
                let incident = find(incidents, *incident)?;
                if incident.resolved {
                    bail!(
                        "incident {} is already resolved -- nothing to acknowledge",
                        incident.id
                    );
                }
            }
            Self::Resolve { incident } => {
                let incident = find(incidents, *incident)?;
                if incident.resolved {
                    bail!("incident {} is already resolved", incident.id);
                }
            }
            Self::Merge { target, sources } => {
                if sources.is_empty() {
                    bail!("no incidents marked for merge -- mark incidents with space and retry");
                }
                let target = find(incidents, *target)?;
                if target.resolved {
                    bail!(
                        "incident {} is resolved -- merge into an open incident",
                        target.id
                    );
                }

                let mut seen = BTreeSet::new();
                for source in sources {
                    if *source == target.id {
                        bail!("cannot merge incident {source} into itself");
                    }
                    if !seen.insert(*source) {
                        bail!("incident {source} is marked for merge twice");
                    }
                    let source = find(incidents, *source)?;
                    if source.resolved {
                        bail!(
                            "incident {} is resolved -- only open incidents can be merged",
                            source.id
                        );
                    }
                    if source.company_public.id != target.company_public.id {
                        bail!(
                            "incident {} belongs to {}, not {} -- merge only within one company",
                            source.id,
                            source.company_public.name,
                            target.company_public.name
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

fn find(incidents: &[Incident], id: IncidentId) -> Result<&Incident> {
    incidents
        .iter()
        .find(|incident| incident.id == id)
        .ok_or_else(|| anyhow!("incident {id} not found -- refresh the list and retry"))
}
