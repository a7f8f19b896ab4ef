// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(IncidentId);
entity_id!(AlarmId);
entity_id!(UserId);

/// Companies are keyed by an opaque string assigned by the incident API.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out increasing ids. Owned by whoever fabricates records (the faker,
/// the demo runtime) and passed to them explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    next: i64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSequence {
    pub const fn starting_at(first: i64) -> Self {
        Self { next: first }
    }

    pub fn next_raw(&mut self) -> i64 {
        let value = self.next;
        self.next = self.next.saturating_add(1);
        value
    }

    pub fn next_id<T: From<i64>>(&mut self) -> T {
        T::from(self.next_raw())
    }

    pub const fn peek(&self) -> i64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::{AlarmId, IdSequence, IncidentId};

    #[test]
    fn sequence_hands_out_increasing_ids() {
        let mut ids = IdSequence::default();
        let first: IncidentId = ids.next_id();
        let second: AlarmId = ids.next_id();
        assert_eq!(first, IncidentId::new(1));
        assert_eq!(second, AlarmId::new(2));
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn independent_sequences_do_not_share_state() {
        let mut left = IdSequence::starting_at(100);
        let mut right = IdSequence::starting_at(100);
        left.next_raw();
        left.next_raw();
        assert_eq!(right.next_raw(), 100);
        assert_eq!(left.next_raw(), 102);
    }
}
