//! Keyed grouping of readings by `(date, time)`.
//!
//! Grouping is a map-then-fold over the input: each reading is paired with
//! its [`GroupKey`], then the pairs are folded into an ordered mapping of
//! key to member list. Keys keep first-seen order, members keep arrival
//! order, and duplicates are preserved.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::Reading;

// ---

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    // ---
    pub date: Option<NaiveDate>,
    pub time: String,
}

impl GroupKey {
    pub fn of(reading: &Reading) -> Self {
        GroupKey {
            date: reading.date,
            time: reading.time.clone(),
        }
    }
}

/// Readings sharing one key, in arrival order.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    // ---
    pub key: GroupKey,
    pub readings: Vec<&'a Reading>,
}

/// Insertion-ordered mapping from [`GroupKey`] to [`Group`].
#[derive(Debug, Clone, Default)]
pub struct GroupedReadings<'a> {
    groups: Vec<Group<'a>>,
    index: HashMap<GroupKey, usize>,
}

impl<'a> GroupedReadings<'a> {
    // ---
    fn push(&mut self, key: GroupKey, reading: &'a Reading) {
        // ---
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].readings.push(reading),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(Group {
                    key,
                    readings: vec![reading],
                });
            }
        }
    }

    /// Groups in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = &Group<'a>> {
        self.groups.iter()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group<'a>> {
        self.index.get(key).map(|&slot| &self.groups[slot])
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All members, group by group.
    pub fn flatten(&self) -> Vec<&'a Reading> {
        self.groups
            .iter()
            .flat_map(|g| g.readings.iter().copied())
            .collect()
    }
}

/// Group readings by `(date, time)` in a single linear pass.
pub fn group<'a, I>(readings: I) -> GroupedReadings<'a>
where
    I: IntoIterator<Item = &'a Reading>,
{
    // ---
    readings
        .into_iter()
        .map(|reading| (GroupKey::of(reading), reading))
        .fold(GroupedReadings::default(), |mut acc, (key, reading)| {
            acc.push(key, reading);
            acc
        })
}
