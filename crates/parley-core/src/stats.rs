//! Requested/played counters per communication

use crate::identity::{CommId, ConfigId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommCounts {
    pub requested: u32,
    pub played: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    counts: HashMap<(ConfigId, CommId), CommCounts>,
}

impl Statistics {
    pub fn record_request(&mut self, config: ConfigId, comm: CommId) {
        self.counts.entry((config, comm)).or_default().requested += 1;
    }

    pub fn record_play(&mut self, config: ConfigId, comm: CommId) {
        self.counts.entry((config, comm)).or_default().played += 1;
    }

    pub fn get(&self, config: ConfigId, comm: CommId) -> CommCounts {
        self.counts.get(&(config, comm)).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(ConfigId, CommId), &CommCounts)> {
        self.counts.iter()
    }

    /// Sum over every communication
    pub fn totals(&self) -> CommCounts {
        self.counts.values().fold(CommCounts::default(), |acc, c| CommCounts {
            requested: acc.requested + c.requested,
            played: acc.played + c.played,
        })
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
