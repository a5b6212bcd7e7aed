//! runtime state consulted by rule evaluation
//!
//! motion timestamps and the per-host logs are plain epoch seconds. they are
//! owned by the engine and only ever read by the condition evaluator.

use std::collections::HashMap;

use crate::conditions::Host;

/// timestamps of the two most recent motion events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionState {
    last: Option<i64>,
    previous: Option<i64>,
}

impl MotionState {
    /// record a motion event at `now`
    ///
    /// the very first event also becomes its own predecessor, so inactivity
    /// is measured from the moment the daemon first saw motion.
    pub fn record(&mut self, now: i64) {
        let last = self.last.unwrap_or(now);
        self.previous = Some(last);
        self.last = Some(now);
    }

    pub fn last(&self) -> Option<i64> {
        self.last
    }

    pub fn previous(&self) -> Option<i64> {
        self.previous
    }
}

/// epoch seconds keyed by host
#[derive(Debug, Clone, Default)]
pub struct HostLog {
    entries: HashMap<Host, i64>,
}

/// when each host was last woken
pub type WakeLog = HostLog;

/// when each host last answered a ping
pub type PingLog = HostLog;

impl HostLog {
    pub fn record(&mut self, host: &Host, epoch: i64) {
        self.entries.insert(host.clone(), epoch);
    }

    pub fn get(&self, host: &Host) -> Option<i64> {
        self.entries.get(host).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
