//! rule engine: the registry plus the state its rules are evaluated against

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::conditions::{EvalContext, Host};
use crate::rules::{RuleRegistry, WakeRequest};
use crate::state::{MotionState, PingLog, WakeLog};

#[derive(Debug, Default)]
pub struct Engine {
    registry: RuleRegistry,
    motion: MotionState,
    wake_log: WakeLog,
    ping_log: PingLog,
}

/// serializable snapshot of the engine, for `status`
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub rules: usize,
    pub enabled: usize,
    pub last_motion: Option<DateTime<Utc>>,
    pub previous_motion: Option<DateTime<Utc>>,
    pub hosts: Vec<HostStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostStatus {
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub last_wake: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
}

impl Engine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn motion(&self) -> MotionState {
        self.motion
    }

    pub fn wake_log(&self) -> &WakeLog {
        &self.wake_log
    }

    /// handle one motion event
    ///
    /// every enabled rule is evaluated against the same snapshot. hosts of
    /// rules that hold are stamped in the wake log before their requests are
    /// returned, so a second event can't wake them again inside the hold-off.
    pub fn on_motion<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Vec<WakeRequest> {
        let epoch = now.timestamp();
        self.motion.record(epoch);

        let requests = {
            let ctx = EvalContext::new(now, &self.wake_log)
                .with_previous_motion(self.motion.previous());
            self.registry.evaluate(&ctx)
        };

        for request in &requests {
            self.wake_log.record(&request.host, epoch);
        }

        requests
    }

    /// evaluate as if motion happened at `now`, without touching any state
    pub fn dry_run<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        previous_motion: Option<i64>,
    ) -> Vec<WakeRequest> {
        let ctx = EvalContext::new(now, &self.wake_log).with_previous_motion(previous_motion);
        self.registry.evaluate(&ctx)
    }

    pub fn record_ping(&mut self, host: &Host, epoch: i64) {
        self.ping_log.record(host, epoch);
    }

    pub fn enable_all(&mut self) {
        self.registry.enable_all();
    }

    pub fn disable_all(&mut self) {
        self.registry.disable_all();
    }

    pub fn status(&self) -> EngineStatus {
        let hosts = self
            .registry
            .hosts()
            .iter()
            .map(|host| HostStatus {
                mac: host.mac.to_string(),
                address: host.address.map(|a| a.to_string()),
                last_wake: self.wake_log.get(host).and_then(to_utc),
                last_ping: self.ping_log.get(host).and_then(to_utc),
            })
            .collect();

        EngineStatus {
            rules: self.registry.len(),
            enabled: self.registry.enabled_count(),
            last_motion: self.motion.last().and_then(to_utc),
            previous_motion: self.motion.previous().and_then(to_utc),
            hosts,
        }
    }
}

fn to_utc(epoch: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0)
}
