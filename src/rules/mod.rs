//! wake rules: one host, one hold-off threshold, one condition tree
//!
//! rules are built in two phases. the pieces (host, unbound condition tree,
//! hold-off) are collected first, then the tree is bound to the host so
//! that every leaf needing host context can reach it during evaluation.

mod error;
mod registry;

pub use error::ConfigurationError;
pub use registry::{RuleRegistry, WakeRequest};

use std::sync::Arc;

use crate::conditions::{BoundCondition, Check, Condition, EvalContext, Host, When};

/// one piece of a rule, in any order
#[derive(Debug, Clone, PartialEq)]
pub enum RuleArg {
    Host(Host),
    When(When<Condition>),
    /// hold-off threshold in seconds
    HoldOff(u64),
}

impl From<Host> for RuleArg {
    fn from(host: Host) -> Self {
        RuleArg::Host(host)
    }
}

impl From<When<Condition>> for RuleArg {
    fn from(when: When<Condition>) -> Self {
        RuleArg::When(when)
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    host: Arc<Host>,
    hold_off: BoundCondition,
    when: When<BoundCondition>,
    enabled: bool,
}

impl Rule {
    /// build a rule from its parts
    pub fn new(host: Host, hold_off_secs: u64, when: When<Condition>) -> Self {
        let host = Arc::new(host);
        let hold_off = BoundCondition::bind(Condition::HoldOff(hold_off_secs), &host);
        let when = when.bind(&host);

        Self {
            host,
            hold_off,
            when,
            enabled: true,
        }
    }

    /// build a rule from an unordered list of parts
    ///
    /// exactly one host and one condition block are required. a missing
    /// hold-off means no delay between wakes.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = RuleArg>,
    {
        let mut hosts = Vec::new();
        let mut whens = Vec::new();
        let mut hold_offs = Vec::new();

        for arg in args {
            match arg {
                RuleArg::Host(h) => hosts.push(h),
                RuleArg::When(w) => whens.push(w),
                RuleArg::HoldOff(secs) => hold_offs.push(secs),
            }
        }

        let host = match hosts.len() {
            0 => return Err(ConfigurationError::MissingHost),
            1 => hosts.remove(0),
            n => return Err(ConfigurationError::DuplicateHost(n)),
        };

        let when = match whens.len() {
            0 => return Err(ConfigurationError::MissingWhen),
            1 => whens.remove(0),
            n => return Err(ConfigurationError::DuplicateWhen(n)),
        };

        let hold_off = match hold_offs.len() {
            0 => 0,
            1 => hold_offs[0],
            n => return Err(ConfigurationError::DuplicateHoldOff(n)),
        };

        Ok(Self::new(host, hold_off, when))
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn shared_host(&self) -> Arc<Host> {
        Arc::clone(&self.host)
    }

    pub fn hold_off_secs(&self) -> u64 {
        match self.hold_off.condition() {
            Condition::HoldOff(secs) => *secs,
            _ => 0,
        }
    }

    pub fn when(&self) -> &When<BoundCondition> {
        &self.when
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// the hold-off has elapsed and the condition tree holds
    pub fn evaluate(&self, ctx: &EvalContext) -> bool {
        self.hold_off.check(ctx) && self.when.evaluate(ctx)
    }
}
