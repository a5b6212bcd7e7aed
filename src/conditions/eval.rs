//! condition evaluator
//!
//! evaluates bound logic trees against a snapshot of the current time and
//! the motion/wake state

use chrono::{DateTime, NaiveDateTime, TimeZone};

use super::time::{is_day_match, is_time_between};
use super::types::{BoundCondition, Condition, Node, When};
use crate::state::WakeLog;

/// snapshot of everything a leaf may look at
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// wall clock time in the local timezone
    pub local: NaiveDateTime,
    /// the same instant as unix epoch seconds
    pub epoch: i64,
    /// epoch of the motion event before the current one
    pub previous_motion: Option<i64>,
    /// last wake per host
    pub wake_log: &'a WakeLog,
}

impl<'a> EvalContext<'a> {
    /// create a context for `now`, with no motion recorded
    pub fn new<Tz: TimeZone>(now: &DateTime<Tz>, wake_log: &'a WakeLog) -> Self {
        Self {
            local: now.naive_local(),
            epoch: now.timestamp(),
            previous_motion: None,
            wake_log,
        }
    }

    /// set the previous motion timestamp
    pub fn with_previous_motion(mut self, previous: Option<i64>) -> Self {
        self.previous_motion = previous;
        self
    }
}

/// something that can be checked against an evaluation context
///
/// implemented by bound leaves; logic nodes evaluate any leaf type that
/// implements it.
pub trait Check {
    fn check(&self, ctx: &EvalContext) -> bool;
}

impl Check for BoundCondition {
    fn check(&self, ctx: &EvalContext) -> bool {
        match self.condition() {
            Condition::DayOfWeek(days) => is_day_match(days, &ctx.local.date()),
            Condition::TimeBetween { start, end } => {
                is_time_between(*start, *end, ctx.local.time())
            }
            Condition::InactiveFor(secs) => inactive_for(*secs, ctx.previous_motion, ctx.epoch),
            Condition::HoldOff(secs) => match self.host() {
                Some(host) => hold_off_elapsed(*secs, ctx.wake_log.get(host), ctx.epoch),
                // bind() always attaches a host to hold-off leaves
                None => false,
            },
        }
    }
}

/// more than `secs` seconds between the previous motion and now
///
/// with no previous motion on record the previous motion is taken to be the
/// epoch, which makes the condition true.
pub fn inactive_for(secs: u64, previous_motion: Option<i64>, now: i64) -> bool {
    let previous = previous_motion.unwrap_or(0);
    now.saturating_sub(previous) > secs_i64(secs)
}

/// at least `secs` seconds since the last wake, or no wake on record
pub fn hold_off_elapsed(secs: u64, last_wake: Option<i64>, now: i64) -> bool {
    match last_wake {
        Some(last) => now.saturating_sub(last) >= secs_i64(secs),
        None => true,
    }
}

fn secs_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

impl<L: Check> Node<L> {
    /// evaluate the full subtree below this node
    pub fn evaluate(&self, ctx: &EvalContext) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.check(ctx),
            // empty And = true (vacuous truth)
            Node::And(children) => children.iter().all(|c| c.evaluate(ctx)),
            // empty Or = false
            Node::Or(children) => children.iter().any(|c| c.evaluate(ctx)),
            Node::Not(child) => !child.evaluate(ctx),
        }
    }
}

impl<L: Check> When<L> {
    /// AND over the top-level children, stopping at the first false one
    pub fn evaluate(&self, ctx: &EvalContext) -> bool {
        self.children().iter().all(|c| c.evaluate(ctx))
    }
}
