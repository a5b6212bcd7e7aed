//! wake rule conditions
//!
//! - leaf predicates: weekday, time window, inactivity, hold-off
//! - logic nodes: all (AND), any (OR), not (NOT), nestable to any depth
//! - an indentation-structured text format for writing rules
//!
//! trees are built unbound (`Node<Condition>`) by the parser and bound to
//! their rule's host (`Node<BoundCondition>`) before they can be evaluated.

mod eval;
mod parser;
mod time;
mod types;

pub use eval::{hold_off_elapsed, inactive_for, Check, EvalContext};
pub use parser::{load_rules, parse_rules, ParseError, Parser};
pub use time::{parse_time, parse_weekday};
pub use types::{BoundCondition, Condition, Host, MacAddress, MacParseError, Node, When};
