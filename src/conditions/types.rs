//! core types for the wake rule language

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveTime, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::time::weekday_abbrev;
use crate::rules::ConfigurationError;

lazy_static! {
    static ref MAC_RE: Regex = Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").unwrap();
}

/// error returned when a hardware address literal is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mac address '{0}': expected six colon-separated hex pairs")]
pub struct MacParseError(pub String);

/// a 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !MAC_RE.is_match(s) {
            return Err(MacParseError(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(s.split(':')) {
            *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// a wakeable network endpoint
///
/// the network address is optional: rules written as `wake <mac>:` only know
/// the hardware address, which is all a magic packet needs. hosts without an
/// address are not monitored for liveness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    pub address: Option<IpAddr>,
    pub mac: MacAddress,
}

impl Host {
    pub fn new(mac: MacAddress) -> Self {
        Self { address: None, mac }
    }

    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(addr) => write!(f, "{} {}", addr, self.mac),
            None => write!(f, "{}", self.mac),
        }
    }
}

/// a leaf predicate, as written in the rules file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// today is one of these weekdays
    DayOfWeek(Vec<Weekday>),
    /// time of day is strictly between start and end
    TimeBetween { start: NaiveTime, end: NaiveTime },
    /// more than this many seconds passed between the previous and the current motion
    InactiveFor(u64),
    /// at least this many seconds passed since the host was last woken
    HoldOff(u64),
}

impl Condition {
    /// whether evaluating this leaf requires knowing which host it belongs to
    pub fn needs_host(&self) -> bool {
        matches!(self, Condition::HoldOff(_))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::DayOfWeek(days) => {
                write!(f, "day in [")?;
                for (i, d) in days.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", weekday_abbrev(*d))?;
                }
                write!(f, "]")
            }
            Condition::TimeBetween { start, end } => {
                write!(f, "{} < now < {}", start.format("%H:%M:%S"), end.format("%H:%M:%S"))
            }
            Condition::InactiveFor(secs) => write!(f, "inactive > {}s", secs),
            Condition::HoldOff(secs) => write!(f, "hold off >= {}s", secs),
        }
    }
}

/// a leaf condition bound to the host of the rule that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCondition {
    condition: Condition,
    host: Option<Arc<Host>>,
}

impl BoundCondition {
    /// attach `host` if the condition needs it
    pub fn bind(condition: Condition, host: &Arc<Host>) -> Self {
        let host = condition.needs_host().then(|| Arc::clone(host));
        Self { condition, host }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn host(&self) -> Option<&Host> {
        self.host.as_deref()
    }
}

impl fmt::Display for BoundCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.condition)
    }
}

/// a node of the logic tree
///
/// generic over the leaf type so that a tree can be built unbound
/// (`Node<Condition>`) and then bound to its host (`Node<BoundCondition>`).
#[derive(Debug, Clone, PartialEq)]
pub enum Node<L> {
    Leaf(L),
    /// all children must be true
    And(Vec<Node<L>>),
    /// any child must be true
    Or(Vec<Node<L>>),
    /// negate exactly one child
    Not(Box<Node<L>>),
}

impl<L> Node<L> {
    pub fn leaf(leaf: L) -> Self {
        Node::Leaf(leaf)
    }

    pub fn and(children: Vec<Node<L>>) -> Self {
        Node::And(children)
    }

    pub fn or(children: Vec<Node<L>>) -> Self {
        Node::Or(children)
    }

    pub fn negate(child: Node<L>) -> Self {
        Node::Not(Box::new(child))
    }

    /// build a NOT from a child list, rejecting anything but a single child
    pub fn not_of(mut children: Vec<Node<L>>) -> Result<Self, ConfigurationError> {
        if children.len() != 1 {
            return Err(ConfigurationError::NotArity(children.len()));
        }
        Ok(Node::Not(Box::new(children.remove(0))))
    }

    /// rebuild the tree with every leaf transformed by `f`
    pub fn map<M, F>(self, f: &mut F) -> Node<M>
    where
        F: FnMut(L) -> M,
    {
        match self {
            Node::Leaf(leaf) => Node::Leaf(f(leaf)),
            Node::And(children) => {
                Node::And(children.into_iter().map(|c| c.map(&mut *f)).collect())
            }
            Node::Or(children) => Node::Or(children.into_iter().map(|c| c.map(&mut *f)).collect()),
            Node::Not(child) => Node::Not(Box::new(child.map(f))),
        }
    }

    /// push every leaf below this node, depth-first, onto `out`
    pub fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            Node::Leaf(leaf) => out.push(leaf),
            Node::And(children) | Node::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Node::Not(child) => child.collect_leaves(out),
        }
    }

    /// depth of the tree, a leaf being 1
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::And(children) | Node::Or(children) => {
                1 + children.iter().map(Node::depth).max().unwrap_or(0)
            }
            Node::Not(child) => 1 + child.depth(),
        }
    }
}

impl<L: fmt::Display> fmt::Display for Node<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => write!(f, "{}", leaf),
            Node::And(children) => write_list(f, "all", children),
            Node::Or(children) => write_list(f, "any", children),
            Node::Not(child) => write!(f, "not({})", child),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, name: &str, items: &[T]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

/// root of a rule's logic tree: an implicit AND over its children
#[derive(Debug, Clone, PartialEq)]
pub struct When<L> {
    children: Vec<Node<L>>,
}

impl<L> When<L> {
    pub fn new(children: Vec<Node<L>>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Node<L>] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn map<M, F>(self, mut f: F) -> When<M>
    where
        F: FnMut(L) -> M,
    {
        When {
            children: self.children.into_iter().map(|c| c.map(&mut f)).collect(),
        }
    }

    /// every leaf of the tree in depth-first order, at any nesting depth
    pub fn leaves(&self) -> Vec<&L> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_leaves(&mut out);
        }
        out
    }
}

impl When<Condition> {
    /// second build phase: hand the owning host to every leaf that needs it
    pub fn bind(self, host: &Arc<Host>) -> When<BoundCondition> {
        self.map(|c| BoundCondition::bind(c, host))
    }
}

impl<L: fmt::Display> fmt::Display for When<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "when", &self.children)
    }
}
