//! ordered collection of loaded rules

use std::sync::Arc;

use crate::conditions::{EvalContext, Host, MacAddress};

use super::Rule;

/// a request to wake one host, produced by a rule that evaluated true
#[derive(Debug, Clone, PartialEq)]
pub struct WakeRequest {
    pub host: Arc<Host>,
}

impl WakeRequest {
    pub fn mac(&self) -> MacAddress {
        self.host.mac
    }
}

/// rules in the order they were added
///
/// append-only: rules are never removed or reordered, only their enabled
/// flag changes after loading.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// append a rule, returning its index
    pub fn add(&mut self, rule: Rule) -> usize {
        self.rules.push(rule);
        self.rules.len() - 1
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.rules.extend(rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn enable_all(&mut self) {
        for rule in &mut self.rules {
            rule.set_enabled(true);
        }
    }

    pub fn disable_all(&mut self) {
        for rule in &mut self.rules {
            rule.set_enabled(false);
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_enabled()).count()
    }

    /// distinct hosts, in the order they first appear
    pub fn hosts(&self) -> Vec<Arc<Host>> {
        let mut hosts: Vec<Arc<Host>> = Vec::new();
        for rule in &self.rules {
            if !hosts.iter().any(|h| h.as_ref() == rule.host()) {
                hosts.push(rule.shared_host());
            }
        }
        hosts
    }

    /// evaluate every enabled rule, in order, against one snapshot
    pub fn evaluate(&self, ctx: &EvalContext) -> Vec<WakeRequest> {
        self.rules
            .iter()
            .filter(|r| r.is_enabled())
            .filter(|r| r.evaluate(ctx))
            .map(|r| WakeRequest {
                host: r.shared_host(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a RuleRegistry {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
