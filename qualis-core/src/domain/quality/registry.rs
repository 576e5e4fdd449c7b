// qualis-core/src/domain/quality/registry.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::error::DomainError;
use crate::domain::quality::rule::Rule;

/// Ordered, name-unique set of rules. Locked once a run starts.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    locked: AtomicBool,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Rule) -> Result<(), DomainError> {
        if self.is_locked() {
            return Err(DomainError::RegistryLocked(rule.name().to_string()));
        }
        if self.get(rule.name()).is_some() {
            return Err(DomainError::DuplicateRuleName(rule.name().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn all(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Freezes the registry. Called by the evaluator when a run begins.
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Builds a new, unlocked registry holding only `names`, in registry order.
    pub fn select(&self, names: &[String]) -> Result<RuleRegistry, DomainError> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(DomainError::RuleNotFound(unknown.clone()));
        }

        let mut subset = RuleRegistry::new();
        for rule in self.rules.iter().filter(|r| wanted.contains(r.name())) {
            subset.register(rule.clone())?;
        }
        Ok(subset)
    }
}

impl TryFrom<Vec<Rule>> for RuleRegistry {
    type Error = DomainError;

    fn try_from(rules: Vec<Rule>) -> Result<Self, Self::Error> {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register(rule)?;
        }
        Ok(registry)
    }
}
