//! Parametrized queries.
//!
//! A [`Binding`] is a compiled [`GoalPattern`] plus the placeholders bound so
//! far. `solve` and `goal_string` fill the remaining placeholders from their
//! arguments, in placeholder order, on a copy, so one query can be solved
//! repeatedly with different arguments.

pub mod pattern;

use std::collections::HashMap;

use crate::convert::{ConversionPolicy, Value};
use crate::engine::Prover;
use crate::error::{BridgeResult, QueryError, QueryResult};
use crate::solution::Solution;

pub use pattern::GoalPattern;

/// A goal pattern with a partial placeholder → term text map.
#[derive(Debug, Clone)]
pub struct Binding {
    pattern: GoalPattern,
    bound: HashMap<String, String>,
}

impl Binding {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: GoalPattern::compile(pattern),
            bound: HashMap::new(),
        }
    }

    pub fn pattern(&self) -> &GoalPattern {
        &self.pattern
    }

    pub fn placeholders(&self) -> &[String] {
        self.pattern.placeholders()
    }

    /// Placeholders not yet bound, in order.
    pub fn unbound(&self) -> impl Iterator<Item = &String> {
        self.pattern
            .placeholders()
            .iter()
            .filter(|name| !self.bound.contains_key(*name))
    }

    /// Bind the placeholder at `index` (order of first introduction).
    pub fn bind(&mut self, index: usize, value: &Value, policy: &ConversionPolicy) -> QueryResult<()> {
        let count = self.pattern.placeholders().len();
        let name = self
            .pattern
            .placeholders()
            .get(index)
            .cloned()
            .ok_or(QueryError::PlaceholderIndex { index, count })?;
        self.bind_resolved(name, value, policy)
    }

    /// Bind a placeholder by name.
    pub fn bind_name(&mut self, name: &str, value: &Value, policy: &ConversionPolicy) -> QueryResult<()> {
        if self.pattern.index_of(name).is_none() {
            return Err(QueryError::UnknownPlaceholder {
                name: name.to_string(),
            });
        }
        self.bind_resolved(name.to_string(), value, policy)
    }

    fn bind_resolved(&mut self, name: String, value: &Value, policy: &ConversionPolicy) -> QueryResult<()> {
        if self.bound.contains_key(&name) {
            return Err(QueryError::AlreadyBound { name });
        }
        let text = policy.to_term(value)?.to_string();
        tracing::trace!(placeholder = %name, term = %text, "bound placeholder");
        self.bound.insert(name, text);
        Ok(())
    }

    /// The concrete goal text with every remaining placeholder filled from
    /// `args`, in order.
    pub fn goal_string(&self, args: &[Value], policy: &ConversionPolicy) -> QueryResult<String> {
        let expected = self.pattern.placeholders().len() - self.bound.len();
        if args.len() != expected {
            return Err(QueryError::PlaceholderCount {
                expected,
                actual: args.len(),
            });
        }
        let mut replacements = self.bound.clone();
        for (name, arg) in self.unbound().zip(args) {
            replacements.insert(name.clone(), policy.to_term(arg)?.to_string());
        }
        Ok(self.pattern.render(&replacements))
    }
}

/// A query against one prover session.
#[derive(Debug)]
pub struct Query<'p> {
    prover: &'p Prover,
    binding: Binding,
}

impl<'p> Query<'p> {
    pub(crate) fn new(prover: &'p Prover, pattern: &str) -> Self {
        Self {
            prover,
            binding: Binding::new(pattern),
        }
    }

    pub fn placeholders(&self) -> &[String] {
        self.binding.placeholders()
    }

    /// Bind the placeholder at `index` ahead of solving.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> BridgeResult<&mut Self> {
        self.binding
            .bind(index, &value.into(), self.prover.policy())?;
        Ok(self)
    }

    /// Bind a named placeholder ahead of solving.
    pub fn bind_name(&mut self, name: &str, value: impl Into<Value>) -> BridgeResult<&mut Self> {
        self.binding
            .bind_name(name, &value.into(), self.prover.policy())?;
        Ok(self)
    }

    pub fn goal_string(&self, args: &[Value]) -> BridgeResult<String> {
        Ok(self.binding.goal_string(args, self.prover.policy())?)
    }

    /// Fill the remaining placeholders from `args` and run the goal.
    pub fn solve(&self, args: &[Value]) -> BridgeResult<Solution> {
        let goal = self.goal_string(args)?;
        self.prover.solve_goal(&goal)
    }
}
