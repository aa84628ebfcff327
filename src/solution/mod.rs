//! Decoded query results and the cursor over them.
//!
//! A [`Solution`] holds every row the engine printed, in engine order. The
//! cursor starts before the first row; [`Solution::fetch`] advances it. Reads
//! before the first `fetch` see the first row, so single-answer goals can be
//! read directly.
//!
//! A solution that failed to decode has no rows at all: `is_success()` is
//! false, `fetch()` returns false and every read is
//! [`SolutionError::UnknownVariable`].

pub mod decode;

use std::sync::Arc;

use crate::convert::{ConversionPolicy, FromValue, Value};
use crate::error::{SolutionError, SolutionResult};
use crate::term::Term;

/// One solution: variable bindings in free-variable order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingRow {
    bindings: Vec<(String, Term)>,
    probability: Option<f64>,
}

impl BindingRow {
    pub fn new(bindings: Vec<(String, Term)>, probability: Option<f64>) -> Self {
        Self {
            bindings,
            probability,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(var, _)| var == name)
            .map(|(_, term)| term)
    }

    pub fn bindings(&self) -> &[(String, Term)] {
        &self.bindings
    }

    /// Probability of this row, for weighted engines.
    pub fn probability(&self) -> Option<f64> {
        self.probability
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// When a decoded solution counts as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessCriterion {
    /// At least one row.
    AnyRow,
    /// The mean row probability is exactly 1.0.
    MeanProbabilityOne,
}

#[derive(Debug, Clone)]
pub struct Solution {
    variables: Vec<String>,
    rows: Vec<BindingRow>,
    cursor: Option<usize>,
    default_variable: Option<String>,
    criterion: SuccessCriterion,
    failure: Option<String>,
    policy: Arc<ConversionPolicy>,
}

impl Solution {
    pub fn new(
        variables: Vec<String>,
        rows: Vec<BindingRow>,
        criterion: SuccessCriterion,
        policy: Arc<ConversionPolicy>,
    ) -> Self {
        Self {
            default_variable: variables.last().cloned(),
            variables,
            rows,
            cursor: None,
            criterion,
            failure: None,
            policy,
        }
    }

    /// A solution in the failed state. Any rows decoded so far are discarded.
    pub fn failed(
        variables: Vec<String>,
        reason: impl Into<String>,
        criterion: SuccessCriterion,
        policy: Arc<ConversionPolicy>,
    ) -> Self {
        let mut solution = Self::new(variables, Vec::new(), criterion, policy);
        solution.failure = Some(reason.into());
        solution
    }

    pub fn is_success(&self) -> bool {
        if self.failure.is_some() {
            return false;
        }
        match self.criterion {
            SuccessCriterion::AnyRow => !self.rows.is_empty(),
            SuccessCriterion::MeanProbabilityOne => self.mean_probability() == Some(1.0),
        }
    }

    /// Why decoding failed, if it did.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Free variables of the goal, in first-occurrence order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[BindingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean probability over all rows; `None` without weighted rows.
    pub fn mean_probability(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for p in self.rows.iter().filter_map(BindingRow::probability) {
            sum += p;
            count += 1;
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Probability of the current row.
    pub fn probability(&self) -> Option<f64> {
        self.current().and_then(BindingRow::probability)
    }

    // -----------------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------------

    /// Advance to the next row. Returns false once the rows are exhausted;
    /// the cursor then stays on the last row.
    pub fn fetch(&mut self) -> bool {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next < self.rows.len() {
            self.cursor = Some(next);
            true
        } else {
            false
        }
    }

    /// The row reads refer to.
    pub fn current(&self) -> Option<&BindingRow> {
        self.rows.get(self.cursor.unwrap_or(0))
    }

    /// Make `name` the default variable for [`value`](Self::value).
    pub fn on(&mut self, name: &str) -> &mut Self {
        self.default_variable = Some(name.to_string());
        self
    }

    pub fn default_variable(&self) -> Option<&str> {
        self.default_variable.as_deref()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The raw term bound to `name` in the current row.
    pub fn term(&self, name: &str) -> SolutionResult<&Term> {
        self.current()
            .and_then(|row| row.get(name))
            .ok_or_else(|| SolutionError::UnknownVariable {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> SolutionResult<Value> {
        let term = self.term(name)?;
        Ok(self.policy.to_host(term)?)
    }

    pub fn get_as<T: FromValue>(&self, name: &str) -> SolutionResult<T> {
        let term = self.term(name)?;
        Ok(self.policy.to_host_as(term)?)
    }

    /// The default variable's value in the current row.
    pub fn value(&self) -> SolutionResult<Value> {
        let name = self
            .default_variable
            .as_deref()
            .ok_or(SolutionError::NoDefaultVariable)?;
        self.get(name)
    }

    pub fn value_as<T: FromValue>(&self) -> SolutionResult<T> {
        let name = self
            .default_variable
            .as_deref()
            .ok_or(SolutionError::NoDefaultVariable)?;
        self.get_as(name)
    }

    // -----------------------------------------------------------------------
    // Bulk extraction
    // -----------------------------------------------------------------------

    /// Append the values of the first `outs.len()` variables, from the
    /// current row to the last, to `outs`. Leaves the cursor on the last row.
    pub fn collect(&mut self, outs: &mut [&mut Vec<Value>]) -> SolutionResult<()> {
        if outs.len() > self.variables.len() {
            return Err(SolutionError::CollectionCount {
                requested: outs.len(),
                available: self.variables.len(),
            });
        }
        let start = self.cursor.unwrap_or(0);
        for row in self.rows.iter().skip(start) {
            for (out, var) in outs.iter_mut().zip(&self.variables) {
                let term = row.get(var).ok_or_else(|| SolutionError::UnknownVariable {
                    name: var.clone(),
                })?;
                out.push(self.policy.to_host(term)?);
            }
        }
        if !self.rows.is_empty() {
            self.cursor = Some(self.rows.len() - 1);
        }
        Ok(())
    }

    /// One list per variable, from the current row to the last.
    pub fn to_lists(&mut self) -> SolutionResult<Vec<Vec<Value>>> {
        let mut lists = vec![Vec::new(); self.variables.len()];
        let mut outs: Vec<&mut Vec<Value>> = lists.iter_mut().collect();
        self.collect(&mut outs)?;
        Ok(lists)
    }

    /// Every value of `name`, converted to `T`, over all rows.
    pub fn collect_as<T: FromValue>(&self, name: &str) -> SolutionResult<Vec<T>> {
        self.rows
            .iter()
            .map(|row| -> SolutionResult<T> {
                let term = row.get(name).ok_or_else(|| SolutionError::UnknownVariable {
                    name: name.to_string(),
                })?;
                Ok(self.policy.to_host_as(term)?)
            })
            .collect()
    }

    /// All rows, in engine order.
    pub fn iter(&self) -> std::slice::Iter<'_, BindingRow> {
        self.rows.iter()
    }

    /// Rows not yet reached by [`fetch`](Self::fetch).
    pub fn remaining(&self) -> std::slice::Iter<'_, BindingRow> {
        let start = self.cursor.map_or(0, |i| i + 1).min(self.rows.len());
        self.rows[start..].iter()
    }
}

impl<'a> IntoIterator for &'a Solution {
    type Item = &'a BindingRow;
    type IntoIter = std::slice::Iter<'a, BindingRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
