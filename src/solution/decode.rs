//! Decoders for captured engine output.
//!
//! Plain output (SWI-Prolog) is one record per line:
//!
//! ```text
//! $sol<TAB>0<TAB>foo(bar)
//! $sol<TAB>1<TAB>'Baz'
//! $end
//! ```
//!
//! Each field is the canonical text of one free variable's binding. A goal
//! without free variables prints a bare `$sol` per solution. Lines that are
//! neither records nor the end marker are ignored, so user `write/1` output
//! does not disturb decoding.
//!
//! Weighted output (ProbLog) is one `head: probability` line per ground
//! query head.

use std::sync::Arc;

use crate::convert::ConversionPolicy;
use crate::engine::Diagnostics;
use crate::term::{Term, parse_term};

use super::{BindingRow, Solution, SuccessCriterion};

/// Starts every plain solution record.
pub const SOLUTION_MARKER: &str = "$sol";
/// Printed once after the last solution.
pub const END_MARKER: &str = "$end";
/// Head of the generated query rule in weighted scripts.
pub const QUERY_HEAD: &str = "pb_query";

/// Decode plain record output.
///
/// The solution fails on an engine error line, an unreadable or
/// wrong-width record, or a missing end marker.
pub fn decode_plain(
    output: &str,
    variables: &[String],
    diagnostics: &Diagnostics,
    policy: Arc<ConversionPolicy>,
) -> Solution {
    let fail = |reason: String| {
        Solution::failed(variables.to_vec(), reason, SuccessCriterion::AnyRow, Arc::clone(&policy))
    };

    let mut rows = Vec::new();
    let mut ended = false;
    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if diagnostics.is_error(line) {
            return fail(format!("engine error: {}", line.trim()));
        }
        if line.trim() == END_MARKER {
            ended = true;
            break;
        }
        let Some(rest) = line.strip_prefix(SOLUTION_MARKER) else {
            continue;
        };
        let fields: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else if let Some(fields) = rest.strip_prefix('\t') {
            fields.split('\t').collect()
        } else {
            continue;
        };
        if fields.len() != variables.len() {
            return fail(format!(
                "record has {} field(s) for {} variable(s)",
                fields.len(),
                variables.len()
            ));
        }
        let mut bindings = Vec::with_capacity(fields.len());
        for (var, field) in variables.iter().zip(fields) {
            match parse_term(field) {
                Ok(term) => bindings.push((var.clone(), term)),
                Err(e) => return fail(format!("unreadable binding for {var}: {e}")),
            }
        }
        rows.push(BindingRow::new(bindings, None));
    }

    if !ended {
        return fail("output ended before the end marker".to_string());
    }
    tracing::trace!(rows = rows.len(), "decoded plain output");
    Solution::new(variables.to_vec(), rows, SuccessCriterion::AnyRow, policy)
}

/// Decode weighted `head: probability` output.
///
/// Every non-blank, non-warning line must be a query-head result with a
/// probability in `[0, 1]`; anything else fails the whole solution.
pub fn decode_weighted(
    output: &str,
    variables: &[String],
    diagnostics: &Diagnostics,
    policy: Arc<ConversionPolicy>,
) -> Solution {
    let fail = |reason: String| {
        Solution::failed(
            variables.to_vec(),
            reason,
            SuccessCriterion::MeanProbabilityOne,
            Arc::clone(&policy),
        )
    };

    let mut rows = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || diagnostics.is_warning(line) {
            continue;
        }
        if diagnostics.is_error(line) {
            return fail(format!("engine error: {line}"));
        }
        let Some((head, probability)) = line.rsplit_once(':') else {
            return fail(format!("malformed result line: {line}"));
        };
        let probability = match probability.trim().parse::<f64>() {
            Ok(p) if (0.0..=1.0).contains(&p) => p,
            _ => return fail(format!("invalid probability in: {line}")),
        };
        let head = match parse_term(head.trim()) {
            Ok(head) => head,
            Err(e) => return fail(format!("unreadable result head `{}`: {e}", head.trim())),
        };
        let Some(args) = query_args(&head, variables.len()) else {
            return fail(format!("unexpected result head: {head}"));
        };
        let bindings = variables.iter().cloned().zip(args.iter().cloned()).collect();
        rows.push(BindingRow::new(bindings, Some(probability)));
    }

    tracing::trace!(rows = rows.len(), "decoded weighted output");
    Solution::new(
        variables.to_vec(),
        rows,
        SuccessCriterion::MeanProbabilityOne,
        policy,
    )
}

fn query_args(head: &Term, arity: usize) -> Option<&[Term]> {
    match head {
        Term::Atom(name) if arity == 0 && name == QUERY_HEAD => Some(&[]),
        Term::Compound { functor, args } if functor == QUERY_HEAD && args.len() == arity => {
            Some(args)
        }
        _ => None,
    }
}
