//! Session knowledge base: an ordered, append-only log of clauses and
//! mutations, plus the set of predicates that must be declared dynamic.
//!
//! The log stays engine-neutral; each [`Dialect`](super::dialect::Dialect)
//! renders it into its own script syntax.

use std::collections::HashSet;
use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::term::{Term, parse_term};

/// `name/arity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateIndicator {
    pub name: String,
    pub arity: usize,
}

impl fmt::Display for PredicateIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Term::atom(self.name.as_str()), self.arity)
    }
}

/// One knowledge-base log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Theory text, passed to the engine verbatim.
    Clause(String),
    /// A library to load, e.g. `lists`.
    Library(String),
    /// A fact added at load time. Stored without the trailing `.`.
    Assert(Term),
    /// A fact removed at load time. Stored without the trailing `.`.
    Retract(String),
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<Entry>,
    dynamic: Vec<PredicateIndicator>,
    declared: HashSet<PredicateIndicator>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Predicates to declare dynamic, in first-assert order.
    pub fn dynamic_predicates(&self) -> &[PredicateIndicator] {
        &self.dynamic
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_theory(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Clause(text.into()));
    }

    pub fn add_theories<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in texts {
            self.add_theory(text);
        }
    }

    /// Append a multi-line theory, one entry per line. Blank lines are kept
    /// so engine line numbers in diagnostics stay meaningful.
    pub fn load_theory(&mut self, text: &str) {
        for line in text.lines() {
            self.add_theory(line);
        }
    }

    pub fn load_library(&mut self, name: impl Into<String>) {
        self.entries.push(Entry::Library(name.into()));
    }

    /// Record a fact or rule to add, declaring its predicate dynamic on
    /// first use. A rule `Head :- Body` declares the predicate of `Head`.
    pub fn assertz(&mut self, fact: &str) -> QueryResult<()> {
        let text = strip_clause_end(fact);
        let invalid = |message: String| QueryError::InvalidFact {
            fact: text.to_string(),
            message,
        };
        let term = parse_term(text).map_err(|e| invalid(e.to_string()))?;
        let head = match rule_parts(&term) {
            Some((head, _)) => head,
            None if matches!(term.functor(), Some(":-" | "?-")) => {
                return Err(invalid("directives cannot be asserted".into()));
            }
            None => &term,
        };
        let indicator = match head {
            Term::Atom(name) => PredicateIndicator {
                name: name.clone(),
                arity: 0,
            },
            Term::Compound { functor, args } => PredicateIndicator {
                name: functor.clone(),
                arity: args.len(),
            },
            other => return Err(invalid(format!("`{other}` is not callable"))),
        };
        if self.declared.insert(indicator.clone()) {
            self.dynamic.push(indicator);
        }
        self.entries.push(Entry::Assert(term));
        Ok(())
    }

    /// Record a fact to remove.
    pub fn retract(&mut self, fact: &str) {
        self.entries
            .push(Entry::Retract(strip_clause_end(fact).to_string()));
    }
}

/// Head and body of a `Head :- Body` rule.
pub(crate) fn rule_parts(term: &Term) -> Option<(&Term, &Term)> {
    match term {
        Term::Compound { functor, args } if functor == ":-" && args.len() == 2 => {
            Some((&args[0], &args[1]))
        }
        _ => None,
    }
}

/// Clause text for an asserted term, with rules in operator form.
pub(crate) fn clause_text(term: &Term) -> String {
    match rule_parts(term) {
        Some((head, body)) => format!("{head} :- {body}"),
        None => term.to_string(),
    }
}

/// Trim whitespace and one trailing end-of-clause `.`.
pub(crate) fn strip_clause_end(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix('.').map(str::trim_end).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut kb = KnowledgeBase::new();
        kb.add_theory("a.");
        kb.load_library("lists");
        kb.add_theories(["b.", "c."]);
        assert_eq!(
            kb.entries(),
            &[
                Entry::Clause("a.".into()),
                Entry::Library("lists".into()),
                Entry::Clause("b.".into()),
                Entry::Clause("c.".into()),
            ]
        );
    }

    #[test]
    fn load_theory_splits_lines() {
        let mut kb = KnowledgeBase::new();
        kb.load_theory("p(1).\np(2).\n");
        assert_eq!(kb.len(), 2);
    }

    #[test]
    fn assertz_declares_dynamic_once() {
        let mut kb = KnowledgeBase::new();
        kb.assertz("parent(tom, bob).").unwrap();
        kb.assertz("parent(bob, ann)").unwrap();
        kb.assertz("ready.").unwrap();
        assert_eq!(
            kb.dynamic_predicates()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["parent/2", "ready/0"]
        );
        assert_eq!(kb.len(), 3);
    }

    #[test]
    fn assertz_rejects_non_callable() {
        let mut kb = KnowledgeBase::new();
        assert!(matches!(
            kb.assertz("42.").unwrap_err(),
            QueryError::InvalidFact { .. }
        ));
        assert!(matches!(
            kb.assertz("foo(").unwrap_err(),
            QueryError::InvalidFact { .. }
        ));
        assert!(kb.is_empty());
    }

    #[test]
    fn assertz_rule_declares_head_predicate() {
        let mut kb = KnowledgeBase::new();
        kb.assertz("happy(X) :- rich(X).").unwrap();
        kb.assertz("ready :- true").unwrap();
        assert_eq!(
            kb.dynamic_predicates()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["happy/1", "ready/0"]
        );
        assert_eq!(kb.len(), 2);
    }

    #[test]
    fn assertz_rejects_directives_and_bad_heads() {
        let mut kb = KnowledgeBase::new();
        for text in [":- dynamic(foo/1).", "?- foo.", "1 :- foo.", "X :- foo."] {
            assert!(
                matches!(kb.assertz(text).unwrap_err(), QueryError::InvalidFact { .. }),
                "{text}"
            );
        }
        assert!(kb.is_empty());
        assert!(kb.dynamic_predicates().is_empty());
    }

    #[test]
    fn clause_text_keeps_rules_readable() {
        let rule = parse_term("happy(X) :- rich(X), \\+ sad(X)").unwrap();
        assert_eq!(clause_text(&rule), "happy(X) :- ','(rich(X),\\+(sad(X)))");
        assert_eq!(parse_term(&clause_text(&rule)).unwrap(), rule);
        let fact = parse_term("parent(tom, bob)").unwrap();
        assert_eq!(clause_text(&fact), "parent(tom,bob)");
    }

    #[test]
    fn retract_strips_clause_end() {
        let mut kb = KnowledgeBase::new();
        kb.retract("parent(tom, _). ");
        assert_eq!(kb.entries(), &[Entry::Retract("parent(tom, _)".into())]);
    }

    #[test]
    fn indicator_quotes_name() {
        let pi = PredicateIndicator {
            name: "Odd name".into(),
            arity: 1,
        };
        assert_eq!(pi.to_string(), "'Odd name'/1");
    }
}
