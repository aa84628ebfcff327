//! Engine-neutral term model.
//!
//! A [`Term`] is what the engine reads and writes: atoms, numbers, compound
//! structures, lists and variables. Logical connectives (conjunction `,`,
//! disjunction `;`, unification `=`) are ordinary compounds with operator
//! functors; [`Term::connective`] recognises them when decoding goals.
//!
//! Terms are immutable once built. Text goes in through [`parser`] and comes
//! out through the `Display` impl in [`write`].

pub mod parser;
pub mod write;

use std::collections::HashSet;

pub use parser::{parse_goal, parse_term};

/// Functor used for a list cell whose tail is not a proper list (`[H|T]`).
pub const LIST_CONS: &str = "[|]";

/// A logic-programming term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// An atom. Strings read back from the engine are atoms too.
    Atom(String),
    Integer(i64),
    Float(f64),
    /// A functor applied to one or more arguments.
    Compound { functor: String, args: Vec<Term> },
    /// A proper list. `[]` is the empty list.
    List(Vec<Term>),
    /// A named variable. `_` is the anonymous variable.
    Variable(String),
}

/// Logical connectives the engine uses to combine goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    Conjunction,
    Disjunction,
    Unification,
}

impl Connective {
    pub fn functor(self) -> &'static str {
        match self {
            Self::Conjunction => ",",
            Self::Disjunction => ";",
            Self::Unification => "=",
        }
    }
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// The anonymous variable `_`.
    pub fn anonymous() -> Self {
        Self::Variable("_".into())
    }

    /// Build a compound term. Zero arguments yield an atom.
    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        let functor = functor.into();
        if args.is_empty() {
            Self::Atom(functor)
        } else {
            Self::Compound { functor, args }
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Atoms and compounds: the terms that can stand as a goal.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Atom(_) | Self::Compound { .. })
    }

    /// Functor name of an atom or compound.
    pub fn functor(&self) -> Option<&str> {
        match self {
            Self::Atom(name) => Some(name),
            Self::Compound { functor, .. } => Some(functor),
            _ => None,
        }
    }

    /// Number of arguments of an atom (0) or compound.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Atom(_) => Some(0),
            Self::Compound { args, .. } => Some(args.len()),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Self::Compound { args, .. } => args,
            _ => &[],
        }
    }

    /// Which connective this term is, if any.
    pub fn connective(&self) -> Option<Connective> {
        match self {
            Self::Compound { functor, args } if args.len() == 2 => match functor.as_str() {
                "," => Some(Connective::Conjunction),
                ";" => Some(Connective::Disjunction),
                "=" => Some(Connective::Unification),
                _ => None,
            },
            _ => None,
        }
    }

    /// Flatten a right-nested chain of one connective into its operands.
    ///
    /// `(a, b, c)` with [`Connective::Conjunction`] yields `[a, b, c]`; any
    /// other term yields itself.
    pub fn operands(&self, connective: Connective) -> Vec<&Term> {
        let mut out = Vec::new();
        let mut current = self;
        while current.connective() == Some(connective) {
            let args = current.args();
            out.push(&args[0]);
            current = &args[1];
        }
        out.push(current);
        out
    }

    /// Structural equality where an unbound variable on either side matches
    /// anything. No bindings are recorded, so `f(X, X)` matches `f(1, 2)`.
    pub fn matches(&self, other: &Term) -> bool {
        match (self, other) {
            (Self::Variable(_), _) | (_, Self::Variable(_)) => true,
            (Self::Atom(a), Self::Atom(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (
                Self::Compound { functor: f1, args: a1 },
                Self::Compound { functor: f2, args: a2 },
            ) => f1 == f2 && a1.len() == a2.len() && pairwise_match(a1, a2),
            (Self::List(a), Self::List(b)) => a.len() == b.len() && pairwise_match(a, b),
            _ => false,
        }
    }

    /// Named variables in depth-first, left-to-right order of first occurrence.
    ///
    /// Variables whose name starts with `_` are "don't care" variables and are
    /// not reported.
    pub fn free_variables(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_variables(&mut seen, &mut out);
        out
    }

    fn collect_variables(&self, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        match self {
            Self::Variable(name) => {
                if !name.starts_with('_') && seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
            Self::Compound { args, .. } | Self::List(args) => {
                for arg in args {
                    arg.collect_variables(seen, out);
                }
            }
            _ => {}
        }
    }
}

fn pairwise_match(a: &[Term], b: &[Term]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.matches(y))
}

// ---------------------------------------------------------------------------
// Structural term classes
// ---------------------------------------------------------------------------

/// Structural class of a term, used to key term-to-host converters.
///
/// Classes form a small hierarchy: a converter registered for
/// [`TermClass::Number`] sees both integers and floats unless a more specific
/// class has its own converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermClass {
    Integer,
    Float,
    Number,
    Atom,
    Compound,
    Callable,
    List,
    Variable,
    Any,
}

impl TermClass {
    pub fn of(term: &Term) -> Self {
        match term {
            Term::Atom(_) => Self::Atom,
            Term::Integer(_) => Self::Integer,
            Term::Float(_) => Self::Float,
            Term::Compound { .. } => Self::Compound,
            Term::List(_) => Self::List,
            Term::Variable(_) => Self::Variable,
        }
    }

    /// This class followed by its ancestors, most specific first.
    pub fn lineage(self) -> &'static [TermClass] {
        use TermClass::*;
        match self {
            Integer => &[Integer, Number, Any],
            Float => &[Float, Number, Any],
            Number => &[Number, Any],
            Atom => &[Atom, Callable, Any],
            Compound => &[Compound, Callable, Any],
            Callable => &[Callable, Any],
            List => &[List, Any],
            Variable => &[Variable, Any],
            Any => &[Any],
        }
    }
}

impl std::fmt::Display for TermClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Number => "number",
            Self::Atom => "atom",
            Self::Compound => "compound",
            Self::Callable => "callable",
            Self::List => "list",
            Self::Variable => "variable",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}
