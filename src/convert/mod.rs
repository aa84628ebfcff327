//! Conversion policy: type-directed translation between host values and terms.
//!
//! A [`ConversionPolicy`] holds three converter tables:
//! - **object converters**, keyed by [`TypeTag`] and consulted in the order
//!   given by [`TypeRegistry::precedence`];
//! - **term converters**, keyed by structural [`TermClass`] and consulted
//!   along [`TermClass::lineage`];
//! - **functor converters**, keyed by `name` or `name/arity`, consulted first
//!   when decoding atoms and compounds, most recently registered first.
//!
//! Every converter may decline by returning `Ok(None)`; lookup then moves on
//! to the next candidate. Each session owns its policy; there is no global one.

pub mod registry;
pub mod value;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConversionError, ConversionResult};
use crate::query::pattern::GoalPattern;
use crate::term::{Term, TermClass, parse_term};

pub use registry::{TypeRegistry, TypeTag};
pub use value::{Compound, FromValue, HostObject, Value};

/// Converts a host value to a term, or declines.
pub type ObjectConverter =
    Arc<dyn Fn(&Value, &ConversionPolicy) -> ConversionResult<Option<Term>> + Send + Sync>;

/// Converts a term to a host value, or declines.
pub type TermConverter =
    Arc<dyn Fn(&Term, &ConversionPolicy) -> ConversionResult<Option<Value>> + Send + Sync>;

#[derive(Clone)]
pub struct ConversionPolicy {
    types: TypeRegistry,
    object_converters: HashMap<TypeTag, ObjectConverter>,
    term_converters: HashMap<TermClass, TermConverter>,
    functor_converters: HashMap<String, TermConverter>,
    /// Functor keys in registration order; the last entry is tried first.
    functor_order: Vec<String>,
}

impl fmt::Debug for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut objects: Vec<_> = self.object_converters.keys().map(TypeTag::name).collect();
        objects.sort_unstable();
        f.debug_struct("ConversionPolicy")
            .field("object_converters", &objects)
            .field("term_converters", &self.term_converters.len())
            .field("functor_converters", &self.functor_order)
            .finish()
    }
}

impl ConversionPolicy {
    /// A policy with the built-in type hierarchy and no converters.
    pub fn empty() -> Self {
        Self {
            types: TypeRegistry::default(),
            object_converters: HashMap::new(),
            term_converters: HashMap::new(),
            functor_converters: HashMap::new(),
            functor_order: Vec::new(),
        }
    }

    /// Converters for the built-in value kinds.
    ///
    /// Integers, floats, strings, lists, arrays and compounds map to their
    /// term counterparts and back. Zero-argument compounds become atoms and
    /// atoms decode as strings.
    pub fn standard() -> Self {
        let mut policy = Self::empty();

        policy.register_object_converter(TypeTag::INT, |v, _| {
            Ok(match v {
                Value::Int(n) => Some(Term::Integer(*n)),
                _ => None,
            })
        });
        policy.register_object_converter(TypeTag::FLOAT, |v, _| {
            Ok(match v {
                Value::Float(x) => Some(Term::Float(*x)),
                _ => None,
            })
        });
        policy.register_object_converter(TypeTag::STRING, |v, _| {
            Ok(match v {
                Value::Str(s) => Some(Term::Atom(s.clone())),
                _ => None,
            })
        });
        policy.register_object_converter(TypeTag::LIST, convert_sequence);
        policy.register_object_converter(TypeTag::ARRAY, convert_sequence);
        policy.register_object_converter(TypeTag::COMPOUND, |v, p| match v {
            Value::Compound(c) => {
                let args = c
                    .args
                    .iter()
                    .map(|a| p.to_term(a))
                    .collect::<ConversionResult<Vec<_>>>()?;
                Ok(Some(Term::compound(c.functor.clone(), args)))
            }
            _ => Ok(None),
        });
        policy.register_object_converter(TypeTag::TERM, |v, _| {
            Ok(match v {
                Value::Term(t) => Some(t.clone()),
                _ => None,
            })
        });

        policy.register_term_converter(TermClass::Integer, |t, _| {
            Ok(match t {
                Term::Integer(n) => Some(Value::Int(*n)),
                _ => None,
            })
        });
        policy.register_term_converter(TermClass::Float, |t, _| {
            Ok(match t {
                Term::Float(x) => Some(Value::Float(*x)),
                _ => None,
            })
        });
        policy.register_term_converter(TermClass::Atom, |t, _| {
            Ok(match t {
                Term::Atom(name) => Some(Value::Str(name.clone())),
                _ => None,
            })
        });
        policy.register_term_converter(TermClass::List, |t, p| match t {
            Term::List(items) => Ok(Some(Value::List(
                items
                    .iter()
                    .map(|i| p.to_host(i))
                    .collect::<ConversionResult<Vec<_>>>()?,
            ))),
            _ => Ok(None),
        });
        policy.register_term_converter(TermClass::Compound, |t, p| match t {
            Term::Compound { functor, args } => {
                let args = args
                    .iter()
                    .map(|a| p.to_host(a))
                    .collect::<ConversionResult<Vec<_>>>()?;
                Ok(Some(Value::Compound(Compound::new(functor.clone(), args))))
            }
            _ => Ok(None),
        });

        policy
    }

    /// The SWI-Prolog policy: [`standard`](Self::standard), except that a
    /// string already wrapped in single quotes loses one quote layer before it
    /// becomes an atom, so `'text'` and `text` name the same atom.
    pub fn swi() -> Self {
        let mut policy = Self::standard();
        policy.register_object_converter(TypeTag::STRING, |v, _| {
            Ok(match v {
                Value::Str(s) => Some(Term::Atom(strip_quote_layer(s).to_string())),
                _ => None,
            })
        });
        policy
    }

    /// The ProbLog policy. ProbLog prints terms in the same syntax, so this
    /// is the standard table.
    pub fn problog() -> Self {
        Self::standard()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a host-to-term converter for `tag`, replacing any earlier one.
    pub fn register_object_converter<F>(&mut self, tag: TypeTag, f: F)
    where
        F: Fn(&Value, &ConversionPolicy) -> ConversionResult<Option<Term>> + Send + Sync + 'static,
    {
        self.object_converters.insert(tag, Arc::new(f));
    }

    /// Register a term-to-host converter for a structural class, replacing any
    /// earlier one.
    pub fn register_term_converter<F>(&mut self, class: TermClass, f: F)
    where
        F: Fn(&Term, &ConversionPolicy) -> ConversionResult<Option<Value>> + Send + Sync + 'static,
    {
        self.term_converters.insert(class, Arc::new(f));
    }

    /// Register a term-to-host converter for a functor.
    ///
    /// `key` is either `name` (any arity) or `name/arity`. Registering a key
    /// again replaces its converter and makes it the most recent.
    pub fn register_functor_converter<F>(&mut self, key: impl Into<String>, f: F)
    where
        F: Fn(&Term, &ConversionPolicy) -> ConversionResult<Option<Value>> + Send + Sync + 'static,
    {
        let key = key.into();
        self.functor_order.retain(|k| k != &key);
        self.functor_order.push(key.clone());
        self.functor_converters.insert(key, Arc::new(f));
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Convert a host value to a term.
    ///
    /// `Null` is the anonymous variable. Arrays use only the array converter;
    /// every other value walks its type precedence and the first converter
    /// that accepts wins.
    pub fn to_term(&self, value: &Value) -> ConversionResult<Term> {
        if let Value::Null = value {
            return Ok(Term::anonymous());
        }
        let candidates = match value {
            Value::Array(_) => vec![TypeTag::ARRAY],
            other => self.types.precedence(other.type_tag()),
        };
        for tag in candidates {
            if let Some(convert) = self.object_converters.get(&tag)
                && let Some(term) = convert(value, self)?
            {
                return Ok(term);
            }
        }
        Err(ConversionError::NoConverterFound {
            subject: format!("value of type `{}`", value.type_tag()),
        })
    }

    /// Convert a term to a host value.
    ///
    /// Unbound variables decode to `Null`. Atoms and compounds try functor
    /// converters first, then every term walks its structural lineage.
    pub fn to_host(&self, term: &Term) -> ConversionResult<Value> {
        if term.is_variable() {
            return Ok(Value::Null);
        }
        if let (Some(functor), Some(arity)) = (term.functor(), term.arity()) {
            for key in self.functor_order.iter().rev() {
                if !functor_key_matches(key, functor, arity) {
                    continue;
                }
                if let Some(convert) = self.functor_converters.get(key)
                    && let Some(value) = convert(term, self)?
                {
                    return Ok(value);
                }
            }
        }
        for class in TermClass::of(term).lineage() {
            if let Some(convert) = self.term_converters.get(class)
                && let Some(value) = convert(term, self)?
            {
                return Ok(value);
            }
        }
        Err(ConversionError::NoConverterFound {
            subject: format!("{} term `{term}`", TermClass::of(term)),
        })
    }

    /// Convert a term to a specific host type.
    pub fn to_host_as<T: FromValue>(&self, term: &Term) -> ConversionResult<T> {
        T::from_value(self.to_host(term)?)
    }

    // -----------------------------------------------------------------------
    // Term primitives
    // -----------------------------------------------------------------------

    pub fn matches(&self, a: &Term, b: &Term) -> bool {
        a.matches(b)
    }

    pub fn is_integer(&self, term: &Term) -> bool {
        matches!(term, Term::Integer(_))
    }

    pub fn is_double(&self, term: &Term) -> bool {
        matches!(term, Term::Float(_))
    }

    pub fn is_atom(&self, term: &Term) -> bool {
        matches!(term, Term::Atom(_))
    }

    pub fn is_compound(&self, term: &Term) -> bool {
        matches!(term, Term::Compound { .. })
    }

    pub fn functor<'t>(&self, term: &'t Term) -> ConversionResult<&'t str> {
        term.functor().ok_or_else(|| ConversionError::NotCompound {
            term: term.to_string(),
        })
    }

    pub fn arity(&self, term: &Term) -> ConversionResult<usize> {
        term.arity().ok_or_else(|| ConversionError::NotCompound {
            term: term.to_string(),
        })
    }

    /// The `index`-th argument (zero-based) of a compound.
    pub fn arg<'t>(&self, term: &'t Term, index: usize) -> ConversionResult<&'t Term> {
        let arity = self.arity(term)?;
        term.args()
            .get(index)
            .ok_or(ConversionError::ArgIndex { index, arity })
    }

    pub fn term_int(&self, n: i64) -> Term {
        Term::Integer(n)
    }

    pub fn term_float(&self, x: f64) -> Term {
        Term::Float(x)
    }

    pub fn term_atom(&self, name: &str) -> Term {
        Term::atom(name)
    }

    /// Build a term from a pattern with `?` placeholders, one argument each.
    ///
    /// `term_pattern("point(?, ?)", &[1.into(), 2.into()])` is `point(1,2)`.
    pub fn term_pattern(&self, pattern: &str, args: &[Value]) -> ConversionResult<Term> {
        let compiled = GoalPattern::compile(pattern);
        let names = compiled.placeholders();
        if names.len() != args.len() {
            return Err(ConversionError::PatternArity {
                expected: names.len(),
                actual: args.len(),
            });
        }
        let mut replacements = HashMap::with_capacity(args.len());
        for (name, arg) in names.iter().zip(args) {
            replacements.insert(name.clone(), self.to_term(arg)?.to_string());
        }
        Ok(parse_term(&compiled.render(&replacements))?)
    }
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn convert_sequence(value: &Value, policy: &ConversionPolicy) -> ConversionResult<Option<Term>> {
    match value {
        Value::List(items) | Value::Array(items) => {
            let terms = items
                .iter()
                .map(|i| policy.to_term(i))
                .collect::<ConversionResult<Vec<_>>>()?;
            Ok(Some(Term::List(terms)))
        }
        _ => Ok(None),
    }
}

/// Drop one surrounding pair of single quotes, if present.
fn strip_quote_layer(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn functor_key_matches(key: &str, functor: &str, arity: usize) -> bool {
    if let Some((name, n)) = key.rsplit_once('/')
        && !name.is_empty()
        && let Ok(n) = n.parse::<usize>()
    {
        return name == functor && n == arity;
    }
    key == functor
}
