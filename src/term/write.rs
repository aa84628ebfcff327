//! Term serialization.
//!
//! Output is the engine's quoted canonical syntax: atoms are quoted when they
//! would not read back as the same atom, compounds are written in functional
//! notation, floats always carry a decimal point. Reading the output with
//! [`parse_term`](super::parse_term) gives back an equal term.

use std::fmt::{self, Write as _};

use super::{LIST_CONS, Term};

const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => write_atom(f, name),
            Term::Integer(n) => write!(f, "{n}"),
            Term::Float(x) => f.write_str(&format_float(*x)),
            Term::Variable(name) => f.write_str(name),
            Term::List(items) => {
                f.write_char('[')?;
                write_args(f, items)?;
                f.write_char(']')
            }
            Term::Compound { functor, args } if functor == LIST_CONS && args.len() == 2 => {
                write_partial_list(f, self)
            }
            Term::Compound { functor, args } if functor == "{}" && args.len() == 1 => {
                write!(f, "{{{}}}", args[0])
            }
            Term::Compound { functor, args } => {
                if functor == "[]" || functor == "{}" {
                    write_quoted(f, functor)?;
                } else {
                    write_atom(f, functor)?;
                }
                f.write_char('(')?;
                write_args(f, args)?;
                f.write_char(')')
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn write_partial_list(f: &mut fmt::Formatter<'_>, term: &Term) -> fmt::Result {
    f.write_char('[')?;
    let mut current = term;
    let mut first = true;
    loop {
        match current {
            Term::Compound { functor, args } if functor == LIST_CONS && args.len() == 2 => {
                if !first {
                    f.write_char(',')?;
                }
                write!(f, "{}", args[0])?;
                first = false;
                current = &args[1];
            }
            Term::List(rest) => {
                for item in rest {
                    write!(f, ",{item}")?;
                }
                break;
            }
            tail => {
                write!(f, "|{tail}")?;
                break;
            }
        }
    }
    f.write_char(']')
}

fn write_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if atom_needs_quotes(name) {
        write_quoted(f, name)
    } else {
        f.write_str(name)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in name.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\x{:x}\\", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

/// Whether an atom must be quoted to read back as itself.
pub fn atom_needs_quotes(name: &str) -> bool {
    if matches!(name, "[]" | "{}" | "!" | ";") {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if first.is_lowercase() {
        return !chars.all(|c| c.is_alphanumeric() || c == '_');
    }
    if SYMBOL_CHARS.contains(first) {
        let symbolic = name.chars().all(|c| SYMBOL_CHARS.contains(c));
        return !symbolic || name == "." || name.starts_with("/*");
    }
    true
}

/// Format a float so it reads back as a float, never as an integer.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "1.5NaN".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "1.0Inf".into() } else { "-1.0Inf".into() };
    }
    let text = format!("{x:?}");
    if text.contains('.') {
        return text;
    }
    match text.find('e') {
        Some(pos) => format!("{}.0{}", &text[..pos], &text[pos..]),
        None => format!("{text}.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_atoms_are_unquoted() {
        assert_eq!(Term::atom("foo").to_string(), "foo");
        assert_eq!(Term::atom("fooBar_1").to_string(), "fooBar_1");
        assert_eq!(Term::atom("[]").to_string(), "[]");
        assert_eq!(Term::atom("=..").to_string(), "=..");
    }

    #[test]
    fn atoms_that_need_quotes() {
        assert_eq!(Term::atom("Hello").to_string(), "'Hello'");
        assert_eq!(Term::atom("hello world").to_string(), "'hello world'");
        assert_eq!(Term::atom("").to_string(), "''");
        assert_eq!(Term::atom(",").to_string(), "','");
        assert_eq!(Term::atom("it's").to_string(), "'it\\'s'");
        assert_eq!(Term::atom("a\nb").to_string(), "'a\\nb'");
        assert_eq!(Term::atom("_x").to_string(), "'_x'");
        assert_eq!(Term::atom("1a").to_string(), "'1a'");
    }

    #[test]
    fn floats_keep_their_decimal_point() {
        assert_eq!(Term::Float(1.0).to_string(), "1.0");
        assert_eq!(Term::Float(0.3).to_string(), "0.3");
        assert_eq!(Term::Float(-2.5).to_string(), "-2.5");
        assert_eq!(Term::Float(1e21).to_string(), "1.0e21");
        assert_eq!(Term::Float(f64::INFINITY).to_string(), "1.0Inf");
    }

    #[test]
    fn compounds_and_lists() {
        let t = Term::compound(
            "f",
            vec![
                Term::Integer(1),
                Term::atom("A b"),
                Term::List(vec![Term::Integer(0), Term::Integer(1)]),
            ],
        );
        assert_eq!(t.to_string(), "f(1,'A b',[0,1])");
        assert_eq!(Term::List(vec![]).to_string(), "[]");
    }

    #[test]
    fn operator_compounds_use_canonical_form() {
        let t = Term::compound("=", vec![Term::var("X"), Term::Integer(1)]);
        assert_eq!(t.to_string(), "=(X,1)");
        let t = Term::compound(",", vec![Term::atom("a"), Term::atom("b")]);
        assert_eq!(t.to_string(), "','(a,b)");
    }

    #[test]
    fn partial_lists_and_curly_terms() {
        let t = Term::compound(
            LIST_CONS,
            vec![
                Term::Integer(1),
                Term::compound(LIST_CONS, vec![Term::Integer(2), Term::var("T")]),
            ],
        );
        assert_eq!(t.to_string(), "[1,2|T]");
        let t = Term::compound("{}", vec![Term::atom("a")]);
        assert_eq!(t.to_string(), "{a}");
    }
}
