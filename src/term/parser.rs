//! Term reader: tokenization and operator-precedence parsing.
//!
//! Reads the engine's standard term syntax, which covers everything the
//! engines print back and everything a goal pattern normally contains:
//! 1. **Tokenize**: names, quoted atoms with escapes, variables, numbers
//!    (including `0'c`, radix and special floats), strings, punctuation and
//!    the end-of-clause `.`
//! 2. **Parse**: Pratt-style reader over the default operator table, with
//!    functional notation, lists with tails, and curly terms
//!
//! Double-quoted and back-quoted strings are read as atoms.

use crate::error::{TermError, TermResult};

use super::{LIST_CONS, Term};

const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

/// Deepest nesting of arguments, operands and brackets the parser accepts.
pub const MAX_DEPTH: usize = 256;

/// Byte-level source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Name(String),
    Quoted(String),
    Var(String),
    /// Magnitude only; the parser applies a leading `-` and range-checks.
    Int(u64),
    Float(f64),
    Str(String),
    Punct(char),
    End,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    span: Span,
    /// Whitespace or a comment came right before this token.
    layout_before: bool,
}

/// Read a single term. A trailing end-of-clause `.` is accepted.
pub fn parse_term(text: &str) -> TermResult<Term> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: text.len(),
        depth: 0,
    };
    if parser.peek().is_none() {
        return Err(TermError::UnexpectedEnd { offset: 0 });
    }
    let (term, _) = parser.parse(1200)?;
    if matches!(parser.peek().map(|t| &t.tok), Some(Tok::End)) {
        parser.pos += 1;
    }
    match parser.peek() {
        Some(token) => Err(TermError::TrailingInput {
            offset: token.span.start,
        }),
        None => Ok(term),
    }
}

/// Read a goal. Like [`parse_term`], and a leading `?-` is dropped.
pub fn parse_goal(text: &str) -> TermResult<Term> {
    match parse_term(text)? {
        Term::Compound { functor, mut args } if functor == "?-" && args.len() == 1 => {
            Ok(args.remove(0))
        }
        term => Ok(term),
    }
}

/// Named variables of `text` in order of first appearance, from tokens alone.
///
/// Works on text the reader cannot fully parse, e.g. goals using operators
/// declared in the knowledge base. `_`-prefixed variables are skipped.
pub fn scan_variables(text: &str) -> TermResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for token in Lexer::new(text).tokenize()? {
        if let Tok::Var(name) = token.tok
            && !name.starts_with('_')
            && !out.contains(&name)
        {
            out.push(name);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn tokenize(mut self) -> TermResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let layout_before = self.skip_layout()?;
            let start = self.pos;
            let Some(tok) = self.next_tok()? else {
                break;
            };
            tokens.push(Token {
                tok,
                span: Span {
                    start,
                    end: self.pos,
                },
                layout_before,
            });
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn syntax(&self, message: impl Into<String>) -> TermError {
        TermError::Syntax {
            message: message.into(),
            offset: self.pos,
        }
    }

    /// Skip whitespace and comments. Returns whether anything was skipped.
    fn skip_layout(&mut self) -> TermResult<bool> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('%') => {
                    self.take_while(|c| c != '\n');
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => {
                            return Err(TermError::UnexpectedEnd {
                                offset: self.src.len(),
                            });
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(self.pos > start)
    }

    fn next_tok(&mut self) -> TermResult<Option<Tok>> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let tok = match c {
            '0'..='9' => self.number()?,
            '_' => Tok::Var(self.take_while(is_alnum).to_string()),
            c if c.is_uppercase() => Tok::Var(self.take_while(is_alnum).to_string()),
            c if c.is_alphabetic() => Tok::Name(self.take_while(is_alnum).to_string()),
            '\'' => Tok::Quoted(self.quoted('\'')?),
            '"' => Tok::Str(self.quoted('"')?),
            '`' => Tok::Str(self.quoted('`')?),
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | '|' => {
                self.bump();
                Tok::Punct(c)
            }
            '!' | ';' => {
                self.bump();
                Tok::Name(c.to_string())
            }
            '.' if self
                .peek_at(1)
                .is_none_or(|n| n.is_whitespace() || n == '%') =>
            {
                self.bump();
                Tok::End
            }
            c if SYMBOL_CHARS.contains(c) => {
                Tok::Name(self.take_while(|c| SYMBOL_CHARS.contains(c)).to_string())
            }
            other => return Err(self.syntax(format!("unexpected character `{other}`"))),
        };
        Ok(Some(tok))
    }

    fn number(&mut self) -> TermResult<Tok> {
        let start = self.pos;
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('\'') => {
                    self.pos += 2;
                    return self.char_code();
                }
                Some(r @ ('x' | 'o' | 'b')) => {
                    let radix = match r {
                        'x' => 16,
                        'o' => 8,
                        _ => 2,
                    };
                    if self.peek_at(2).is_some_and(|c| c.is_digit(radix)) {
                        self.pos += 2;
                        let digits = self.take_while(|c| c.is_digit(radix));
                        return u64::from_str_radix(digits, radix)
                            .map(Tok::Int)
                            .map_err(|_| self.syntax("integer out of range"));
                    }
                }
                _ => {}
            }
        }

        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
            is_float = true;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
                is_float = true;
            }
        }
        let text = &self.src[start..self.pos];
        if is_float {
            let rest = &self.src[self.pos..];
            if rest.starts_with("Inf") {
                self.pos += 3;
                return Ok(Tok::Float(f64::INFINITY));
            }
            if rest.starts_with("NaN") {
                self.pos += 3;
                return Ok(Tok::Float(f64::NAN));
            }
            text.parse::<f64>()
                .map(Tok::Float)
                .map_err(|e| self.syntax(format!("invalid float `{text}`: {e}")))
        } else {
            text.parse::<u64>()
                .map(Tok::Int)
                .map_err(|_| self.syntax(format!("integer `{text}` out of range")))
        }
    }

    /// `0'c` character code literal, positioned after the quote.
    fn char_code(&mut self) -> TermResult<Tok> {
        let offset = self.pos;
        match self.bump() {
            Some('\\') => {
                let c = self.escape()?.ok_or_else(|| self.syntax("invalid escape"))?;
                Ok(Tok::Int(u64::from(c)))
            }
            Some('\'') => {
                // `0'''` and the lenient `0''` both denote the quote itself.
                if self.peek() == Some('\'') {
                    self.bump();
                }
                Ok(Tok::Int(u64::from('\'')))
            }
            Some(c) => Ok(Tok::Int(u64::from(c))),
            None => Err(TermError::UnexpectedEnd { offset }),
        }
    }

    fn quoted(&mut self, quote: char) -> TermResult<String> {
        let offset = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(TermError::UnexpectedEnd { offset }),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') => {
                    if let Some(c) = self.escape()? {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Decode an escape sequence, positioned after the backslash.
    /// Returns `None` for a line continuation.
    fn escape(&mut self) -> TermResult<Option<char>> {
        let offset = self.pos;
        let Some(c) = self.bump() else {
            return Err(TermError::UnexpectedEnd { offset });
        };
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            'e' => '\x1b',
            's' => ' ',
            '\n' => return Ok(None),
            '\\' | '\'' | '"' | '`' => c,
            'x' => {
                let digits = self.take_while(|c| c.is_ascii_hexdigit());
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| self.syntax("invalid hex escape"))?;
                if self.peek() == Some('\\') {
                    self.bump();
                }
                char::from_u32(code).ok_or_else(|| self.syntax("invalid character code"))?
            }
            'u' | 'U' => {
                let width = if c == 'u' { 4 } else { 8 };
                let end = (self.pos + width).min(self.src.len());
                let digits = self.src.get(self.pos..end).unwrap_or_default();
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| self.syntax("invalid unicode escape"))?;
                self.pos = end;
                char::from_u32(code).ok_or_else(|| self.syntax("invalid character code"))?
            }
            d @ '0'..='7' => {
                let mut code = d.to_digit(8).unwrap_or_default();
                while let Some(next) = self.peek().and_then(|c| c.to_digit(8)) {
                    code = code * 8 + next;
                    self.bump();
                }
                if self.peek() == Some('\\') {
                    self.bump();
                }
                char::from_u32(code).ok_or_else(|| self.syntax("invalid character code"))?
            }
            other => return Err(self.syntax(format!("unknown escape `\\{other}`"))),
        };
        Ok(Some(decoded))
    }
}

fn is_alnum(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Operator table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Infix {
    Xfx,
    Xfy,
    Yfx,
}

#[derive(Debug, Clone, Copy)]
enum Prefix {
    Fx,
    Fy,
}

fn infix_op(name: &str) -> Option<(u16, Infix)> {
    let op = match name {
        ":-" | "-->" => (1200, Infix::Xfx),
        ";" | "|" => (1100, Infix::Xfy),
        "->" | "*->" => (1050, Infix::Xfy),
        "," => (1000, Infix::Xfy),
        "::" => (990, Infix::Xfx),
        "=" | "\\=" | "==" | "\\==" | "@<" | "@>" | "@=<" | "@>=" | "=.." | "is" | "=:="
        | "=\\=" | "<" | ">" | "=<" | ">=" | ">:<" | ":<" | "as" => (700, Infix::Xfx),
        "+" | "-" | "/\\" | "\\/" | "xor" => (500, Infix::Yfx),
        "*" | "/" | "//" | "rem" | "mod" | "div" | "<<" | ">>" | "rdiv" => (400, Infix::Yfx),
        "**" => (200, Infix::Xfx),
        "^" | ":" => (200, Infix::Xfy),
        _ => return None,
    };
    Some(op)
}

fn prefix_op(name: &str) -> Option<(u16, Prefix)> {
    let op = match name {
        ":-" | "?-" => (1200, Prefix::Fx),
        "dynamic" | "discontiguous" | "initialization" | "table" => (1150, Prefix::Fx),
        "\\+" => (900, Prefix::Fy),
        "-" | "+" | "\\" => (200, Prefix::Fy),
        _ => return None,
    };
    Some(op)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    len: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> TermResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(TermError::UnexpectedEnd { offset: self.len })?;
        self.pos += 1;
        Ok(token)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.tok == Tok::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> TermResult<()> {
        let token = self.next()?;
        if token.tok == Tok::Punct(c) {
            Ok(())
        } else {
            Err(TermError::Syntax {
                message: format!("expected `{c}`"),
                offset: token.span.start,
            })
        }
    }

    /// Parse a term whose priority is at most `max`. Returns the term and its
    /// priority.
    ///
    /// Every nested argument, operand and bracketed term recurses through
    /// here. Errors abort the whole read, so `depth` is only restored on
    /// success.
    fn parse(&mut self, max: u16) -> TermResult<(Term, u16)> {
        if self.depth >= MAX_DEPTH {
            return Err(TermError::Syntax {
                message: format!("term nested deeper than {MAX_DEPTH} levels"),
                offset: self.peek().map_or(self.len, |t| t.span.start),
            });
        }
        self.depth += 1;
        let (mut left, mut left_prec) = self.parse_primary(max)?;
        loop {
            let Some(token) = self.peek() else { break };
            let name = match &token.tok {
                Tok::Name(n) => n.clone(),
                Tok::Punct(',') => ",".to_string(),
                Tok::Punct('|') => "|".to_string(),
                _ => break,
            };
            let Some((prec, kind)) = infix_op(&name) else {
                break;
            };
            let (left_max, right_max) = match kind {
                Infix::Xfx => (prec - 1, prec - 1),
                Infix::Xfy => (prec - 1, prec),
                Infix::Yfx => (prec, prec - 1),
            };
            if prec > max || left_prec > left_max {
                break;
            }
            self.pos += 1;
            let (right, _) = self.parse(right_max)?;
            left = Term::Compound {
                functor: name,
                args: vec![left, right],
            };
            left_prec = prec;
        }
        self.depth -= 1;
        Ok((left, left_prec))
    }

    fn parse_primary(&mut self, max: u16) -> TermResult<(Term, u16)> {
        let token = self.next()?;
        let term = match token.tok {
            Tok::Int(n) => Term::Integer(i64::try_from(n).map_err(|_| TermError::Syntax {
                message: format!("integer `{n}` out of range"),
                offset: token.span.start,
            })?),
            Tok::Float(x) => Term::Float(x),
            Tok::Var(name) => Term::Variable(name),
            Tok::Str(text) => Term::Atom(text),
            Tok::Punct('(') => {
                let (inner, _) = self.parse(1200)?;
                self.expect_punct(')')?;
                inner
            }
            Tok::Punct('[') => {
                if self.eat_punct(']') {
                    Term::List(Vec::new())
                } else {
                    self.parse_list()?
                }
            }
            Tok::Punct('{') => {
                if self.eat_punct('}') {
                    Term::Atom("{}".into())
                } else {
                    let (inner, _) = self.parse(1200)?;
                    self.expect_punct('}')?;
                    Term::Compound {
                        functor: "{}".into(),
                        args: vec![inner],
                    }
                }
            }
            Tok::Name(name) => return self.parse_name(name, false, max),
            Tok::Quoted(name) => return self.parse_name(name, true, max),
            Tok::Punct(c) => {
                return Err(TermError::Syntax {
                    message: format!("unexpected `{c}`"),
                    offset: token.span.start,
                });
            }
            Tok::End => {
                return Err(TermError::Syntax {
                    message: "unexpected end of clause".into(),
                    offset: token.span.start,
                });
            }
        };
        Ok((term, 0))
    }

    fn parse_name(&mut self, name: String, quoted: bool, max: u16) -> TermResult<(Term, u16)> {
        if let Some(next) = self.peek()
            && next.tok == Tok::Punct('(')
            && !next.layout_before
        {
            self.pos += 1;
            let mut args = vec![self.parse(999)?.0];
            while self.eat_punct(',') {
                args.push(self.parse(999)?.0);
            }
            self.expect_punct(')')?;
            return Ok((Term::Compound { functor: name, args }, 0));
        }

        if quoted {
            return Ok((Term::Atom(name), 0));
        }

        if name == "-"
            && let Some(next) = self.peek()
            && !next.layout_before
        {
            match next.tok {
                Tok::Int(n) => {
                    let offset = next.span.start;
                    let value = i64::try_from(-i128::from(n)).map_err(|_| TermError::Syntax {
                        message: format!("integer `-{n}` out of range"),
                        offset,
                    })?;
                    self.pos += 1;
                    return Ok((Term::Integer(value), 0));
                }
                Tok::Float(x) => {
                    self.pos += 1;
                    return Ok((Term::Float(-x), 0));
                }
                _ => {}
            }
        }

        if let Some((prec, kind)) = prefix_op(&name)
            && self.operand_follows()
        {
            let prec = prec.min(max);
            let arg_max = match kind {
                Prefix::Fx => prec.saturating_sub(1),
                Prefix::Fy => prec,
            };
            let (arg, _) = self.parse(arg_max)?;
            return Ok((
                Term::Compound {
                    functor: name,
                    args: vec![arg],
                },
                prec,
            ));
        }

        Ok((Term::Atom(name), 0))
    }

    /// Whether the next token can start the operand of a prefix operator.
    fn operand_follows(&self) -> bool {
        match self.peek().map(|t| &t.tok) {
            None | Some(Tok::End) => false,
            Some(Tok::Punct(c)) => matches!(c, '(' | '[' | '{'),
            Some(Tok::Name(n)) => infix_op(n).is_none() || prefix_op(n).is_some(),
            Some(_) => true,
        }
    }

    fn parse_list(&mut self) -> TermResult<Term> {
        let mut items = vec![self.parse(999)?.0];
        while self.eat_punct(',') {
            items.push(self.parse(999)?.0);
        }
        let tail = if self.eat_punct('|') {
            Some(self.parse(999)?.0)
        } else {
            None
        };
        self.expect_punct(']')?;
        Ok(build_list(items, tail))
    }
}

fn build_list(mut items: Vec<Term>, tail: Option<Term>) -> Term {
    match tail {
        None => Term::List(items),
        Some(Term::List(rest)) => {
            items.extend(rest);
            Term::List(items)
        }
        Some(tail) => items.into_iter().rev().fold(tail, |acc, item| Term::Compound {
            functor: LIST_CONS.into(),
            args: vec![item, acc],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(functor: &str, args: Vec<Term>) -> Term {
        Term::compound(functor, args)
    }

    #[test]
    fn parses_atoms_numbers_and_variables() {
        assert_eq!(parse_term("foo").unwrap(), Term::atom("foo"));
        assert_eq!(parse_term("42").unwrap(), Term::Integer(42));
        assert_eq!(parse_term("-7").unwrap(), Term::Integer(-7));
        assert_eq!(parse_term("3.25").unwrap(), Term::Float(3.25));
        assert_eq!(parse_term("1.0e10").unwrap(), Term::Float(1.0e10));
        assert_eq!(parse_term("X").unwrap(), Term::var("X"));
        assert_eq!(parse_term("_G123").unwrap(), Term::var("_G123"));
        assert_eq!(parse_term("0'a").unwrap(), Term::Integer(97));
        assert_eq!(parse_term("0xff").unwrap(), Term::Integer(255));
    }

    #[test]
    fn parses_quoted_atoms_and_strings() {
        assert_eq!(parse_term("'hello world'").unwrap(), Term::atom("hello world"));
        assert_eq!(parse_term("'it''s'").unwrap(), Term::atom("it's"));
        assert_eq!(parse_term(r"'a\nb'").unwrap(), Term::atom("a\nb"));
        assert_eq!(parse_term(r"'\x41\'").unwrap(), Term::atom("A"));
        assert_eq!(parse_term("\"text\"").unwrap(), Term::atom("text"));
    }

    #[test]
    fn parses_compounds_and_lists() {
        assert_eq!(
            parse_term("member(X, [0, 1, 2]).").unwrap(),
            c(
                "member",
                vec![
                    Term::var("X"),
                    Term::List(vec![Term::Integer(0), Term::Integer(1), Term::Integer(2)])
                ]
            )
        );
        assert_eq!(parse_term("[]").unwrap(), Term::List(vec![]));
        assert_eq!(
            parse_term("[a|[b]]").unwrap(),
            Term::List(vec![Term::atom("a"), Term::atom("b")])
        );
        assert_eq!(
            parse_term("[a|T]").unwrap(),
            c(LIST_CONS, vec![Term::atom("a"), Term::var("T")])
        );
    }

    #[test]
    fn respects_operator_priorities() {
        assert_eq!(
            parse_term("X = 1 + 2 * 3").unwrap(),
            c(
                "=",
                vec![
                    Term::var("X"),
                    c(
                        "+",
                        vec![
                            Term::Integer(1),
                            c("*", vec![Term::Integer(2), Term::Integer(3)])
                        ]
                    )
                ]
            )
        );
        assert_eq!(
            parse_term("1 - 2 - 3").unwrap(),
            c(
                "-",
                vec![
                    c("-", vec![Term::Integer(1), Term::Integer(2)]),
                    Term::Integer(3)
                ]
            )
        );
        assert_eq!(
            parse_term("a :- b, c ; d").unwrap(),
            c(
                ":-",
                vec![
                    Term::atom("a"),
                    c(
                        ";",
                        vec![c(",", vec![Term::atom("b"), Term::atom("c")]), Term::atom("d")]
                    )
                ]
            )
        );
    }

    #[test]
    fn prefix_operators() {
        assert_eq!(
            parse_term("\\+ foo(X)").unwrap(),
            c("\\+", vec![c("foo", vec![Term::var("X")])])
        );
        assert_eq!(parse_term("- a").unwrap(), c("-", vec![Term::atom("a")]));
        assert_eq!(parse_term("-(1)").unwrap(), c("-", vec![Term::Integer(1)]));
        assert_eq!(parse_term("f(-)").unwrap(), c("f", vec![Term::atom("-")]));
        assert_eq!(
            parse_term("- = x").unwrap(),
            c("=", vec![Term::atom("-"), Term::atom("x")])
        );
    }

    #[test]
    fn probabilistic_facts_and_rules() {
        assert_eq!(
            parse_term("0.5::heads1.").unwrap(),
            c("::", vec![Term::Float(0.5), Term::atom("heads1")])
        );
        let rule = parse_term("0.3::a :- b, c.").unwrap();
        assert_eq!(rule.functor(), Some(":-"));
    }

    #[test]
    fn canonical_output_reads_back() {
        for text in ["f(1,'A b',[0,1])", "=(X,1)", "','(a,b)", "[1,2|T]", "{a}", "'it\\'s'"] {
            let term = parse_term(text).unwrap();
            assert_eq!(parse_term(&term.to_string()).unwrap(), term, "{text}");
        }
    }

    #[test]
    fn comments_are_layout() {
        assert_eq!(
            parse_term("foo( % first\n a /* second */ )").unwrap(),
            c("foo", vec![Term::atom("a")])
        );
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(
            parse_term("foo(").unwrap_err(),
            TermError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse_term("'unterminated").unwrap_err(),
            TermError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse_term("a b").unwrap_err(),
            TermError::TrailingInput { offset: 2 }
        ));
        assert!(parse_term("f(a,)").is_err());
        assert!(parse_term("").is_err());
    }

    #[test]
    fn integer_range_includes_i64_min() {
        assert_eq!(
            parse_term("-9223372036854775808").unwrap(),
            Term::Integer(i64::MIN)
        );
        assert_eq!(
            parse_term("9223372036854775807").unwrap(),
            Term::Integer(i64::MAX)
        );
        assert_eq!(
            parse_term("f(-9223372036854775808)").unwrap(),
            c("f", vec![Term::Integer(i64::MIN)])
        );
        assert!(matches!(
            parse_term("9223372036854775808").unwrap_err(),
            TermError::Syntax { offset: 0, .. }
        ));
        assert!(parse_term("-9223372036854775809").is_err());
        assert!(parse_term("99999999999999999999999").is_err());
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let depth = 50_000;
        let text = format!("{}0{}", "s(".repeat(depth), ")".repeat(depth));
        match parse_term(&text).unwrap_err() {
            TermError::Syntax { message, .. } => assert!(message.contains("nested")),
            other => panic!("unexpected error: {other:?}"),
        }

        let text = format!("[{}]", "[".repeat(depth) + &"]".repeat(depth));
        assert!(parse_term(&text).is_err());
    }

    #[test]
    fn long_conjunction_is_rejected_without_overflow() {
        let goals: Vec<String> = (0..2_000).map(|i| format!("g{i}")).collect();
        let text = format!("({})", goals.join(","));
        assert!(parse_term(&text).is_err());
    }

    #[test]
    fn nesting_below_the_limit_parses() {
        let depth = MAX_DEPTH - 8;
        let text = format!("{}0{}", "s(".repeat(depth), ")".repeat(depth));
        let mut term = &parse_term(&text).unwrap();
        let mut levels = 0;
        while let Term::Compound { args, .. } = term {
            term = &args[0];
            levels += 1;
        }
        assert_eq!(levels, depth);
        assert_eq!(term, &Term::Integer(0));
    }

    #[test]
    fn goal_prefix_is_dropped() {
        assert_eq!(parse_goal("?- true.").unwrap(), Term::atom("true"));
    }

    #[test]
    fn scan_variables_without_full_parse() {
        let vars = scan_variables("X likes Y, Y likes _Z, X likes W.").unwrap();
        assert_eq!(vars, vec!["X", "Y", "W"]);
    }
}
