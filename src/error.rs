//! Rich diagnostic error types for prover-bridge.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Logical failure of a
//! goal is never an error: it is a [`Solution`](crate::solution::Solution) whose
//! `is_success()` is false.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for prover-bridge.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solution(#[from] SolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Term text errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TermError {
    #[error("syntax error at byte {offset}: {message}")]
    #[diagnostic(
        code(bridge::term::syntax),
        help(
            "The text is not a valid term. Check for balanced brackets, \
             closed quotes, and operators written with their arguments."
        )
    )]
    Syntax { message: String, offset: usize },

    #[error("unexpected end of input after byte {offset}")]
    #[diagnostic(
        code(bridge::term::unexpected_end),
        help("The term stops in the middle. A closing bracket or quote is probably missing.")
    )]
    UnexpectedEnd { offset: usize },

    #[error("unexpected text after the term at byte {offset}")]
    #[diagnostic(
        code(bridge::term::trailing_input),
        help("Only a single term (optionally followed by `.`) can be read here.")
    )]
    TrailingInput { offset: usize },
}

pub type TermResult<T> = std::result::Result<T, TermError>;

// ---------------------------------------------------------------------------
// Conversion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConversionError {
    #[error("no suitable converter found for {subject}")]
    #[diagnostic(
        code(bridge::convert::no_converter),
        help(
            "No registered converter accepted this value after the full \
             exact-type, supertype and interface walk. Register one with \
             `register_object_converter` or `register_term_converter`."
        )
    )]
    NoConverterFound { subject: String },

    #[error("cannot read {found} as {expected}")]
    #[diagnostic(
        code(bridge::convert::type_mismatch),
        help("Request the value with a type that matches the bound term, or use `Value`.")
    )]
    TypeMismatch { expected: String, found: String },

    #[error("{term} is not a compound term")]
    #[diagnostic(
        code(bridge::convert::not_compound),
        help("Functor, arity and argument accessors only apply to atoms and compound terms.")
    )]
    NotCompound { term: String },

    #[error("argument index {index} out of range for arity {arity}")]
    #[diagnostic(code(bridge::convert::arg_index), help("Argument indices start at zero."))]
    ArgIndex { index: usize, arity: usize },

    #[error("pattern has {expected} placeholder(s) but {actual} argument(s) were given")]
    #[diagnostic(
        code(bridge::convert::pattern_arity),
        help("Pass exactly one argument per `?` placeholder in the term pattern.")
    )]
    PatternArity { expected: usize, actual: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),
}

pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

// ---------------------------------------------------------------------------
// Query contract errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("goal expects {expected} more argument(s) but {actual} were given")]
    #[diagnostic(
        code(bridge::query::placeholder_count),
        help(
            "The number of arguments passed to `solve` plus the placeholders \
             already bound with `bind` must equal the placeholders in the pattern."
        )
    )]
    PlaceholderCount { expected: usize, actual: usize },

    #[error("unknown placeholder: {name}")]
    #[diagnostic(
        code(bridge::query::unknown_placeholder),
        help("Named placeholders are written `?Name` in the goal pattern.")
    )]
    UnknownPlaceholder { name: String },

    #[error("placeholder index {index} out of range ({count} placeholder(s))")]
    #[diagnostic(
        code(bridge::query::placeholder_index),
        help("Placeholder indices follow their first occurrence in the pattern, starting at zero.")
    )]
    PlaceholderIndex { index: usize, count: usize },

    #[error("placeholder {name} is already bound")]
    #[diagnostic(
        code(bridge::query::already_bound),
        help("Create a fresh query from the pattern to bind a different value.")
    )]
    AlreadyBound { name: String },

    #[error("invalid fact `{fact}`: {message}")]
    #[diagnostic(
        code(bridge::query::invalid_fact),
        help("Asserted facts must be atoms or compound terms, e.g. `parent(tom, bob).`")
    )]
    InvalidFact { fact: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

// ---------------------------------------------------------------------------
// Engine / protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("no usable {engine} executable found")]
    #[diagnostic(
        code(bridge::engine::prover_creation),
        help(
            "Install the engine and make sure it is on PATH, or set `executable` \
             in the prover-bridge config file."
        )
    )]
    ProverCreation { engine: String },

    #[error("failed to start `{command}`")]
    #[diagnostic(
        code(bridge::engine::spawn),
        help("Check that the executable exists and is runnable by the current user.")
    )]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write engine script")]
    #[diagnostic(
        code(bridge::engine::script),
        help("Check that the temporary directory exists and is writable.")
    )]
    Script {
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}")]
    #[diagnostic(
        code(bridge::engine::exit_status),
        help("The engine could not produce a result. Its captured output follows:\n{output}")
    )]
    ExitStatus {
        command: String,
        status: i32,
        output: String,
    },

    #[error("engine reported an error for goal `{goal}`: {message}")]
    #[diagnostic(
        code(bridge::engine::reported),
        help("The engine rejected the goal or the knowledge base. Fix the reported problem and retry.")
    )]
    Reported { goal: String, message: String },

    #[error("failed to read theory file: {path}")]
    #[diagnostic(
        code(bridge::engine::theory_read),
        help("Ensure the theory file exists and is readable UTF-8 text.")
    )]
    TheoryRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("in-process engine failed: {message}")]
    #[diagnostic(code(bridge::engine::in_process))]
    InProcess { message: String },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

// ---------------------------------------------------------------------------
// Solution errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SolutionError {
    #[error("unknown variable: {name}")]
    #[diagnostic(
        code(bridge::solution::unknown_variable),
        help(
            "The variable is not bound in the current row. Only free variables \
             of the goal are reported, and failed solutions have no rows."
        )
    )]
    UnknownVariable { name: String },

    #[error("no default variable selected")]
    #[diagnostic(
        code(bridge::solution::no_default_variable),
        help("The goal had no free variables. Select one with `on(name)` or read by name.")
    )]
    NoDefaultVariable,

    #[error("{requested} collection(s) requested but the goal has {available} variable(s)")]
    #[diagnostic(
        code(bridge::solution::collection_count),
        help("Pass at most one destination collection per free variable.")
    )]
    CollectionCount { requested: usize, available: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),
}

pub type SolutionResult<T> = std::result::Result<T, SolutionError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(bridge::config::no_home),
        help("Set the HOME environment variable or pass an explicit config path.")
    )]
    NoHome,

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(bridge::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(bridge::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(bridge::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for functions returning prover-bridge results.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_converts_to_bridge_error() {
        let err = QueryError::UnknownPlaceholder { name: "List".into() };
        let bridge: BridgeError = err.into();
        assert!(matches!(
            bridge,
            BridgeError::Query(QueryError::UnknownPlaceholder { .. })
        ));
    }

    #[test]
    fn conversion_error_wraps_term_error() {
        let term_err = TermError::UnexpectedEnd { offset: 3 };
        let conv: ConversionError = term_err.into();
        assert!(matches!(
            conv,
            ConversionError::Term(TermError::UnexpectedEnd { offset: 3 })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = QueryError::PlaceholderCount {
            expected: 2,
            actual: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains('2'));
        assert!(msg.contains('1'));

        let err = EngineError::Reported {
            goal: "foo(X).".into(),
            message: "Unknown procedure: foo/1".into(),
        };
        assert!(format!("{err}").contains("foo(X)."));
    }
}
