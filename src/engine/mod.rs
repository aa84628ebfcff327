//! Prover sessions.
//!
//! A [`Prover`] owns one knowledge base, one conversion policy, one dialect
//! and one backend. Solving a goal:
//! 1. collects the goal's free variables
//! 2. renders knowledge base + enumeration wrapper into a script
//! 3. runs the script on the backend and captures its output
//! 4. escalates engine error lines, then a non-zero exit status
//! 5. decodes the remaining output into a [`Solution`]
//!
//! Logical failure is not an error: a goal with no solutions yields an
//! unsuccessful `Solution`.

pub mod backend;
pub mod dialect;
pub mod executable;
pub mod knowledge;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::convert::{ConversionPolicy, Value};
use crate::error::{BridgeResult, EngineError};
use crate::query::{Binding, Query};
use crate::solution::Solution;
use crate::term::parser::{parse_goal, scan_variables};

pub use backend::{EngineBackend, EngineOutput, InProcessBackend, ProcessBackend};
pub use dialect::{Diagnostics, Dialect, ProblogDialect, SwiDialect};
pub use executable::{
    Executable, ExecutableProvider, FixedExecutable, PRIORITY_LOWEST, PathProbe, ProviderRegistry,
};
pub use knowledge::KnowledgeBase;

/// Supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// SWI-Prolog.
    #[default]
    Swi,
    /// ProbLog: rows carry probabilities.
    Problog,
}

impl EngineKind {
    /// Command looked up on `PATH`.
    pub fn default_command(self) -> &'static str {
        match self {
            Self::Swi => "swipl",
            Self::Problog => "problog",
        }
    }

    /// Libraries every new session loads unless configured otherwise.
    pub fn default_libraries(self) -> &'static [&'static str] {
        match self {
            Self::Swi => &[],
            Self::Problog => &["lists"],
        }
    }

    pub fn policy(self) -> ConversionPolicy {
        match self {
            Self::Swi => ConversionPolicy::swi(),
            Self::Problog => ConversionPolicy::problog(),
        }
    }

    pub fn dialect(self, diagnostics: Diagnostics) -> Box<dyn Dialect> {
        match self {
            Self::Swi => Box::new(SwiDialect::new(diagnostics)),
            Self::Problog => Box::new(ProblogDialect::new(diagnostics)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swi => f.write_str("swi"),
            Self::Problog => f.write_str("problog"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swi" | "swipl" | "swi-prolog" => Ok(Self::Swi),
            "problog" => Ok(Self::Problog),
            other => Err(format!("unknown engine `{other}` (expected `swi` or `problog`)")),
        }
    }
}

/// Free variables of a goal, in textual order of first occurrence: a
/// depth-first, left-to-right walk, so `foo(bar(Y), X)` gives `[Y, X]`. The
/// last of them is a solution's default variable for
/// [`Solution::value`](crate::solution::Solution::value).
///
/// Goals the term reader cannot parse (e.g. ones using operators declared in
/// the knowledge base) fall back to a token scan.
pub fn free_variables(goal: &str) -> Vec<String> {
    match parse_goal(goal) {
        Ok(term) => term.free_variables(),
        Err(e) => {
            tracing::debug!(error = %e, goal, "goal not readable, scanning tokens for variables");
            scan_variables(goal).unwrap_or_default()
        }
    }
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

/// One reasoning session.
pub struct Prover {
    kind: EngineKind,
    dialect: Box<dyn Dialect>,
    policy: Arc<ConversionPolicy>,
    knowledge: KnowledgeBase,
    backend: Box<dyn EngineBackend>,
}

impl fmt::Debug for Prover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prover")
            .field("kind", &self.kind)
            .field("backend", &self.backend.describe())
            .field("knowledge_entries", &self.knowledge.len())
            .finish()
    }
}

impl Prover {
    pub fn builder(kind: EngineKind) -> ProverBuilder {
        ProverBuilder::new(kind)
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn policy(&self) -> &ConversionPolicy {
        &self.policy
    }

    /// Mutable access for registering converters. Solutions already handed
    /// out keep the policy they were decoded with.
    pub fn policy_mut(&mut self) -> &mut ConversionPolicy {
        Arc::make_mut(&mut self.policy)
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn describe_backend(&self) -> String {
        self.backend.describe()
    }

    // -----------------------------------------------------------------------
    // Knowledge base
    // -----------------------------------------------------------------------

    pub fn add_theory(&mut self, clause: impl Into<String>) {
        self.knowledge.add_theory(clause);
    }

    pub fn add_theories<I, S>(&mut self, clauses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.knowledge.add_theories(clauses);
    }

    pub fn load_theory(&mut self, text: &str) {
        self.knowledge.load_theory(text);
    }

    pub fn load_theory_file(&mut self, path: &Path) -> BridgeResult<()> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::TheoryRead {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded theory file");
        self.knowledge.load_theory(&text);
        Ok(())
    }

    pub fn load_library(&mut self, name: &str) {
        self.knowledge.load_library(name);
    }

    /// Add a fact or rule built from a pattern, e.g.
    /// `assertz("parent(?, ?)", &[..])`.
    pub fn assertz(&mut self, pattern: &str, args: &[Value]) -> BridgeResult<()> {
        let fact = Binding::new(pattern).goal_string(args, &self.policy)?;
        self.knowledge.assertz(&fact)?;
        Ok(())
    }

    pub fn retract(&mut self, fact: &str) {
        self.knowledge.retract(fact);
    }

    // -----------------------------------------------------------------------
    // Solving
    // -----------------------------------------------------------------------

    pub fn query(&self, pattern: &str) -> Query<'_> {
        Query::new(self, pattern)
    }

    /// Compile `pattern`, fill its placeholders from `args`, and solve.
    pub fn solve(&self, pattern: &str, args: &[Value]) -> BridgeResult<Solution> {
        self.query(pattern).solve(args)
    }

    /// The script `solve` would send for a concrete goal.
    pub fn script(&self, goal: &str) -> String {
        let variables = free_variables(goal);
        self.dialect.script(&self.knowledge, goal, &variables)
    }

    pub(crate) fn solve_goal(&self, goal: &str) -> BridgeResult<Solution> {
        let variables = free_variables(goal);
        let script = self.dialect.script(&self.knowledge, goal, &variables);
        tracing::debug!(engine = %self.kind, goal, variables = ?variables, "solving goal");
        tracing::trace!(script = %script, "engine script");

        let output = self.backend.run(self.dialect.as_ref(), &script)?;

        let diagnostics = self.dialect.diagnostics();
        for warning in diagnostics.warnings(&output.text) {
            tracing::warn!(engine = %self.kind, message = warning, "engine warning");
        }
        if let Some(message) = diagnostics.first_error(&output.text) {
            return Err(EngineError::Reported {
                goal: goal.to_string(),
                message,
            }
            .into());
        }
        if !output.success() {
            return Err(EngineError::ExitStatus {
                command: self.backend.describe(),
                status: output.status.unwrap_or(-1),
                output: output.text,
            }
            .into());
        }

        let solution = self
            .dialect
            .decode(&output.text, &variables, Arc::clone(&self.policy));
        match solution.failure_reason() {
            Some(reason) => tracing::debug!(goal, reason, "decode failed"),
            None => tracing::debug!(goal, rows = solution.len(), "solved"),
        }
        Ok(solution)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Creates [`Prover`] sessions.
///
/// Without an explicit backend the builder resolves an executable through its
/// providers; a `PATH` probe for the engine's default command is always
/// registered at [`PRIORITY_LOWEST`].
pub struct ProverBuilder {
    kind: EngineKind,
    policy: Option<ConversionPolicy>,
    providers: ProviderRegistry,
    probe_command: Option<String>,
    probe_args: Option<Vec<String>>,
    backend: Option<Box<dyn EngineBackend>>,
    engine_args: Vec<String>,
    libraries: Option<Vec<String>>,
    diagnostics: Diagnostics,
}

impl fmt::Debug for ProverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProverBuilder")
            .field("kind", &self.kind)
            .field("providers", &self.providers)
            .field("backend", &self.backend.as_ref().map(|b| b.describe()))
            .field("engine_args", &self.engine_args)
            .field("libraries", &self.libraries)
            .finish_non_exhaustive()
    }
}

impl ProverBuilder {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            policy: None,
            providers: ProviderRegistry::new(),
            probe_command: None,
            probe_args: None,
            backend: None,
            engine_args: Vec::new(),
            libraries: None,
            diagnostics: Diagnostics::for_engine(kind),
        }
    }

    /// Builder preconfigured from a [`BridgeConfig`].
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut builder = Self::new(config.engine);
        if let Some(program) = &config.executable {
            let mut exe = Executable::new(program);
            for (key, value) in &config.env {
                exe = exe.with_env(key, value);
            }
            for dir in &config.library_path {
                exe = exe.with_path_entry("LD_LIBRARY_PATH", dir);
            }
            builder.providers.register(FixedExecutable::new(exe, 0));
        }
        builder.probe_command = config.command.clone();
        builder.probe_args = Some(config.probe_args.clone());
        builder.engine_args = config.engine_args.clone();
        builder.libraries = config.libraries.clone();
        if let Some(prefixes) = &config.error_prefixes {
            builder.diagnostics.error_prefixes = prefixes.clone();
        }
        if let Some(prefixes) = &config.warning_prefixes {
            builder.diagnostics.warning_prefixes = prefixes.clone();
        }
        builder
    }

    pub fn policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn provider(mut self, provider: impl ExecutableProvider + 'static) -> Self {
        self.providers.register(provider);
        self
    }

    /// Run scripts on this backend instead of a discovered executable.
    pub fn backend(mut self, backend: impl EngineBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn engine_args(mut self, args: Vec<String>) -> Self {
        self.engine_args = args;
        self
    }

    /// Libraries loaded into the new session, replacing the engine default.
    pub fn libraries(mut self, libraries: Vec<String>) -> Self {
        self.libraries = Some(libraries);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The provider registry with the `PATH` probe added.
    pub fn into_providers(mut self) -> ProviderRegistry {
        self.register_path_probe();
        self.providers
    }

    fn register_path_probe(&mut self) {
        let command = self
            .probe_command
            .clone()
            .unwrap_or_else(|| self.kind.default_command().to_string());
        let mut probe = PathProbe::new(command);
        if let Some(args) = &self.probe_args {
            probe = probe.with_probe_args(args.clone());
        }
        self.providers.register(probe);
    }

    pub fn build(mut self) -> BridgeResult<Prover> {
        let backend: Box<dyn EngineBackend> = match self.backend.take() {
            Some(backend) => backend,
            None => {
                self.register_path_probe();
                let exe = self
                    .providers
                    .resolve()
                    .cloned()
                    .ok_or_else(|| EngineError::ProverCreation {
                        engine: self.kind.to_string(),
                    })?;
                Box::new(ProcessBackend::new(exe, std::mem::take(&mut self.engine_args)))
            }
        };

        let mut knowledge = KnowledgeBase::new();
        let libraries = self.libraries.take().unwrap_or_else(|| {
            self.kind
                .default_libraries()
                .iter()
                .map(ToString::to_string)
                .collect()
        });
        for library in libraries {
            knowledge.load_library(library);
        }

        let policy = self.policy.take().unwrap_or_else(|| self.kind.policy());

        tracing::info!(engine = %self.kind, backend = %backend.describe(), "prover session ready");

        Ok(Prover {
            kind: self.kind,
            dialect: self.kind.dialect(self.diagnostics),
            policy: Arc::new(policy),
            knowledge,
            backend,
        })
    }
}
