//! Engine dialects: script construction, command line, diagnostics, decoding.
//!
//! A script is the rendered knowledge base followed by an enumeration wrapper
//! around the goal. The wrapper makes the engine print one record per
//! solution in a fixed encoding that the matching decoder in
//! [`solution::decode`](crate::solution::decode) reads back.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::convert::ConversionPolicy;
use crate::solution::Solution;
use crate::solution::decode::{END_MARKER, QUERY_HEAD, SOLUTION_MARKER, decode_plain, decode_weighted};
use crate::term::{Term, parse_term};

use super::EngineKind;
use super::knowledge::{Entry, KnowledgeBase, clause_text, strip_clause_end};

/// Line prefixes that mark engine errors and warnings in captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub error_prefixes: Vec<String>,
    pub warning_prefixes: Vec<String>,
}

impl Diagnostics {
    pub fn for_engine(kind: EngineKind) -> Self {
        let errors: &[&str] = match kind {
            EngineKind::Swi => &["ERROR"],
            EngineKind::Problog => &[
                "Error",
                "ERROR",
                "UnknownClause",
                "ParseError",
                "NonGroundProbabilisticClause",
                "GroundingError",
            ],
        };
        let warnings: &[&str] = match kind {
            EngineKind::Swi => &["Warning:", "WARNING"],
            EngineKind::Problog => &["Warning", "WARNING"],
        };
        Self {
            error_prefixes: errors.iter().map(ToString::to_string).collect(),
            warning_prefixes: warnings.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn is_error(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.error_prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }

    pub fn is_warning(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.warning_prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }

    /// The first error line and any lines after it, joined.
    pub fn first_error(&self, output: &str) -> Option<String> {
        let lines: Vec<&str> = output.lines().collect();
        let start = lines.iter().position(|l| self.is_error(l))?;
        Some(lines[start..].join("\n").trim_end().to_string())
    }

    pub fn warnings<'a>(&self, output: &'a str) -> Vec<&'a str> {
        output.lines().filter(|l| self.is_warning(l)).collect()
    }
}

/// Everything engine-specific about running a goal.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> EngineKind;

    fn diagnostics(&self) -> &Diagnostics;

    /// File suffix for the transient script.
    fn script_suffix(&self) -> &str {
        ".pl"
    }

    /// Arguments after the executable's own, given the script path.
    fn command_args(&self, script: &Path) -> Vec<OsString>;

    fn render_knowledge_base(&self, kb: &KnowledgeBase) -> String;

    /// The enumeration wrapper for `goal` over its free variables.
    fn wrap_goal(&self, goal: &str, variables: &[String]) -> String;

    /// Decode captured output into a solution.
    fn decode(&self, output: &str, variables: &[String], policy: Arc<ConversionPolicy>) -> Solution;

    /// Knowledge base plus wrapper: the complete script.
    fn script(&self, kb: &KnowledgeBase, goal: &str, variables: &[String]) -> String {
        let mut script = self.render_knowledge_base(kb);
        script.push_str(&self.wrap_goal(goal, variables));
        script
    }
}

// ---------------------------------------------------------------------------
// SWI-Prolog
// ---------------------------------------------------------------------------

/// SWI-Prolog command line: `swipl -q -f <script> -g halt`.
///
/// Each solution prints on its own line as the solution marker followed by a
/// tab-separated `write_canonical` rendering of every free variable. A
/// terminal marker follows the last solution, so a missing marker means the
/// enumeration was cut short.
#[derive(Debug, Clone)]
pub struct SwiDialect {
    diagnostics: Diagnostics,
}

impl SwiDialect {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl Default for SwiDialect {
    fn default() -> Self {
        Self::new(Diagnostics::for_engine(EngineKind::Swi))
    }
}

impl Dialect for SwiDialect {
    fn kind(&self) -> EngineKind {
        EngineKind::Swi
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn command_args(&self, script: &Path) -> Vec<OsString> {
        vec![
            "-q".into(),
            "-f".into(),
            script.as_os_str().to_owned(),
            "-g".into(),
            "halt".into(),
        ]
    }

    fn render_knowledge_base(&self, kb: &KnowledgeBase) -> String {
        let mut out = String::new();
        for pi in kb.dynamic_predicates() {
            out.push_str(&format!(":- dynamic({pi}).\n"));
        }
        for entry in kb.entries() {
            match entry {
                Entry::Clause(text) => out.push_str(text),
                Entry::Library(name) => {
                    out.push_str(&format!(":- use_module(library({})).", Term::atom(name.as_str())));
                }
                Entry::Assert(fact) => {
                    out.push_str(&format!(":- assertz(({})).", clause_text(fact)));
                }
                Entry::Retract(fact) => out.push_str(&format!(":- retract(({fact})).")),
            }
            out.push('\n');
        }
        out
    }

    fn wrap_goal(&self, goal: &str, variables: &[String]) -> String {
        let goal = strip_clause_end(goal);
        let mut record = format!("nl, write('{SOLUTION_MARKER}')");
        for var in variables {
            record.push_str(&format!(", write('\\t'), write_canonical({var})"));
        }
        format!(
            ":- forall(call(({goal})), ({record}, nl)), nl, write('{END_MARKER}'), nl.\n"
        )
    }

    fn decode(&self, output: &str, variables: &[String], policy: Arc<ConversionPolicy>) -> Solution {
        decode_plain(output, variables, &self.diagnostics, policy)
    }
}

// ---------------------------------------------------------------------------
// ProbLog
// ---------------------------------------------------------------------------

/// ProbLog command line: `problog <script>`.
///
/// The goal becomes the body of a query rule whose head carries the free
/// variables; ProbLog prints one `head: probability` line per ground head.
/// ProbLog has no load-time assert, so asserted facts are rendered as plain
/// clauses and a retract removes the earliest earlier fact it matches.
#[derive(Debug, Clone)]
pub struct ProblogDialect {
    diagnostics: Diagnostics,
}

impl ProblogDialect {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl Default for ProblogDialect {
    fn default() -> Self {
        Self::new(Diagnostics::for_engine(EngineKind::Problog))
    }
}

impl Dialect for ProblogDialect {
    fn kind(&self) -> EngineKind {
        EngineKind::Problog
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn command_args(&self, script: &Path) -> Vec<OsString> {
        vec![script.as_os_str().to_owned()]
    }

    fn render_knowledge_base(&self, kb: &KnowledgeBase) -> String {
        let mut lines: Vec<Option<String>> = Vec::new();
        let mut facts: Vec<(usize, &Term)> = Vec::new();
        for entry in kb.entries() {
            match entry {
                Entry::Clause(text) => lines.push(Some(text.clone())),
                Entry::Library(name) => lines.push(Some(format!(
                    ":- use_module(library({})).",
                    Term::atom(name.as_str())
                ))),
                Entry::Assert(fact) => {
                    facts.push((lines.len(), fact));
                    lines.push(Some(format!("{}.", clause_text(fact))));
                }
                Entry::Retract(text) => {
                    let Ok(pattern) = parse_term(text) else {
                        tracing::warn!(fact = %text, "unreadable retract ignored");
                        continue;
                    };
                    if let Some(pos) = facts.iter().position(|(_, f)| pattern.matches(f)) {
                        let (line, _) = facts.remove(pos);
                        lines[line] = None;
                    }
                }
            }
        }
        let mut out = String::new();
        for line in lines.into_iter().flatten() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    fn wrap_goal(&self, goal: &str, variables: &[String]) -> String {
        let goal = strip_clause_end(goal);
        let head = if variables.is_empty() {
            QUERY_HEAD.to_string()
        } else {
            format!("{QUERY_HEAD}({})", variables.join(","))
        };
        format!("{head} :- {goal}.\nquery({head}).\n")
    }

    fn decode(&self, output: &str, variables: &[String], policy: Arc<ConversionPolicy>) -> Solution {
        decode_weighted(output, variables, &self.diagnostics, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn swi_script_declares_dynamic_first() {
        let mut kb = KnowledgeBase::new();
        kb.add_theory("likes(mary, wine).");
        kb.assertz("likes(john, X).").unwrap();
        kb.retract("likes(mary, wine).");
        let script = SwiDialect::default().render_knowledge_base(&kb);
        assert_eq!(
            script,
            ":- dynamic(likes/2).\n\
             likes(mary, wine).\n\
             :- assertz((likes(john,X))).\n\
             :- retract((likes(mary, wine))).\n"
        );
    }

    #[test]
    fn swi_wrapper_prints_records() {
        let wrapper = SwiDialect::default().wrap_goal("member(X, [0,1,2]).", &vars(&["X"]));
        assert_eq!(
            wrapper,
            ":- forall(call((member(X, [0,1,2]))), (nl, write('$sol'), write('\\t'), \
             write_canonical(X), nl)), nl, write('$end'), nl.\n"
        );
    }

    #[test]
    fn swi_wrapper_without_variables() {
        let wrapper = SwiDialect::default().wrap_goal("true.", &[]);
        assert!(wrapper.contains("(nl, write('$sol'), nl)"));
    }

    #[test]
    fn swi_command_line() {
        let args = SwiDialect::default().command_args(Path::new("/tmp/s.pl"));
        assert_eq!(args, vec!["-q", "-f", "/tmp/s.pl", "-g", "halt"]);
    }

    #[test]
    fn problog_query_rule() {
        let d = ProblogDialect::default();
        assert_eq!(
            d.wrap_goal("twoHeads.", &[]),
            "pb_query :- twoHeads.\nquery(pb_query).\n"
        );
        assert_eq!(
            d.wrap_goal("coin(C), heads(C)", &vars(&["C"])),
            "pb_query(C) :- coin(C), heads(C).\nquery(pb_query(C)).\n"
        );
        assert_eq!(d.command_args(Path::new("q.pl")), vec!["q.pl"]);
    }

    #[test]
    fn problog_retract_removes_matching_fact() {
        let mut kb = KnowledgeBase::new();
        kb.load_library("lists");
        kb.assertz("edge(a, b)").unwrap();
        kb.assertz("edge(b, c)").unwrap();
        kb.retract("edge(_, c).");
        kb.retract("edge(x, y).");
        let script = ProblogDialect::default().render_knowledge_base(&kb);
        assert_eq!(script, ":- use_module(library(lists)).\nedge(a,b).\n");
    }

    #[test]
    fn asserted_rule_declares_head_predicate() {
        let mut kb = KnowledgeBase::new();
        kb.assertz("happy(X) :- rich(X).").unwrap();
        assert_eq!(
            SwiDialect::default().render_knowledge_base(&kb),
            ":- dynamic(happy/1).\n:- assertz((happy(X) :- rich(X))).\n"
        );
        assert_eq!(
            ProblogDialect::default().render_knowledge_base(&kb),
            "happy(X) :- rich(X).\n"
        );
    }

    #[test]
    fn full_script_is_kb_then_wrapper() {
        let mut kb = KnowledgeBase::new();
        kb.add_theory("0.5::heads1.");
        let script = ProblogDialect::default().script(&kb, "heads1.", &[]);
        assert!(script.starts_with("0.5::heads1.\n"));
        assert!(script.ends_with("query(pb_query).\n"));
    }

    #[test]
    fn diagnostics_sniff_prefixes() {
        let d = Diagnostics::for_engine(EngineKind::Swi);
        let output = "hello\nWarning: /tmp/x.pl:1:\nWarning:    Singleton variables: [X]\n\
                      ERROR: -g foo: catch/3: Unknown procedure: foo/0\nmore detail\n";
        assert_eq!(d.warnings(output).len(), 2);
        assert_eq!(
            d.first_error(output).as_deref(),
            Some("ERROR: -g foo: catch/3: Unknown procedure: foo/0\nmore detail")
        );
        assert!(d.first_error("all good\n").is_none());
    }
}
