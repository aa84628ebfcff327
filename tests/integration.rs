//! End-to-end tests for prover sessions.
//!
//! These drive full sessions (pattern binding, script construction, engine
//! output decoding and value conversion) against in-process backends that
//! answer the way the real engines do for the scripts they receive, so no
//! engine needs to be installed.

use std::sync::{Arc, Mutex};

use prover_bridge::config::BridgeConfig;
use prover_bridge::convert::{Compound, Value};
use prover_bridge::engine::{EngineKind, EngineOutput, InProcessBackend, Prover, ProverBuilder};
use prover_bridge::error::{BridgeError, EngineError, QueryError};
use prover_bridge::term::Term;

/// A session whose backend answers `output` for every script and records
/// the scripts it was given.
fn scripted(kind: EngineKind, output: &'static str) -> (Prover, Arc<Mutex<Vec<String>>>) {
    let scripts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&scripts);
    let prover = Prover::builder(kind)
        .backend(InProcessBackend::new("scripted", move |script| {
            sink.lock().unwrap().push(script.to_string());
            Ok(EngineOutput::ok(output))
        }))
        .build()
        .unwrap();
    (prover, scripts)
}

#[test]
fn member_enumerates_in_order() {
    let (prover, scripts) = scripted(
        EngineKind::Swi,
        "\n$sol\t0\n\n$sol\t1\n\n$sol\t2\n\n$end\n",
    );
    let mut solution = prover
        .solve("member(X, ?List).", &[Value::from(vec![0, 1, 2])])
        .unwrap();

    assert!(scripts.lock().unwrap()[0].contains("call((member(X, [0,1,2])))"));
    assert!(solution.is_success());
    let mut xs = Vec::new();
    while solution.fetch() {
        xs.push(solution.get_as::<i64>("X").unwrap());
    }
    assert_eq!(xs, vec![0, 1, 2]);
}

#[test]
fn integer_and_float_unify_differently() {
    // Answers like the engine: `1=1` succeeds, `1.0=1` does not.
    let prover = Prover::builder(EngineKind::Swi)
        .backend(InProcessBackend::new("unify", |script| {
            let output = if script.contains("call((1=1))") {
                "\n$sol\n\n$end\n"
            } else {
                "\n$end\n"
            };
            Ok(EngineOutput::ok(output))
        }))
        .build()
        .unwrap();

    assert!(prover.solve("?=1.", &[Value::from(1)]).unwrap().is_success());
    assert!(!prover.solve("?=1.", &[Value::from(1.0)]).unwrap().is_success());
}

#[test]
fn problog_reports_conjunction_probability() {
    let (mut prover, scripts) = scripted(EngineKind::Problog, "pb_query:\t0.3\n");
    prover.add_theories(["0.5::heads1.", "0.6::heads2.", "twoHeads :- heads1, heads2."]);

    let solution = prover.solve("twoHeads.", &[]).unwrap();

    let script = scripts.lock().unwrap()[0].clone();
    assert!(script.starts_with(":- use_module(library(lists)).\n0.5::heads1.\n"));
    assert!(script.ends_with("pb_query :- twoHeads.\nquery(pb_query).\n"));
    assert!(!solution.is_success());
    assert_eq!(solution.len(), 1);
    assert!((solution.probability().unwrap() - 0.3).abs() < 1e-9);
}

#[test]
fn ground_true_goal_has_one_empty_row() {
    let (prover, scripts) = scripted(EngineKind::Swi, "\n$sol\n\n$end\n");
    let solution = prover.solve("true.", &[]).unwrap();

    assert_eq!(
        scripts.lock().unwrap()[0],
        ":- forall(call((true)), (nl, write('$sol'), nl)), nl, write('$end'), nl.\n"
    );
    assert!(solution.is_success());
    assert_eq!(solution.len(), 1);
    assert!(solution.rows()[0].is_empty());
}

#[test]
fn malformed_output_yields_failed_solution() {
    let (prover, _) = scripted(EngineKind::Swi, "$sol\t[1,2\n$end\n");
    let mut solution = prover.solve("foo(X).", &[]).unwrap();
    assert!(!solution.is_success());
    assert!(!solution.fetch());
    assert!(solution.get("X").is_err());
}

#[test]
fn engine_error_escalates_with_goal() {
    let (prover, _) = scripted(
        EngineKind::Swi,
        "Warning: /tmp/x.pl:1:\n\
         ERROR: -g foo(X): catch/3: Unknown procedure: foo/1\n",
    );
    match prover.solve("foo(?).", &[Value::from(3)]).unwrap_err() {
        BridgeError::Engine(EngineError::Reported { goal, message }) => {
            assert_eq!(goal, "foo(3).");
            assert!(message.contains("Unknown procedure"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn problog_error_line_escalates() {
    let (prover, _) = scripted(
        EngineKind::Problog,
        "UnknownClause: No clauses found for 'coin/1' at 3:14.\n",
    );
    assert!(matches!(
        prover.solve("coin(X).", &[]).unwrap_err(),
        BridgeError::Engine(EngineError::Reported { .. })
    ));
}

#[test]
fn placeholder_count_is_checked_before_running() {
    let (prover, scripts) = scripted(EngineKind::Swi, "$end\n");
    assert!(matches!(
        prover.solve("between(?, ?, X).", &[Value::from(1)]).unwrap_err(),
        BridgeError::Query(QueryError::PlaceholderCount { expected: 2, actual: 1 })
    ));
    assert!(scripts.lock().unwrap().is_empty());
}

#[test]
fn named_binding_then_positional_rest() {
    let (prover, scripts) = scripted(EngineKind::Swi, "\n$sol\t[1,2,3]\n\n$end\n");
    let mut query = prover.query("append(?Front, ?Back, L).");
    query.bind_name("Back", vec![3]).unwrap();
    assert!(matches!(
        query.bind_name("Back", vec![4]).unwrap_err(),
        BridgeError::Query(QueryError::AlreadyBound { .. })
    ));

    let mut solution = query.solve(&[Value::from(vec![1, 2])]).unwrap();
    assert!(scripts.lock().unwrap()[0].contains("call((append([1,2], [3], L)))"));
    assert_eq!(
        solution.to_lists().unwrap(),
        vec![vec![Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])]]
    );
}

#[test]
fn asserted_facts_precede_the_goal() {
    let (mut prover, scripts) = scripted(EngineKind::Swi, "\n$sol\tbob\n\n$end\n");
    prover.add_theory("grandparent(X, Z) :- parent(X, Y), parent(Y, Z).");
    prover
        .assertz("parent(?, ?).", &[Value::from("tom"), Value::from("bob")])
        .unwrap();
    prover.retract("parent(tom, bob).");

    let solution = prover.solve("parent(tom, Who).", &[]).unwrap();
    assert_eq!(
        scripts.lock().unwrap()[0],
        ":- dynamic(parent/2).\n\
         grandparent(X, Z) :- parent(X, Y), parent(Y, Z).\n\
         :- assertz((parent(tom,bob))).\n\
         :- retract((parent(tom, bob))).\n\
         :- forall(call((parent(tom, Who))), (nl, write('$sol'), write('\\t'), \
         write_canonical(Who), nl)), nl, write('$end'), nl.\n"
    );
    assert_eq!(solution.get_as::<String>("Who").unwrap(), "bob");
}

#[test]
fn asserted_rule_keeps_later_scripts_valid() {
    let (mut prover, scripts) = scripted(EngineKind::Swi, "\n$sol\tann\n\n$end\n");
    prover.assertz("happy(X) :- rich(X).", &[]).unwrap();
    prover.assertz("rich(?).", &[Value::from("ann")]).unwrap();
    assert!(matches!(
        prover.assertz(":- initialization(main).", &[]).unwrap_err(),
        BridgeError::Query(QueryError::InvalidFact { .. })
    ));

    let solution = prover.solve("happy(Who).", &[]).unwrap();
    let script = scripts.lock().unwrap()[0].clone();
    assert!(script.starts_with(
        ":- dynamic(happy/1).\n\
         :- dynamic(rich/1).\n\
         :- assertz((happy(X) :- rich(X))).\n\
         :- assertz((rich(ann))).\n"
    ));
    assert!(!script.contains(":-/2"));
    assert_eq!(solution.get_as::<String>("Who").unwrap(), "ann");
}

#[test]
fn functor_converter_decodes_custom_structures() {
    let (mut prover, _) = scripted(EngineKind::Swi, "$sol\tpoint(1,2)\t'Quoted atom'\n$end\n");
    prover
        .policy_mut()
        .register_functor_converter("point/2", |term, policy| {
            let x: i64 = policy.to_host_as(policy.arg(term, 0)?)?;
            let y: i64 = policy.to_host_as(policy.arg(term, 1)?)?;
            Ok(Some(Value::List(vec![Value::Int(x), Value::Int(y)])))
        });

    let solution = prover.solve("shape(P, Name).", &[]).unwrap();
    assert_eq!(
        solution.get("P").unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(solution.value().unwrap(), Value::Str("Quoted atom".into()));
}

#[test]
fn compound_arguments_round_trip() {
    let (prover, scripts) = scripted(EngineKind::Swi, "$sol\tage(ann,33)\n$end\n");
    let person = Compound::new("person", vec![Value::from("ann"), Value::from(33)]);
    let solution = prover.solve("lookup(?, R).", &[Value::from(person)]).unwrap();

    assert!(scripts.lock().unwrap()[0].contains("call((lookup(person(ann,33), R)))"));
    assert_eq!(
        solution.get_as::<Compound>("R").unwrap(),
        Compound::new("age", vec![Value::Str("ann".into()), Value::Int(33)])
    );
    assert_eq!(
        solution.term("R").unwrap(),
        &Term::compound("age", vec![Term::atom("ann"), Term::Integer(33)])
    );
}

#[test]
fn config_executable_becomes_process_backend() {
    let dir = tempfile::TempDir::new().unwrap();
    let program = dir.path().join("swipl");
    std::fs::write(&program, b"").unwrap();

    let mut config = BridgeConfig::for_engine(EngineKind::Swi);
    config.executable = Some(program.clone());
    config.engine_args = vec!["--stack-limit=1g".into()];
    config.libraries = Some(vec!["clpfd".into()]);
    let path = dir.path().join("config.toml");
    config.save(&path).unwrap();

    let loaded = BridgeConfig::load(&path).unwrap();
    let prover = ProverBuilder::from_config(&loaded).build().unwrap();
    assert_eq!(
        prover.describe_backend(),
        format!("{} --stack-limit=1g", program.display())
    );
    assert!(
        prover
            .script("X #= 1 + 2.")
            .starts_with(":- use_module(library(clpfd)).\n")
    );
}
