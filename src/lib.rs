// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # prover-bridge
//!
//! Typed, parametrized logic-programming queries against external reasoning
//! engines (SWI-Prolog and ProbLog).
//!
//! ## Architecture
//!
//! - **Terms** (`term`): term model, reader for engine term text, canonical writer
//! - **Conversion** (`convert`): type-directed host value ↔ term converters
//! - **Queries** (`query`): `?` / `?Name` goal patterns and placeholder binding
//! - **Engines** (`engine`): knowledge base, dialects, executable discovery, backends
//! - **Solutions** (`solution`): output decoders and the row cursor
//! - **Config** (`config`): TOML session configuration
//!
//! ## Library usage
//!
//! ```no_run
//! use prover_bridge::convert::Value;
//! use prover_bridge::engine::{EngineKind, Prover};
//!
//! let mut prover = Prover::builder(EngineKind::Swi).build().unwrap();
//! prover.add_theory("parent(tom, bob).");
//! prover.add_theory("parent(bob, ann).");
//!
//! let mut solution = prover
//!     .solve("parent(?, Child).", &[Value::from("tom")])
//!     .unwrap();
//! while solution.fetch() {
//!     let child: String = solution.get_as("Child").unwrap();
//!     println!("{child}");
//! }
//! ```

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod query;
pub mod solution;
pub mod term;
