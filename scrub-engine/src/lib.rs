//! # Scrub - Rule-Driven Data Cleaning for Rust
//!
//! Scrub is a data-quality engine that detects violations of declared
//! integrity constraints (functional dependencies, conditional functional
//! dependencies, and user-defined detection logic) over tuples stored in a
//! relational backend, records them as a persistent violation/repair model,
//! and incrementally maintains that model as fixes are applied, without
//! re-scanning the dataset.
//!
//! ## Overview
//!
//! A clean plan binds a data source to an ordered set of compiled rules.
//! The pipeline runs one typed operator chain per rule (read tuples, detect
//! violations, persist), merging results only in the shared violation table.
//! When fixes are applied, the incremental-update stage deletes the
//! violations they made stale, so the next detection run stays incremental.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrub_engine::prelude::*;
//! use scrub_engine::installer;
//!
//! # fn example() -> Result<()> {
//! // Describe the source and the constraints in a clean-plan document.
//! let plan = CleanPlan::from_json(r#"{
//!     "source": {"type": "sqlite", "url": "source.db"},
//!     "rule": [
//!         {"name": "dept_manager", "type": "fd",
//!          "table": ["emp"], "value": ["dept -> manager"]}
//!     ]
//! }"#)?;
//!
//! // Install the violation/repair/audit tables on the execution backend.
//! let exec = DbConfig::new(DialectKind::Sqlite, "exec.db");
//! installer::install(&exec, &ExecutionTables::default())?;
//!
//! // Run detection.
//! let pipeline = Pipeline::new(plan, exec);
//! let report = pipeline.detect()?;
//! println!(
//!     "{} violations across {} rules",
//!     report.total_violations,
//!     report.rule_reports.len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **Functional dependencies**: `A,B -> C` specifications; tuples agreeing
//!   on the left-hand side must agree on the right-hand side.
//! - **Conditional functional dependencies**: pattern-tableau rows restrict
//!   an embedded dependency to tuples matching literal patterns.
//! - **User-defined rules**: hosts register a factory per reference name;
//!   plans resolve detection logic through the registry, never through
//!   dynamic code loading.
//! - **Multi-dialect schema management**: violation/repair/audit DDL is
//!   generated per backend family (SQLite built in, PostgreSQL and MySQL
//!   statement text included) through an open/closed dialect registry.
//! - **Incremental maintenance**: applied fixes delete the violations they
//!   made stale under a batched, transactional protocol.
//!
//! ## Architecture
//!
//! - **`model`**: tuples, cells, violations, and fixes, the shared vocabulary
//! - **`rules`**: the pluggable detection/repair contract and built-ins
//! - **`plan`**: clean-plan documents compiled into validated rule sets
//! - **`pipeline`**: typed operators, composition, and the run loop
//! - **`backend`** / **`dialect`**: connections and per-backend statement text
//! - **`installer`**: idempotent setup of the persisted tables

pub mod backend;
pub mod dialect;
pub mod error;
pub mod installer;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod prelude;
pub mod rules;
pub mod security;
