//! Pipeline execution: compiles a clean plan into operator chains and runs
//! them.

use super::{
    IncrementalUpdater, Operator, OperatorExt, RepairWriter, TupleReader, ViolationDetector,
    ViolationWriter,
};
use crate::backend::DbConfig;
use crate::error::{Result, ScrubError};
use crate::installer::ExecutionTables;
use crate::model::{Fix, Violation};
use crate::plan::CleanPlan;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Outcome of one rule's detection pass.
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    /// The rule that ran.
    pub rule_id: String,
    /// Tuples read from the rule's source table(s).
    pub tuples_scanned: usize,
    /// Violations detected and persisted.
    pub violations: usize,
}

/// Outcome of a full detection run over a clean plan.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Violations persisted across all rules.
    pub total_violations: usize,
    /// Per-rule outcomes, in plan order.
    pub rule_reports: Vec<RuleReport>,
}

/// A clean plan bound to an execution backend, ready to run.
///
/// Each rule runs as its own operator chain (read tuples, detect violations,
/// persist); rules share state only through the violation table. Applied
/// fixes feed back through [`apply_incremental`](Self::apply_incremental) so
/// later detection runs do not re-report already-fixed issues.
///
/// # Examples
///
/// ```rust,no_run
/// use scrub_engine::backend::{DbConfig, DialectKind};
/// use scrub_engine::installer::{self, ExecutionTables};
/// use scrub_engine::pipeline::Pipeline;
/// use scrub_engine::plan::CleanPlan;
///
/// # fn example() -> scrub_engine::error::Result<()> {
/// let plan = CleanPlan::from_json(r#"{
///     "source": {"type": "sqlite", "url": "source.db"},
///     "rule": [{"type": "fd", "table": ["emp"], "value": ["dept -> manager"]}]
/// }"#)?;
///
/// let exec = DbConfig::new(DialectKind::Sqlite, "exec.db");
/// installer::install(&exec, &ExecutionTables::default())?;
///
/// let pipeline = Pipeline::new(plan, exec);
/// let report = pipeline.detect()?;
/// println!("{} violations", report.total_violations);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    plan: CleanPlan,
    exec_config: DbConfig,
    tables: ExecutionTables,
}

impl Pipeline {
    /// Binds a plan to an execution backend with the default table names.
    pub fn new(plan: CleanPlan, exec_config: DbConfig) -> Self {
        Self::with_tables(plan, exec_config, ExecutionTables::default())
    }

    /// Binds a plan to an execution backend with explicit table names.
    pub fn with_tables(plan: CleanPlan, exec_config: DbConfig, tables: ExecutionTables) -> Self {
        Self {
            plan,
            exec_config,
            tables,
        }
    }

    /// The bound plan.
    pub fn plan(&self) -> &CleanPlan {
        &self.plan
    }

    /// The execution table names in use.
    pub fn execution_tables(&self) -> &ExecutionTables {
        &self.tables
    }

    /// Runs detection for every rule in the plan, persisting violations.
    #[instrument(skip(self), fields(plan.rules = self.plan.rules().len()))]
    pub fn detect(&self) -> Result<DetectionReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut rule_reports = Vec::with_capacity(self.plan.rules().len());
        let mut total_violations = 0usize;

        for rule in self.plan.rules() {
            let mut tuples = Vec::new();
            for table in rule.table_names() {
                let mut reader =
                    TupleReader::new(self.plan.source_config().clone(), table.clone());
                tuples.extend(reader.execute(())?);
            }
            let tuples_scanned = tuples.len();

            let mut detect_and_persist = ViolationDetector::new(Arc::clone(rule)).then(
                ViolationWriter::new(self.exec_config.clone(), self.tables.clone()),
            );
            let persisted = detect_and_persist.execute(tuples)?;

            info!(
                rule.id = %rule.id(),
                tuples.scanned = tuples_scanned,
                violations.persisted = persisted.len(),
                "Rule pipeline finished"
            );
            total_violations += persisted.len();
            rule_reports.push(RuleReport {
                rule_id: rule.id().to_string(),
                tuples_scanned,
                violations: persisted.len(),
            });
        }

        Ok(DetectionReport {
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            total_violations,
            rule_reports,
        })
    }

    /// Asks each violation's originating rule for candidate fixes.
    pub fn propose_fixes(&self, violations: &[Violation]) -> Result<Vec<Fix>> {
        let mut fixes = Vec::new();
        for violation in violations {
            let rule = self
                .plan
                .rules()
                .iter()
                .find(|r| r.id() == violation.rule_id())
                .ok_or_else(|| {
                    ScrubError::Configuration(format!(
                        "violation references unknown rule '{}'",
                        violation.rule_id()
                    ))
                })?;
            fixes.extend(rule.repair(violation)?);
        }
        Ok(fixes)
    }

    /// Persists candidate fixes to the repair table.
    pub fn persist_fixes(&self, fixes: Vec<Fix>) -> Result<usize> {
        RepairWriter::new(self.exec_config.clone(), self.tables.clone()).execute(fixes)
    }

    /// Removes violations made stale by a batch of applied fixes.
    pub fn apply_incremental(&self, fixes: Vec<Fix>) -> Result<Vec<i64>> {
        IncrementalUpdater::new(self.exec_config.clone(), self.tables.clone()).execute(fixes)
    }
}
