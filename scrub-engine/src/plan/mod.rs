//! Clean plans: validated configuration binding a data source to rules.
//!
//! A [`CleanPlan`] is the unit the pipeline executes: exactly one source
//! connection descriptor plus an ordered, fully validated rule list,
//! constructed from a JSON clean-plan document. Construction is
//! all-or-nothing: any error anywhere during parsing fails the whole plan
//! with an invalid-plan error carrying the underlying cause's message, and
//! no partial plan is ever observable.

use crate::backend::{DbConfig, DialectKind};
use crate::error::{Result, ScrubError};
use crate::rules::{udf::resolve_udf, CfdRule, FdRule, Rule};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ingestion collaborator for flat-file sources.
///
/// Flat files are materialized into a backend table before a plan references
/// them; the engine only receives the resulting table name. Hosts implement
/// this against their ingestion machinery.
pub trait TableLoader {
    /// Loads the file into the execution backend, returning the table name.
    fn load(&self, config: &DbConfig, path: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct PlanDocument {
    source: SourceDocument,
    #[serde(default)]
    rule: Vec<RuleDocument>,
}

#[derive(Debug, Deserialize)]
struct SourceDocument {
    #[serde(rename = "type")]
    kind: String,
    file: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    name: Option<String>,
    #[serde(default)]
    table: Vec<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Vec<String>,
}

/// Immutable aggregate of a source connection descriptor and an ordered set
/// of compiled rules.
pub struct CleanPlan {
    source: DbConfig,
    rules: Vec<Arc<dyn Rule>>,
}

impl std::fmt::Debug for CleanPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanPlan")
            .field("source", &self.source)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CleanPlan {
    /// Creates a clean plan from a JSON document with a database source.
    ///
    /// Documents with a `csv` source are rejected here; use
    /// [`from_json_with_loader`](Self::from_json_with_loader) to supply the
    /// ingestion collaborator they need.
    pub fn from_json(document: &str) -> Result<Self> {
        Self::build(document, None).map_err(ScrubError::into_plan_error)
    }

    /// Creates a clean plan from a JSON document, materializing a flat-file
    /// source into `exec_config` through `loader` if the document asks for
    /// one.
    #[instrument(skip_all)]
    pub fn from_json_with_loader(
        document: &str,
        exec_config: &DbConfig,
        loader: &dyn TableLoader,
    ) -> Result<Self> {
        Self::build(document, Some((exec_config, loader))).map_err(ScrubError::into_plan_error)
    }

    fn build(
        document: &str,
        ingest: Option<(&DbConfig, &dyn TableLoader)>,
    ) -> Result<Self> {
        let document: PlanDocument = serde_json::from_str(document)?;

        let (source, csv_table) = Self::build_source(&document.source, ingest)?;

        let mut rules: Vec<Arc<dyn Rule>> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        for (index, rule_doc) in document.rule.iter().enumerate() {
            let name = match rule_doc.name.as_deref() {
                Some(name) if !name.trim().is_empty() => name.to_string(),
                _ => format!("Rule {index}"),
            };

            let tables = match &csv_table {
                // A flat-file source has exactly one ingested table; the
                // document's table list is ignored.
                Some(table) => vec![table.clone()],
                None => rule_doc.table.clone(),
            };

            for rule in Self::build_rule(&name, tables, rule_doc)? {
                if !seen_ids.insert(rule.id().to_string()) {
                    return Err(ScrubError::invalid_rule(
                        rule.id(),
                        "duplicate rule id within the plan",
                    ));
                }
                rules.push(rule);
            }
        }

        debug!(plan.rules = rules.len(), "Compiled clean plan");
        Ok(Self { source, rules })
    }

    fn build_source(
        source: &SourceDocument,
        ingest: Option<(&DbConfig, &dyn TableLoader)>,
    ) -> Result<(DbConfig, Option<String>)> {
        if source.kind.eq_ignore_ascii_case("csv") {
            let (exec_config, loader) = ingest.ok_or_else(|| {
                ScrubError::Configuration(
                    "csv source requires an ingestion collaborator".to_string(),
                )
            })?;
            let file = source.file.as_deref().ok_or_else(|| {
                ScrubError::Configuration("csv source requires a file path".to_string())
            })?;
            let table = loader.load(exec_config, Path::new(file))?;
            return Ok((exec_config.clone(), Some(table)));
        }

        let dialect: DialectKind = source.kind.parse()?;
        let url = source.url.as_deref().ok_or_else(|| {
            ScrubError::Configuration("database source requires a url".to_string())
        })?;
        let mut config = DbConfig::new(dialect, url);
        if let (Some(username), Some(password)) = (&source.username, &source.password) {
            config = config.with_credentials(username.clone(), password.as_str());
        }
        Ok((config, None))
    }

    fn build_rule(
        name: &str,
        tables: Vec<String>,
        rule_doc: &RuleDocument,
    ) -> Result<Vec<Arc<dyn Rule>>> {
        match rule_doc.kind.as_str() {
            "fd" => {
                if rule_doc.value.len() != 1 {
                    return Err(ScrubError::invalid_rule(
                        name,
                        "fd rules take exactly one specification line",
                    ));
                }
                let rule = FdRule::new(name, tables, &rule_doc.value[0])?;
                Ok(vec![Arc::new(rule)])
            }
            "cfd" => {
                if rule_doc.value.len() < 2 {
                    return Err(ScrubError::invalid_rule(
                        name,
                        "cfd rules take a header line plus at least one tableau row",
                    ));
                }
                let header = &rule_doc.value[0];
                let rows = &rule_doc.value[1..];
                let mut rules: Vec<Arc<dyn Rule>> = Vec::with_capacity(rows.len());
                for (row_index, row) in rows.iter().enumerate() {
                    // Each tableau row is an independent constraint sharing
                    // the header; rows get distinct ids to keep plan-level
                    // rule ids unique.
                    let row_id = if rows.len() == 1 {
                        name.to_string()
                    } else {
                        format!("{name}.{}", row_index + 1)
                    };
                    let specification = format!("{header}\n{row}");
                    let rule = CfdRule::new(row_id, tables.clone(), &specification)?;
                    rules.push(Arc::new(rule));
                }
                Ok(rules)
            }
            "udf" => {
                if rule_doc.value.len() != 1 {
                    return Err(ScrubError::invalid_rule(
                        name,
                        "udf rules take exactly one reference name",
                    ));
                }
                let rule = resolve_udf(&rule_doc.value[0], name, tables)?;
                Ok(vec![Arc::from(rule)])
            }
            other => Err(ScrubError::invalid_rule(
                name,
                format!("unknown rule type '{other}'"),
            )),
        }
    }

    /// The source connection descriptor.
    pub fn source_config(&self) -> &DbConfig {
        &self.source
    }

    /// The compiled rules, in document order.
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }
}
