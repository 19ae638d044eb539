//! User-defined rule resolution.
//!
//! Clean plans reference user-supplied detection logic by name. Hosts make
//! those names resolvable by registering a factory per reference at startup;
//! the engine never performs dynamic code loading itself. The factory
//! receives the rule id and table-name list and returns a ready
//! [`Rule`](super::Rule), so initialization is part of the factory contract.

use super::{validate_table_names, Rule};
use crate::error::{Result, ScrubError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Factory producing a ready rule from (rule id, table names).
pub type UdfFactory = Arc<dyn Fn(&str, Vec<String>) -> Result<Box<dyn Rule>> + Send + Sync>;

static UDF_REGISTRY: Lazy<RwLock<HashMap<String, UdfFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers user-defined detection logic under a reference name, replacing
/// any existing registration.
///
/// # Examples
///
/// ```rust
/// use scrub_engine::rules::udf::register_udf;
/// use std::sync::Arc;
///
/// # #[derive(Debug)]
/// # struct MyRule { id: String, tables: Vec<String> }
/// # impl scrub_engine::rules::Rule for MyRule {
/// #     fn id(&self) -> &str { &self.id }
/// #     fn table_names(&self) -> &[String] { &self.tables }
/// #     fn detect(&self, _: &[scrub_engine::model::Tuple])
/// #         -> scrub_engine::error::Result<Vec<scrub_engine::model::Violation>> {
/// #         Ok(Vec::new())
/// #     }
/// # }
/// register_udf("my_rule", Arc::new(|id, tables| {
///     let rule: Box<dyn scrub_engine::rules::Rule> =
///         Box::new(MyRule { id: id.to_string(), tables });
///     Ok(rule)
/// }));
/// ```
pub fn register_udf(reference: impl Into<String>, factory: UdfFactory) {
    let reference = reference.into();
    debug!(udf.reference = %reference, "Registered user-defined rule factory");
    let mut registry = UDF_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.insert(reference, factory);
}

/// Resolves a reference name to a constructed, initialized rule.
///
/// Fails with a rule-load error when the reference is not registered or the
/// factory itself fails; the table-name list is validated before the factory
/// runs.
pub fn resolve_udf(reference: &str, id: &str, tables: Vec<String>) -> Result<Box<dyn Rule>> {
    validate_table_names(id, &tables)?;

    let factory = {
        let registry = UDF_REGISTRY
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.get(reference).cloned()
    };

    let factory = factory.ok_or_else(|| {
        ScrubError::rule_load(
            reference,
            "no user-defined rule registered under this reference",
        )
    })?;

    factory(id, tables).map_err(|e| ScrubError::rule_load(reference, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Tuple, Violation};

    #[derive(Debug)]
    struct NoopRule {
        id: String,
        tables: Vec<String>,
    }

    impl Rule for NoopRule {
        fn id(&self) -> &str {
            &self.id
        }

        fn table_names(&self) -> &[String] {
            &self.tables
        }

        fn detect(&self, _tuples: &[Tuple]) -> Result<Vec<Violation>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_registered_udf_resolves_initialized() {
        register_udf(
            "noop_test",
            Arc::new(|id, tables| {
                let rule: Box<dyn Rule> = Box::new(NoopRule {
                    id: id.to_string(),
                    tables,
                });
                Ok(rule)
            }),
        );

        let rule = resolve_udf("noop_test", "Rule 4", vec!["emp".to_string()]).unwrap();
        assert_eq!(rule.id(), "Rule 4");
        assert_eq!(rule.table_names(), &["emp".to_string()]);
    }

    #[test]
    fn test_unresolvable_reference_fails_with_rule_load_error() {
        let err = resolve_udf("missing_rule", "Rule 0", vec!["emp".to_string()]).unwrap_err();
        assert!(matches!(err, ScrubError::RuleLoad { .. }));
    }

    #[test]
    fn test_factory_failure_surfaces_as_rule_load_error() {
        register_udf(
            "broken_test",
            Arc::new(|_, _| Err(ScrubError::backend("constructor exploded"))),
        );

        let err = resolve_udf("broken_test", "Rule 0", vec!["emp".to_string()]).unwrap_err();
        match err {
            ScrubError::RuleLoad { message, .. } => {
                assert!(message.contains("constructor exploded"));
            }
            other => panic!("expected RuleLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_table_count_validated_before_factory() {
        let err = resolve_udf("noop_test", "Rule 0", vec![]).unwrap_err();
        assert!(matches!(err, ScrubError::InvalidRule { .. }));
    }
}
