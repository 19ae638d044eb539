//! Functional-dependency rules.

use super::{
    fd_pair_violations, group_by_lhs, parse_attribute_list, validate_table_names, Rule,
};
use crate::error::{Result, ScrubError};
use crate::model::{Fix, Tuple, Violation};
use tracing::debug;

/// A functional-dependency rule: tuples agreeing on the left-hand attribute
/// set must agree on every right-hand attribute.
///
/// The specification is a single line of the form `A,B -> C,D`. Detection
/// groups tuples by value equality on the left-hand side (null or absent
/// left-hand values never co-group) and reports one violation per pair of
/// tuples that disagree on a right-hand attribute; each violation carries the
/// disagreeing right-hand cells plus the shared left-hand cells for
/// provenance.
///
/// # Examples
///
/// ```rust
/// use scrub_engine::rules::{FdRule, Rule};
/// use scrub_engine::model::Tuple;
///
/// let rule = FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
/// let tuples = vec![
///     Tuple::new("emp", 1).with("dept", "A").with("manager", "X"),
///     Tuple::new("emp", 2).with("dept", "A").with("manager", "Y"),
/// ];
/// let violations = rule.detect(&tuples).unwrap();
/// assert_eq!(violations.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FdRule {
    id: String,
    tables: Vec<String>,
    lhs: Vec<String>,
    rhs: Vec<String>,
}

impl FdRule {
    /// Builds a functional-dependency rule from its single-line specification.
    ///
    /// Fails with an invalid-rule error on a bad table count, an empty or
    /// malformed specification, or invalid attribute names.
    pub fn new(
        id: impl Into<String>,
        tables: Vec<String>,
        specification: &str,
    ) -> Result<Self> {
        let id = id.into();
        validate_table_names(&id, &tables)?;

        let specification = specification.trim();
        if specification.is_empty() {
            return Err(ScrubError::invalid_rule(&id, "empty specification"));
        }

        let mut sides = specification.split("->");
        let (lhs_text, rhs_text) = match (sides.next(), sides.next(), sides.next()) {
            (Some(lhs), Some(rhs), None) => (lhs, rhs),
            _ => {
                return Err(ScrubError::invalid_rule(
                    &id,
                    format!("expected 'A,B -> C' but got '{specification}'"),
                ))
            }
        };

        let lhs = parse_attribute_list(&id, lhs_text)?;
        let rhs = parse_attribute_list(&id, rhs_text)?;

        Ok(Self {
            id,
            tables,
            lhs,
            rhs,
        })
    }

    /// The left-hand (determinant) attributes.
    pub fn lhs(&self) -> &[String] {
        &self.lhs
    }

    /// The right-hand (dependent) attributes.
    pub fn rhs(&self) -> &[String] {
        &self.rhs
    }
}

impl Rule for FdRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn table_names(&self) -> &[String] {
        &self.tables
    }

    fn detect(&self, tuples: &[Tuple]) -> Result<Vec<Violation>> {
        let groups = group_by_lhs(tuples.iter(), &self.lhs);
        let mut violations = Vec::new();
        for rhs_attribute in &self.rhs {
            violations.extend(fd_pair_violations(
                &self.id,
                &self.lhs,
                rhs_attribute,
                &groups,
            ));
        }
        debug!(
            rule.id = %self.id,
            tuples.scanned = tuples.len(),
            violations.found = violations.len(),
            "Functional-dependency detection finished"
        );
        Ok(violations)
    }

    fn repair(&self, violation: &Violation) -> Result<Vec<Fix>> {
        // Equate the disagreeing dependent cells, repairing the later tuple
        // to the earlier one's value.
        let mut fixes = Vec::new();
        for rhs_attribute in &self.rhs {
            let mut cells: Vec<_> = violation
                .cells()
                .iter()
                .filter(|c| c.attribute() == rhs_attribute)
                .collect();
            cells.sort_by_key(|c| c.tid());
            if cells.len() >= 2 {
                fixes.push(Fix::assign(
                    violation.vid(),
                    (*cells[cells.len() - 1]).clone(),
                    (*cells[0]).clone(),
                ));
            }
        }
        Ok(fixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixOp, FixTarget, Value};

    fn emp(tid: i64, dept: &str, manager: &str) -> Tuple {
        Tuple::new("emp", tid).with("dept", dept).with("manager", manager)
    }

    #[test]
    fn test_detects_single_pairwise_disagreement() {
        let rule = FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
        let tuples = vec![emp(1, "A", "X"), emp(2, "A", "Y"), emp(3, "B", "Z")];

        let violations = rule.detect(&tuples).unwrap();
        assert_eq!(violations.len(), 1);

        let violation = &violations[0];
        assert_eq!(violation.rule_id(), "Rule 0");
        assert!(violation.touches("emp", 1));
        assert!(violation.touches("emp", 2));
        assert!(!violation.touches("emp", 3));
    }

    #[test]
    fn test_violation_contains_conflicting_pairs_only() {
        // Two agreeing tuples plus one outlier: the agreeing pair must never
        // appear together without the outlier.
        let rule = FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
        let tuples = vec![emp(1, "A", "X"), emp(2, "A", "X"), emp(3, "A", "Y")];

        let violations = rule.detect(&tuples).unwrap();
        assert_eq!(violations.len(), 2);
        for violation in &violations {
            assert!(violation.touches("emp", 3));
        }
    }

    #[test]
    fn test_composite_lhs_groups_on_all_attributes() {
        let rule =
            FdRule::new("Rule 0", vec!["emp".to_string()], "dept, city -> manager").unwrap();
        let tuples = vec![
            Tuple::new("emp", 1).with("dept", "A").with("city", "Doha").with("manager", "X"),
            Tuple::new("emp", 2).with("dept", "A").with("city", "Doha").with("manager", "Y"),
            Tuple::new("emp", 3).with("dept", "A").with("city", "Oslo").with("manager", "Z"),
        ];

        let violations = rule.detect(&tuples).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].touches("emp", 1));
        assert!(violations[0].touches("emp", 2));
    }

    #[test]
    fn test_null_lhs_values_never_match() {
        let rule = FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
        let tuples = vec![
            Tuple::new("emp", 1).with("dept", Value::Null).with("manager", "X"),
            Tuple::new("emp", 2).with("dept", Value::Null).with("manager", "Y"),
        ];
        assert!(rule.detect(&tuples).unwrap().is_empty());
    }

    #[test]
    fn test_multiple_rhs_attributes_detect_independently() {
        let rule =
            FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager, floor").unwrap();
        let tuples = vec![
            Tuple::new("emp", 1).with("dept", "A").with("manager", "X").with("floor", 1i64),
            Tuple::new("emp", 2).with("dept", "A").with("manager", "X").with("floor", 2i64),
        ];

        let violations = rule.detect(&tuples).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0]
            .cells()
            .iter()
            .any(|c| c.attribute() == "floor"));
    }

    #[test]
    fn test_repair_equates_dependent_cells() {
        let rule = FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
        let tuples = vec![emp(1, "A", "X"), emp(2, "A", "Y")];
        let violations = rule.detect(&tuples).unwrap();

        let fixes = rule.repair(&violations[0]).unwrap();
        assert_eq!(fixes.len(), 1);
        let fix = &fixes[0];
        assert_eq!(fix.op(), FixOp::Eq);
        assert_eq!(fix.left().tid(), 2);
        match fix.right() {
            FixTarget::Cell(cell) => assert_eq!(cell.tid(), 1),
            other => panic!("expected cell target, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_specifications() {
        let tables = vec!["emp".to_string()];
        assert!(FdRule::new("r", tables.clone(), "").is_err());
        assert!(FdRule::new("r", tables.clone(), "dept").is_err());
        assert!(FdRule::new("r", tables.clone(), "dept -> ").is_err());
        assert!(FdRule::new("r", tables.clone(), "-> manager").is_err());
        assert!(FdRule::new("r", tables.clone(), "a -> b -> c").is_err());
        assert!(FdRule::new("r", vec![], "dept -> manager").is_err());
        assert!(
            FdRule::new(
                "r",
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                "dept -> manager"
            )
            .is_err()
        );
    }
}
