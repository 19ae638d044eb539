//! Rule abstraction and built-in rule types.
//!
//! A [`Rule`] is the pluggable unit of detection logic: given the tuples of
//! its declared table(s), it reports [`Violation`]s, and optionally proposes
//! candidate [`Fix`]es for a violation. Three rule families are built in:
//! functional dependencies ([`FdRule`]), conditional functional dependencies
//! ([`CfdRule`]), and host-registered user-defined rules
//! ([`register_udf`](udf::register_udf)).
//!
//! Rules are constructed once from a declarative specification, validate
//! their inputs completely at construction (never yielding a partially
//! usable rule), and are stateless thereafter.

mod cfd;
mod fd;
pub mod udf;

pub use cfd::CfdRule;
pub use fd::FdRule;

use crate::error::{Result, ScrubError};
use crate::model::{Cell, Column, Fix, Tuple, Value, Violation};
use crate::security::SqlSecurity;
use std::collections::HashMap;
use std::fmt::Debug;

/// A detection/repair unit bound to one or two tables.
///
/// Implementations must be `Send + Sync`: different rules may run on
/// separate threads against the same backend, each holding its own
/// connection.
pub trait Rule: Debug + Send + Sync {
    /// The rule id, unique within a clean plan.
    fn id(&self) -> &str;

    /// The tables this rule operates over (one or two).
    fn table_names(&self) -> &[String];

    /// Evaluates the rule over the given tuples, reporting every breach.
    fn detect(&self, tuples: &[Tuple]) -> Result<Vec<Violation>>;

    /// Proposes candidate fixes for a detected violation.
    ///
    /// Detection-only rules are valid; the default proposes nothing.
    fn repair(&self, _violation: &Violation) -> Result<Vec<Fix>> {
        Ok(Vec::new())
    }
}

/// Validates a rule's declared table list: one or two valid identifiers.
pub(crate) fn validate_table_names(rule_id: &str, tables: &[String]) -> Result<()> {
    if tables.is_empty() || tables.len() > 2 {
        return Err(ScrubError::invalid_rule(
            rule_id,
            "rule needs to have one or two tables",
        ));
    }
    for table in tables {
        SqlSecurity::validate_identifier(table)
            .map_err(|e| ScrubError::invalid_rule(rule_id, e.to_string()))?;
    }
    Ok(())
}

/// Parses a comma-separated attribute list, validating each name.
pub(crate) fn parse_attribute_list(rule_id: &str, text: &str) -> Result<Vec<String>> {
    let attributes: Vec<String> = text
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if attributes.is_empty() {
        return Err(ScrubError::invalid_rule(
            rule_id,
            format!("empty attribute list in '{text}'"),
        ));
    }
    for attribute in &attributes {
        SqlSecurity::validate_identifier(attribute)
            .map_err(|e| ScrubError::invalid_rule(rule_id, e.to_string()))?;
    }
    Ok(attributes)
}

pub(crate) fn attribute_value(tuple: &Tuple, attribute: &str) -> Value {
    tuple.get(attribute).cloned().unwrap_or(Value::Null)
}

pub(crate) fn attribute_cell(tuple: &Tuple, attribute: &str) -> Cell {
    Cell::new(
        Column::new(tuple.table().to_string(), attribute.to_string()),
        tuple.tid(),
        attribute_value(tuple, attribute),
    )
}

/// Groups tuples by value equality on the left-hand attributes.
///
/// Tuples with a null or absent value in any left-hand attribute never
/// co-group: they are excluded entirely.
pub(crate) fn group_by_lhs<'a>(
    tuples: impl Iterator<Item = &'a Tuple>,
    lhs: &[String],
) -> Vec<Vec<&'a Tuple>> {
    let mut groups: HashMap<Vec<Value>, Vec<&'a Tuple>> = HashMap::new();
    'tuple: for tuple in tuples {
        let mut key = Vec::with_capacity(lhs.len());
        for attribute in lhs {
            match tuple.get(attribute) {
                Some(value) if !value.is_null() => key.push(value.clone()),
                _ => continue 'tuple,
            }
        }
        groups.entry(key).or_default().push(tuple);
    }
    groups.into_values().collect()
}

/// Reports one violation per pair of tuples that share left-hand values but
/// disagree on the right-hand attribute.
///
/// Each violation carries the two disagreeing right-hand cells plus both
/// tuples' left-hand cells for provenance.
pub(crate) fn fd_pair_violations(
    rule_id: &str,
    lhs: &[String],
    rhs_attribute: &str,
    groups: &[Vec<&Tuple>],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for group in groups {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (a, b) = (group[i], group[j]);
                if attribute_value(a, rhs_attribute) == attribute_value(b, rhs_attribute) {
                    continue;
                }
                let mut cells = vec![
                    attribute_cell(a, rhs_attribute),
                    attribute_cell(b, rhs_attribute),
                ];
                for attribute in lhs {
                    cells.push(attribute_cell(a, attribute));
                    cells.push(attribute_cell(b, attribute));
                }
                violations.push(Violation::new(rule_id, cells));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp(tid: i64, dept: Option<&str>, manager: &str) -> Tuple {
        let tuple = Tuple::new("emp", tid).with("manager", manager);
        match dept {
            Some(d) => tuple.with("dept", d),
            None => tuple.with("dept", Value::Null),
        }
    }

    #[test]
    fn test_null_lhs_never_co_groups() {
        let tuples = vec![emp(1, None, "X"), emp(2, None, "Y"), emp(3, Some("A"), "Z")];
        let lhs = vec!["dept".to_string()];
        let groups = group_by_lhs(tuples.iter(), &lhs);

        // The two null-dept tuples are excluded entirely.
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[0][0].tid(), 3);
    }

    #[test]
    fn test_pair_violations_carry_provenance_cells() {
        let tuples = vec![emp(1, Some("A"), "X"), emp(2, Some("A"), "Y")];
        let lhs = vec!["dept".to_string()];
        let groups = group_by_lhs(tuples.iter(), &lhs);
        let violations = fd_pair_violations("Rule 0", &lhs, "manager", &groups);

        assert_eq!(violations.len(), 1);
        let cells = violations[0].cells();
        // Two disagreeing manager cells plus both dept cells.
        assert_eq!(cells.len(), 4);
        assert_eq!(
            cells.iter().filter(|c| c.attribute() == "manager").count(),
            2
        );
        assert_eq!(cells.iter().filter(|c| c.attribute() == "dept").count(), 2);
    }

    #[test]
    fn test_agreeing_pairs_report_nothing() {
        let tuples = vec![emp(1, Some("A"), "X"), emp(2, Some("A"), "X")];
        let lhs = vec!["dept".to_string()];
        let groups = group_by_lhs(tuples.iter(), &lhs);
        assert!(fd_pair_violations("Rule 0", &lhs, "manager", &groups).is_empty());
    }

    #[test]
    fn test_validate_table_names_bounds() {
        assert!(validate_table_names("r", &[]).is_err());
        assert!(validate_table_names("r", &["a".to_string()]).is_ok());
        assert!(validate_table_names("r", &["a".to_string(), "b".to_string()]).is_ok());
        assert!(validate_table_names(
            "r",
            &["a".to_string(), "b".to_string(), "c".to_string()]
        )
        .is_err());
    }

    #[test]
    fn test_parse_attribute_list_rejects_garbage() {
        assert_eq!(
            parse_attribute_list("r", "a, b ,c").unwrap(),
            vec!["a", "b", "c"]
        );
        assert!(parse_attribute_list("r", "  ").is_err());
        assert!(parse_attribute_list("r", "a; DROP TABLE x").is_err());
    }
}
