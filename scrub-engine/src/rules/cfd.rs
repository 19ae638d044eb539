//! Conditional functional-dependency rules.

use super::{
    attribute_cell, attribute_value, fd_pair_violations, group_by_lhs, parse_attribute_list,
    validate_table_names, Rule,
};
use crate::error::{Result, ScrubError};
use crate::model::{Fix, Tuple, Violation};
use tracing::debug;

/// A pattern-tableau cell: a wildcard or a literal constant.
///
/// Literals compare against a tuple value's textual form; null values never
/// match a literal. The wildcard symbol is `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches any value.
    Wildcard,
    /// Matches values whose textual form equals the constant.
    Literal(String),
}

impl Pattern {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "_" {
            Pattern::Wildcard
        } else {
            Pattern::Literal(text.to_string())
        }
    }

    fn matches(&self, value: &crate::model::Value) -> bool {
        match self {
            Pattern::Wildcard => true,
            Pattern::Literal(constant) => !value.is_null() && value.to_string() == *constant,
        }
    }
}

/// A conditional functional dependency: an embedded FD restricted to tuples
/// matching a literal pattern on some attributes.
///
/// The specification is two lines. The first is a header naming the embedded
/// dependency, `A,B -> C`; the second is one pattern-tableau row,
/// `a1, _ -> c1`, whose cells are literals or the `_` wildcard, positionally
/// aligned with the header. Multi-row tableaux become one `CfdRule` instance
/// per row (the clean-plan factory performs that expansion, since each row is
/// an independent constraint sharing the same header).
///
/// Detection restricts candidates to tuples matching the row's literal
/// left-hand patterns, then applies functional-dependency-style pairwise
/// grouping on the left-hand attributes; a literal target pattern
/// additionally reports a violation for every matching tuple whose target
/// value differs from the constant.
#[derive(Debug, Clone)]
pub struct CfdRule {
    id: String,
    tables: Vec<String>,
    lhs: Vec<String>,
    rhs: String,
    lhs_patterns: Vec<Pattern>,
    rhs_pattern: Pattern,
}

impl CfdRule {
    /// Builds a conditional functional-dependency rule from its two-line
    /// specification (header + one tableau row).
    pub fn new(
        id: impl Into<String>,
        tables: Vec<String>,
        specification: &str,
    ) -> Result<Self> {
        let id = id.into();
        validate_table_names(&id, &tables)?;

        let mut lines = specification.lines().filter(|l| !l.trim().is_empty());
        let (header, row) = match (lines.next(), lines.next(), lines.next()) {
            (Some(header), Some(row), None) => (header, row),
            _ => {
                return Err(ScrubError::invalid_rule(
                    &id,
                    "expected a header line and exactly one tableau row",
                ))
            }
        };

        let (lhs, rhs) = Self::parse_header(&id, header)?;
        let (lhs_patterns, rhs_pattern) = Self::parse_row(&id, row, lhs.len())?;

        Ok(Self {
            id,
            tables,
            lhs,
            rhs,
            lhs_patterns,
            rhs_pattern,
        })
    }

    fn parse_header(id: &str, header: &str) -> Result<(Vec<String>, String)> {
        let mut sides = header.split("->");
        let (lhs_text, rhs_text) = match (sides.next(), sides.next(), sides.next()) {
            (Some(lhs), Some(rhs), None) => (lhs, rhs),
            _ => {
                return Err(ScrubError::invalid_rule(
                    id,
                    format!("expected header 'A,B -> C' but got '{header}'"),
                ))
            }
        };
        let lhs = parse_attribute_list(id, lhs_text)?;
        let rhs = parse_attribute_list(id, rhs_text)?;
        if rhs.len() != 1 {
            return Err(ScrubError::invalid_rule(
                id,
                "conditional dependency needs exactly one target attribute",
            ));
        }
        Ok((lhs, rhs.into_iter().next().unwrap_or_default()))
    }

    fn parse_row(id: &str, row: &str, lhs_len: usize) -> Result<(Vec<Pattern>, Pattern)> {
        let mut sides = row.split("->");
        let (lhs_text, rhs_text) = match (sides.next(), sides.next(), sides.next()) {
            (Some(lhs), Some(rhs), None) => (lhs, rhs),
            _ => {
                return Err(ScrubError::invalid_rule(
                    id,
                    format!("expected tableau row 'a1, _ -> c1' but got '{row}'"),
                ))
            }
        };

        let lhs_patterns: Vec<Pattern> = lhs_text.split(',').map(Pattern::parse).collect();
        if lhs_patterns
            .iter()
            .any(|p| matches!(p, Pattern::Literal(text) if text.is_empty()))
        {
            return Err(ScrubError::invalid_rule(id, "empty pattern cell"));
        }
        if lhs_patterns.len() != lhs_len {
            return Err(ScrubError::invalid_rule(
                id,
                format!(
                    "tableau row has {} pattern cells but the header names {} attributes",
                    lhs_patterns.len(),
                    lhs_len
                ),
            ));
        }

        let rhs_pattern = Pattern::parse(rhs_text);
        if matches!(&rhs_pattern, Pattern::Literal(text) if text.is_empty()) {
            return Err(ScrubError::invalid_rule(id, "empty target pattern"));
        }
        Ok((lhs_patterns, rhs_pattern))
    }

    fn matches_row(&self, tuple: &Tuple) -> bool {
        self.lhs
            .iter()
            .zip(&self.lhs_patterns)
            .all(|(attribute, pattern)| pattern.matches(&attribute_value(tuple, attribute)))
    }

    /// The embedded dependency's left-hand attributes.
    pub fn lhs(&self) -> &[String] {
        &self.lhs
    }

    /// The embedded dependency's target attribute.
    pub fn rhs(&self) -> &str {
        &self.rhs
    }
}

impl Rule for CfdRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn table_names(&self) -> &[String] {
        &self.tables
    }

    fn detect(&self, tuples: &[Tuple]) -> Result<Vec<Violation>> {
        let candidates: Vec<&Tuple> = tuples.iter().filter(|t| self.matches_row(t)).collect();

        let groups = group_by_lhs(candidates.iter().copied(), &self.lhs);
        let mut violations = fd_pair_violations(&self.id, &self.lhs, &self.rhs, &groups);

        if let Pattern::Literal(constant) = &self.rhs_pattern {
            for tuple in &candidates {
                let value = attribute_value(tuple, &self.rhs);
                if value.is_null() || value.to_string() != *constant {
                    let mut cells = vec![attribute_cell(tuple, &self.rhs)];
                    for attribute in &self.lhs {
                        cells.push(attribute_cell(tuple, attribute));
                    }
                    violations.push(Violation::new(&self.id, cells));
                }
            }
        }

        debug!(
            rule.id = %self.id,
            tuples.scanned = tuples.len(),
            tuples.matching = candidates.len(),
            violations.found = violations.len(),
            "Conditional-dependency detection finished"
        );
        Ok(violations)
    }

    fn repair(&self, violation: &Violation) -> Result<Vec<Fix>> {
        let mut target_cells: Vec<_> = violation
            .cells()
            .iter()
            .filter(|c| c.attribute() == self.rhs)
            .collect();
        target_cells.sort_by_key(|c| c.tid());

        match &self.rhs_pattern {
            Pattern::Literal(constant) => Ok(target_cells
                .iter()
                .filter(|c| c.value().to_string() != *constant)
                .map(|c| Fix::set_value(violation.vid(), (*c).clone(), constant.clone()))
                .collect()),
            Pattern::Wildcard => {
                if target_cells.len() >= 2 {
                    Ok(vec![Fix::assign(
                        violation.vid(),
                        (*target_cells[target_cells.len() - 1]).clone(),
                        (*target_cells[0]).clone(),
                    )])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}
