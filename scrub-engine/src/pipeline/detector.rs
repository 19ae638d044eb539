//! Detection stage: runs one rule over a batch of tuples.

use super::Operator;
use crate::error::Result;
use crate::model::{Tuple, Violation};
use crate::rules::Rule;
use std::sync::Arc;
use tracing::debug;

/// Applies a single rule's detection logic to the tuples flowing through.
pub struct ViolationDetector {
    rule: Arc<dyn Rule>,
}

impl ViolationDetector {
    /// Creates a detector for the given rule.
    pub fn new(rule: Arc<dyn Rule>) -> Self {
        Self { rule }
    }
}

impl Operator for ViolationDetector {
    type Input = Vec<Tuple>;
    type Output = Vec<Violation>;

    fn execute(&mut self, tuples: Vec<Tuple>) -> Result<Vec<Violation>> {
        let violations = self.rule.detect(&tuples)?;
        debug!(
            rule.id = %self.rule.id(),
            tuples.scanned = tuples.len(),
            violations.found = violations.len(),
            "Detection stage finished"
        );
        Ok(violations)
    }

    fn name(&self) -> &str {
        "violation_detector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tuple;
    use crate::rules::FdRule;

    #[test]
    fn test_detector_delegates_to_rule() {
        let rule =
            FdRule::new("Rule 0", vec!["emp".to_string()], "dept -> manager").unwrap();
        let mut detector = ViolationDetector::new(Arc::new(rule));

        let tuples = vec![
            Tuple::new("emp", 1).with("dept", "A").with("manager", "X"),
            Tuple::new("emp", 2).with("dept", "A").with("manager", "Y"),
        ];
        let violations = detector.execute(tuples).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id(), "Rule 0");
    }
}
