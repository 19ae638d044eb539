//! Prelude for commonly used types and traits in scrub-engine.

pub use crate::backend::{CommitMode, DbConfig, DialectKind};
pub use crate::error::{Result, ScrubError};
pub use crate::installer::ExecutionTables;
pub use crate::logging::LogConfig;
pub use crate::model::{Cell, Column, Fix, FixOp, FixTarget, Tuple, Value, Violation};
pub use crate::pipeline::{DetectionReport, Operator, OperatorExt, Pipeline};
pub use crate::plan::CleanPlan;
pub use crate::rules::Rule;
