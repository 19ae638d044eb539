//! Core data model for the scrub engine.
//!
//! The types in this module form the shared vocabulary every other component
//! operates on: [`Tuple`]s flow through rule detection, which produces
//! [`Violation`]s referencing [`Cell`]s; repair logic produces candidate
//! [`Fix`]es. All identity types compare by structural equality, which
//! underlies violation/fix de-duplication and incremental-update matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A typed scalar value carried by a cell.
///
/// Values are opaque to the pipeline beyond the equality and ordering that
/// rule evaluation needs. Reals compare and hash by bit pattern so a value can
/// key a group map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Absent value. Nulls never co-group during rule evaluation.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Returns true when this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Int(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Real(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Text(v) => {
                3u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Identifies a table attribute: table name plus attribute name.
///
/// Immutable value; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    table: String,
    attribute: String,
}

impl Column {
    /// Creates a column reference.
    pub fn new(table: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            attribute: attribute.into(),
        }
    }

    /// The table this column belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.attribute)
    }
}

/// A row identified by (table name, tuple id), carrying its attribute values.
///
/// The tuple id is a per-table, non-negative integer surrogate assigned at
/// ingestion (stored in the `tid` column of every source table); ids are not
/// reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    table: String,
    tid: i64,
    values: BTreeMap<String, Value>,
}

impl Tuple {
    /// Creates an empty tuple for the given table and tuple id.
    pub fn new(table: impl Into<String>, tid: i64) -> Self {
        Self {
            table: table.into(),
            tid,
            values: BTreeMap::new(),
        }
    }

    /// Sets an attribute value, builder-style.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(attribute.into(), value.into());
        self
    }

    /// Sets an attribute value in place.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(attribute.into(), value.into());
    }

    /// The table this tuple belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The ingestion-assigned tuple id.
    pub fn tid(&self) -> i64 {
        self.tid
    }

    /// Returns the value of an attribute, if present.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Returns the cell for an attribute, if present.
    pub fn cell(&self, attribute: &str) -> Option<Cell> {
        self.values.get(attribute).map(|value| {
            Cell::new(
                Column::new(self.table.clone(), attribute.to_string()),
                self.tid,
                value.clone(),
            )
        })
    }

    /// Iterates over (attribute, value) pairs in attribute order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A single (tuple, column, value) reference: the atomic unit that rules
/// reference and violations/fixes point to.
///
/// Cells compare equal iff table, tuple id, attribute, and value are all
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    column: Column,
    tid: i64,
    value: Value,
}

impl Cell {
    /// Creates a cell.
    pub fn new(column: Column, tid: i64, value: Value) -> Self {
        Self { column, tid, value }
    }

    /// The column this cell belongs to.
    pub fn column(&self) -> &Column {
        &self.column
    }

    /// The table this cell belongs to.
    pub fn table(&self) -> &str {
        self.column.table()
    }

    /// The attribute name.
    pub fn attribute(&self) -> &str {
        self.column.attribute()
    }

    /// The tuple id of the row this cell sits in.
    pub fn tid(&self) -> i64 {
        self.tid
    }

    /// The cell value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]={}", self.column, self.tid, self.value)
    }
}

/// A recorded breach of a constraint, referencing the implicated cells.
///
/// Violations are created only by rule detection with at least one cell,
/// never mutated after persistence, and removed only by incremental update or
/// explicit cleanup. The violation id is assigned by the persistence stage;
/// until then it is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    vid: i64,
    rule_id: String,
    cells: Vec<Cell>,
}

impl Violation {
    /// Creates a violation for the given rule over the implicated cells.
    ///
    /// Callers must supply at least one cell; rule detection always does.
    pub fn new(rule_id: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            vid: 0,
            rule_id: rule_id.into(),
            cells,
        }
    }

    /// The persisted violation id, or 0 before persistence.
    pub fn vid(&self) -> i64 {
        self.vid
    }

    /// The id of the rule that produced this violation.
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// The implicated cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns true when the violation references the given (table, tid) row.
    pub fn touches(&self, table: &str, tid: i64) -> bool {
        self.cells
            .iter()
            .any(|c| c.table() == table && c.tid() == tid)
    }

    pub(crate) fn assign_vid(&mut self, vid: i64) {
        self.vid = vid;
    }
}

/// Repair operation tag, with a stable integer code for the repair table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixOp {
    /// Set equal to / must equal.
    Eq,
    /// Must not equal.
    Neq,
    /// Must be greater than.
    Gt,
    /// Must be greater than or equal to.
    Gte,
    /// Must be less than.
    Lt,
    /// Must be less than or equal to.
    Lte,
}

impl FixOp {
    /// The integer code persisted in the repair table's `op` column.
    pub fn code(&self) -> i64 {
        match self {
            FixOp::Eq => 0,
            FixOp::Neq => 1,
            FixOp::Gt => 2,
            FixOp::Gte => 3,
            FixOp::Lt => 4,
            FixOp::Lte => 5,
        }
    }

    /// Decodes a persisted operation code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FixOp::Eq),
            1 => Some(FixOp::Neq),
            2 => Some(FixOp::Gt),
            3 => Some(FixOp::Gte),
            4 => Some(FixOp::Lt),
            5 => Some(FixOp::Lte),
            _ => None,
        }
    }
}

/// The right-hand side of a fix: another cell or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixTarget {
    /// Repair relative to another cell (e.g. set equal to that cell's value).
    Cell(Cell),
    /// Repair to a literal value.
    Literal(Value),
}

/// A candidate repair action for a violation.
///
/// Produced by rule repair logic or manual intervention; consumed by an
/// external fix-application stage and by incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    vid: i64,
    left: Cell,
    op: FixOp,
    right: FixTarget,
}

impl Fix {
    /// A fix equating the left cell with another cell.
    pub fn assign(vid: i64, left: Cell, right: Cell) -> Self {
        Self {
            vid,
            left,
            op: FixOp::Eq,
            right: FixTarget::Cell(right),
        }
    }

    /// A fix setting the left cell to a literal value.
    pub fn set_value(vid: i64, left: Cell, value: impl Into<Value>) -> Self {
        Self {
            vid,
            left,
            op: FixOp::Eq,
            right: FixTarget::Literal(value.into()),
        }
    }

    /// A fix with an explicit operation.
    pub fn with_op(vid: i64, left: Cell, op: FixOp, right: FixTarget) -> Self {
        Self {
            vid,
            left,
            op,
            right,
        }
    }

    /// The violation this fix addresses.
    pub fn vid(&self) -> i64 {
        self.vid
    }

    /// The cell being repaired.
    pub fn left(&self) -> &Cell {
        &self.left
    }

    /// The repair operation.
    pub fn op(&self) -> FixOp {
        self.op
    }

    /// The repair target.
    pub fn right(&self) -> &FixTarget {
        &self.right
    }
}
