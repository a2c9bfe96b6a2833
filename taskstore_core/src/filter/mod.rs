//! Mongo-style filters over task records.
//!
//! External filters (`{"queue": "default", "submitted": {"$gt": "..."}}`) are
//! parsed into the typed [`Filter`] at the boundary, then compiled into a
//! [`Predicate`]: SQL with positional `?` placeholders plus the operands to
//! bind, in placeholder order.

mod compile;
mod parse;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::types::field::Field;
use crate::types::value::Document;

pub use compile::compile_filter;
pub use parse::parse_filter;

/// A value a field is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    LocalTimestamp(NaiveDateTime),
    Dict(Document),
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Eq(Operand),
    NotEq(Operand),
    Lt(Operand),
    Gt(Operand),
    Lte(Operand),
    Gte(Operand),
    In(Vec<Operand>),
    NotIn(Vec<Operand>),
}

impl Test {
    /// Operator spelling used in external filters and error messages.
    pub fn op_name(&self) -> &'static str {
        match self {
            Test::Eq(_) => "$eq",
            Test::NotEq(_) => "$ne",
            Test::Lt(_) => "$lt",
            Test::Gt(_) => "$gt",
            Test::Lte(_) => "$lte",
            Test::Gte(_) => "$gte",
            Test::In(_) => "$in",
            Test::NotIn(_) => "$nin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub test: Test,
}

/// Conditions ANDed together. An empty filter matches every record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for a single equality (or IS NULL) condition.
    pub fn eq(field: Field, operand: impl Into<Operand>) -> Self {
        Self::all().and(field, Test::Eq(operand.into()))
    }

    pub fn and(mut self, field: Field, test: Test) -> Self {
        self.conditions.push(Condition { field, test });
        self
    }

    pub fn from_json(json: &JsonValue) -> Result<Self> {
        parse_filter(json)
    }

    pub fn compile(&self) -> Result<Predicate> {
        compile_filter(self)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Compiled filter: a WHERE-clause body and its bound operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<Operand>,
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Text(s)
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Integer(n)
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Real(n)
    }
}

impl From<DateTime<FixedOffset>> for Operand {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Operand::Timestamp(ts)
    }
}

impl From<NaiveDateTime> for Operand {
    fn from(ts: NaiveDateTime) -> Self {
        Operand::LocalTimestamp(ts)
    }
}

impl From<Document> for Operand {
    fn from(doc: Document) -> Self {
        Operand::Dict(doc)
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        v.map_or(Operand::Null, Into::into)
    }
}
