use crate::{Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// SQL text together with its positional parameters, in placeholder order.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Outcome of a statement that returns no row.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Identifier of the last inserted row, when the driver reports one.
    pub last_affected_id: Option<i64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for item in iter {
            self.rows_affected += item.rows_affected;
            self.last_affected_id = item.last_affected_id.or(self.last_affected_id);
        }
    }
}

pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

/// Row of a result set, column labels are shared by every row of the same statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    /// Value of the column labeled `name`, compared case insensitively.
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .zip(self.values.iter())
            .find_map(|(label, value)| label.eq_ignore_ascii_case(name).then_some(value))
    }
}

#[derive(Debug)]
pub enum QueryResult {
    Row(RowLabeled),
    Affected(RowsAffected),
}

/// Result of a write. Touching no row is a regular outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Affected(u64),
    NotFound,
}

impl WriteOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, WriteOutcome::Affected(..))
    }
    pub fn rows(&self) -> u64 {
        match self {
            WriteOutcome::Affected(v) => *v,
            WriteOutcome::NotFound => 0,
        }
    }
}

impl From<RowsAffected> for WriteOutcome {
    fn from(value: RowsAffected) -> Self {
        match value.rows_affected {
            0 => WriteOutcome::NotFound,
            n => WriteOutcome::Affected(n),
        }
    }
}
