//! Black-box driver traits.
//!
//! The core renders SQL text and manages transaction/lock state; actual
//! transport is delegated to a [`Driver`] implementation supplied by the
//! embedding application. Execution is synchronous: every call runs to
//! completion on the calling thread.

use crate::source::DataSource;
use crate::value::Value;
use std::fmt;

/// A low-level failure reported by a driver.
///
/// Connections map this to [`DbError::Connection`](crate::DbError) or
/// [`DbError::Execution`](crate::DbError) depending on the operation.
#[derive(Debug, Clone)]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DriverError {}

/// Factory for driver sessions; one session per open [`Connection`](crate::Connection).
pub trait Driver {
    type Session: Session;

    /// Establish a session against the given data source.
    fn connect(&self, source: &DataSource) -> Result<Self::Session, DriverError>;
}

/// An established driver session.
pub trait Session {
    /// Run a non-returning statement; reports the affected row count.
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Run a returning statement.
    fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError>;
}

/// Rows returned from a query, in driver-neutral form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create a result set from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a value by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col)
    }

    /// The first column of the first row as an integer, if present.
    ///
    /// A NULL scalar (e.g. `MAX(..)` over an empty table) reads as 0.
    pub fn scalar_i64(&self) -> Option<i64> {
        match self.rows.first()?.first()? {
            Value::Int(i) => Some(*i),
            Value::Null => Some(0),
            Value::Float(f) => Some(*f as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_set_lookup() {
        let rs = ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Int(7), Value::Text("a".into())]],
        );
        assert_eq!(rs.get(0, "id"), Some(&Value::Int(7)));
        assert_eq!(rs.get(0, "missing"), None);
        assert_eq!(rs.get(1, "id"), None);
    }

    #[test]
    fn scalar_reads_null_as_zero() {
        let rs = ResultSet::new(vec!["max".into()], vec![vec![Value::Null]]);
        assert_eq!(rs.scalar_i64(), Some(0));
        assert_eq!(ResultSet::default().scalar_i64(), None);
    }
}
