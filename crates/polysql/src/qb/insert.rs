use crate::command::Command;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::value::Value;

/// INSERT statement builder.
///
/// Renders the single-row `INSERT INTO t (c, ..) VALUES (v, ..)` form, which
/// every covered engine accepts unchanged.
pub struct InsertQb {
    dialect: Dialect,
    table: String,
    assignments: Vec<(String, Value)>,
    build_error: Option<String>,
}

impl InsertQb {
    pub(crate) fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            assignments: Vec::new(),
            build_error: None,
        }
    }

    /// Add a column/value pair. Re-adding a column replaces its value and
    /// keeps the column's original position.
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.assignments.iter_mut().find(|(c, _)| c == column) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((column.to_string(), value)),
        }
        self
    }

    /// Render the statement; `terminated` appends the trailing `;`.
    pub fn render(self, terminated: bool) -> DbResult<Command> {
        if let Some(message) = self.build_error {
            return Err(DbError::state(message));
        }
        if self.assignments.is_empty() {
            return Err(DbError::state("INSERT has no column/value pairs"));
        }
        let pre = Precompiler::new(self.dialect);

        let mut sql = String::from("INSERT INTO ");
        sql.push_str(&pre.quote_identifier(&self.table)?);
        sql.push_str(" (");
        for (i, (column, _)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&pre.quote_identifier(column)?);
        }
        sql.push_str(") VALUES (");
        for (i, (_, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&pre.quote_value(value));
        }
        sql.push(')');
        if terminated {
            sql.push(';');
        }

        Ok(Command::new(sql, terminated))
    }

    /// Render without a terminator, for logging and debugging.
    pub fn to_sql(self) -> DbResult<String> {
        Ok(self.render(false)?.text)
    }
}
