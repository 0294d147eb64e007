use crate::command::Command;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::predicate::{Connector, Op, PredicateTree};
use crate::value::Value;

use super::{render_order_by, rownum_wrap, Nulls, OrderKey, Sort};

/// UPDATE statement builder.
///
/// Oracle has no UPDATE-level ORDER BY or row bounds, so when any of those
/// are set the statement targets an inline view instead: the base SELECT
/// (with the WHERE and ORDER BY moved inside) is wrapped in the ROWNUM
/// pagination idiom and the UPDATE applies to the wrapped view. With both
/// bounds the window is `ROWNUM <= offset + (limit - 1)` outside and
/// `"rn" >= offset` inside.
pub struct UpdateQb {
    dialect: Dialect,
    table: String,
    assignments: Vec<(String, Value)>,
    tree: PredicateTree,
    order: Vec<OrderKey>,
    limit: Option<u64>,
    offset: Option<u64>,
    build_error: Option<String>,
}

impl UpdateQb {
    pub(crate) fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            assignments: Vec::new(),
            tree: PredicateTree::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            build_error: None,
        }
    }

    /// Add a SET assignment. Re-setting a column replaces its value and
    /// keeps the column's original position.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.assignments.iter_mut().find(|(c, _)| c == column) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((column.to_string(), value)),
        }
        self
    }

    // ==================== Predicates ====================

    /// AND a comparison onto the WHERE clause.
    pub fn and_where(mut self, column: &str, op: Op) -> Self {
        self.tree.push(column, op, Connector::And);
        self
    }

    /// OR a comparison onto the WHERE clause.
    pub fn or_where(mut self, column: &str, op: Op) -> Self {
        self.tree.push(column, op, Connector::Or);
        self
    }

    /// Open a parenthesized group joined with AND.
    pub fn and_where_group(mut self) -> Self {
        self.tree.open_group(Connector::And);
        self
    }

    /// Open a parenthesized group joined with OR.
    pub fn or_where_group(mut self) -> Self {
        self.tree.open_group(Connector::Or);
        self
    }

    /// Close the innermost predicate group.
    pub fn end_where_group(mut self) -> Self {
        if let Err(e) = self.tree.close_group() {
            self.build_error.get_or_insert_with(|| e.to_string());
        }
        self
    }

    // ==================== Ordering and bounds ====================

    /// Add an ORDER BY key deciding which rows a bounded update hits first.
    pub fn order_by(mut self, column: &str, sort: Sort, nulls: Nulls) -> Self {
        self.order.push(OrderKey {
            column: column.to_string(),
            sort,
            nulls,
        });
        self
    }

    /// Bound the number of updated rows.
    pub fn limit(mut self, limit: i64) -> Self {
        match u64::try_from(limit) {
            Ok(limit) => self.limit = Some(limit),
            Err(_) => {
                self.build_error
                    .get_or_insert_with(|| format!("Negative limit: {limit}"));
            }
        }
        self
    }

    /// Skip rows before the first updated one (Oracle only).
    pub fn offset(mut self, offset: i64) -> Self {
        match u64::try_from(offset) {
            Ok(offset) => self.offset = Some(offset),
            Err(_) => {
                self.build_error
                    .get_or_insert_with(|| format!("Negative offset: {offset}"));
            }
        }
        self
    }

    // ==================== Rendering ====================

    /// Render the statement; `terminated` appends the trailing `;`.
    pub fn render(self, terminated: bool) -> DbResult<Command> {
        if let Some(message) = self.build_error {
            return Err(DbError::state(message));
        }
        if self.assignments.is_empty() {
            return Err(DbError::state("UPDATE has no SET assignments"));
        }
        let pre = Precompiler::new(self.dialect);

        let mut set_clause = String::from(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                set_clause.push_str(", ");
            }
            set_clause.push_str(&pre.quote_identifier(column)?);
            set_clause.push_str(" = ");
            set_clause.push_str(&pre.quote_value(value));
        }

        let bounded =
            !self.order.is_empty() || self.limit.is_some() || self.offset.is_some();

        let sql = if self.dialect == Dialect::Oracle && bounded {
            let mut inner = String::from("SELECT * FROM ");
            inner.push_str(&pre.quote_identifier(&self.table)?);
            if !self.tree.is_empty() {
                inner.push_str(" WHERE ");
                inner.push_str(&self.tree.render(&pre)?);
            }
            if !self.order.is_empty() {
                inner.push_str(" ORDER BY ");
                inner.push_str(&render_order_by(&self.order, &pre, self.dialect)?);
            }
            let view = rownum_wrap(inner, self.limit, self.offset);
            format!("UPDATE ({view}){set_clause}")
        } else {
            if self.offset.is_some() {
                return Err(DbError::unsupported(format!(
                    "The {} dialect cannot render an OFFSET on UPDATE",
                    self.dialect
                )));
            }
            if bounded && !self.dialect.has_native_limit() {
                return Err(DbError::unsupported(format!(
                    "The {} dialect cannot render a bounded UPDATE",
                    self.dialect
                )));
            }
            let mut sql = String::from("UPDATE ");
            sql.push_str(&pre.quote_identifier(&self.table)?);
            sql.push_str(&set_clause);
            if !self.tree.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&self.tree.render(&pre)?);
            }
            if !self.order.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&render_order_by(&self.order, &pre, self.dialect)?);
            }
            if let Some(limit) = self.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            sql
        };

        let mut sql = sql;
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
