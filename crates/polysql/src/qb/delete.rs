use crate::command::Command;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::predicate::{Connector, Op, PredicateTree};

use super::{render_order_by, Nulls, OrderKey, Sort};

/// DELETE statement builder.
///
/// MsSQL has no ORDER BY or TOP on a plain DELETE, so the statement is
/// always routed through a common table expression: the row set is selected
/// (with any ordering and TOP bound) into a named CTE and the DELETE targets
/// the CTE. The CTE alias swaps between `t0` and `t1` so it never collides
/// with the table name.
pub struct DeleteQb {
    dialect: Dialect,
    table: String,
    tree: PredicateTree,
    order: Vec<OrderKey>,
    limit: Option<u64>,
    offset: Option<u64>,
    build_error: Option<String>,
}

impl DeleteQb {
    pub(crate) fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            tree: PredicateTree::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            build_error: None,
        }
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

    /// Add an ORDER BY key deciding which rows a bounded delete hits first.
    pub fn order_by(mut self, column: &str, sort: Sort, nulls: Nulls) -> Self {
        self.order.push(OrderKey {
            column: column.to_string(),
            sort,
            nulls,
        });
        self
    }

    /// Bound the number of deleted rows.
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

    /// Skip rows before the first deleted one. No covered engine renders
    /// this; setting it fails at `render()`.
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
        if self.offset.is_some() {
            return Err(DbError::unsupported(format!(
                "The {} dialect cannot render an OFFSET on DELETE",
                self.dialect
            )));
        }
        let pre = Precompiler::new(self.dialect);
        let table = pre.quote_identifier(&self.table)?;

        let sql = match self.dialect {
            Dialect::MsSql => {
                let alias = if table == "t0" { "t1" } else { "t0" };
                let mut inner = String::from("SELECT ");
                if let Some(limit) = self.limit {
                    inner.push_str(&format!("TOP {limit} "));
                }
                inner.push_str("* FROM ");
                inner.push_str(&table);
                if !self.tree.is_empty() {
                    inner.push_str(" WHERE ");
                    inner.push_str(&self.tree.render(&pre)?);
                }
                if !self.order.is_empty() {
                    inner.push_str(" ORDER BY ");
                    inner.push_str(&render_order_by(&self.order, &pre, self.dialect)?);
                }
                format!("WITH {alias} AS ({inner}) DELETE FROM {alias}")
            }
            Dialect::Oracle => {
                if !self.order.is_empty() {
                    return Err(DbError::unsupported(
                        "The oracle dialect cannot render an ordered DELETE",
                    ));
                }
                let mut sql = format!("DELETE FROM {table}");
                match (self.tree.is_empty(), self.limit) {
                    (true, Some(limit)) => {
                        sql.push_str(&format!(" WHERE ROWNUM <= {limit}"));
                    }
                    (false, Some(limit)) => {
                        sql.push_str(" WHERE ");
                        sql.push_str(&self.tree.render(&pre)?);
                        sql.push_str(&format!(" AND ROWNUM <= {limit}"));
                    }
                    (false, None) => {
                        sql.push_str(" WHERE ");
                        sql.push_str(&self.tree.render(&pre)?);
                    }
                    (true, None) => {}
                }
                sql
            }
            Dialect::Db2 => {
                if !self.order.is_empty() || self.limit.is_some() {
                    return Err(DbError::unsupported(
                        "The db2 dialect cannot render a bounded DELETE",
                    ));
                }
                let mut sql = format!("DELETE FROM {table}");
                if !self.tree.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&self.tree.render(&pre)?);
                }
                sql
            }
            Dialect::Ansi | Dialect::SqLite => {
                let mut sql = format!("DELETE FROM {table}");
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
            }
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
