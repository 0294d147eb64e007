use crate::command::Command;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::predicate::{Connector, Op, PredicateTree};

use super::{render_joins, render_order_by, rownum_wrap, JoinClause, JoinKind, Nulls, OrderKey, Sort};

/// SELECT statement builder.
///
/// Pagination is rendered per dialect: `LIMIT`/`OFFSET` where the engine has
/// them natively, a ROWNUM wrapper on Oracle, `TOP` on MsSQL, and
/// `FETCH FIRST .. ROWS ONLY` on DB2. MsSQL and DB2 have no offset rendering
/// here; an offset on those dialects fails at `render()`.
pub struct SelectQb {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<JoinClause>,
    tree: PredicateTree,
    group_by: Vec<String>,
    order: Vec<OrderKey>,
    limit: Option<u64>,
    offset: Option<u64>,
    build_error: Option<String>,
}

impl SelectQb {
    pub(crate) fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            tree: PredicateTree::new(),
            group_by: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            build_error: None,
        }
    }

    // ==================== Projection ====================

    /// Add a column to the projection; with no columns, `*` is selected.
    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(column.to_string());
        self
    }

    /// Add several columns to the projection.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Reset the projection back to `*`.
    pub fn all(mut self) -> Self {
        self.columns.clear();
        self
    }

    /// Select distinct rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== Joins ====================

    /// Add a join clause; follow with [`on`](Self::on) for the condition.
    pub fn join(mut self, kind: JoinKind, table: &str) -> Self {
        self.joins.push(JoinClause {
            kind,
            table: table.to_string(),
            on: Vec::new(),
        });
        self
    }

    /// Add a column-pair equality condition to the most recent join.
    pub fn on(mut self, left: &str, right: &str) -> Self {
        match self.joins.last_mut() {
            Some(join) => join.on.push((left.to_string(), right.to_string())),
            None => {
                self.build_error
                    .get_or_insert_with(|| "on() called before join()".to_string());
            }
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

    // ==================== Grouping and ordering ====================

    /// Add a GROUP BY column.
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Add an ORDER BY key; keys render in insertion order.
    pub fn order_by(mut self, column: &str, sort: Sort, nulls: Nulls) -> Self {
        self.order.push(OrderKey {
            column: column.to_string(),
            sort,
            nulls,
        });
        self
    }

    /// Limit the number of returned rows.
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

    /// Skip rows before the first returned one.
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
        let pre = Precompiler::new(self.dialect);

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.dialect == Dialect::MsSql {
            if let Some(limit) = self.limit {
                sql.push_str(&format!("TOP {limit} "));
            }
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&pre.quote_identifier(column)?);
            }
        }

        sql.push_str(" FROM ");
        sql.push_str(&pre.quote_identifier(&self.table)?);
        sql.push_str(&render_joins(&self.joins, &pre)?);

        if !self.tree.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.tree.render(&pre)?);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&pre.quote_identifier(column)?);
            }
        }

        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&render_order_by(&self.order, &pre, self.dialect)?);
        }

        match self.dialect {
            Dialect::Ansi | Dialect::SqLite => {
                match (self.limit, self.offset) {
                    (Some(limit), Some(offset)) => {
                        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
                    }
                    (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
                    // SQLite requires a LIMIT before OFFSET; -1 means unbounded.
                    (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                    (None, None) => {}
                }
            }
            Dialect::Oracle => {
                sql = rownum_wrap(sql, self.limit, self.offset);
            }
            Dialect::MsSql => {
                // TOP was injected into the projection above.
                if self.offset.is_some() {
                    return Err(DbError::unsupported(
                        "The mssql dialect cannot render an OFFSET on SELECT",
                    ));
                }
            }
            Dialect::Db2 => {
                if self.offset.is_some() {
                    return Err(DbError::unsupported(
                        "The db2 dialect cannot render an OFFSET on SELECT",
                    ));
                }
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" FETCH FIRST {limit} ROWS ONLY"));
                }
            }
        }

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
