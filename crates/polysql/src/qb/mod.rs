//! Statement builders.
//!
//! One builder per statement kind (SELECT/INSERT/UPDATE/DELETE plus the
//! lock builder with its acquire/release lifecycle). Builders accumulate
//! typed clause state through consuming methods and produce a
//! [`Command`](crate::Command) from a single terminal `render()` call; the
//! dialect is fixed at construction and selects the engine-specific
//! rendering path.
//!
//! # Example
//!
//! ```ignore
//! use polysql::{qb, Dialect, Op};
//!
//! let command = qb::select(Dialect::Oracle, "users")
//!     .column("id")
//!     .and_where("status", Op::eq("active"))
//!     .order_by("id", qb::Sort::Asc, qb::Nulls::Default)
//!     .limit(10)
//!     .offset(20)
//!     .render(true)?;
//! # Ok::<(), polysql::DbError>(())
//! ```

mod delete;
mod insert;
mod lock;
mod select;
mod update;

pub use delete::DeleteQb;
pub use insert::InsertQb;
pub use lock::{LockQb, LockState};
pub use select::SelectQb;
pub use update::UpdateQb;

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;

/// Sort direction of an ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc,
    Desc,
}

/// NULL placement of an ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    /// Engine default placement.
    Default,
    First,
    Last,
}

/// One ORDER BY key; keys render in insertion order and are never
/// re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderKey {
    pub column: String,
    pub sort: Sort,
    pub nulls: Nulls,
}

/// Join kind of a JOIN clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    /// Column-pair equality conditions, ANDed together.
    pub on: Vec<(String, String)>,
}

/// Create a SELECT builder for the given dialect and table.
pub fn select(dialect: Dialect, table: &str) -> SelectQb {
    SelectQb::new(dialect, table)
}

/// Create an INSERT builder for the given dialect and table.
pub fn insert(dialect: Dialect, table: &str) -> InsertQb {
    InsertQb::new(dialect, table)
}

/// Create an UPDATE builder for the given dialect and table.
pub fn update(dialect: Dialect, table: &str) -> UpdateQb {
    UpdateQb::new(dialect, table)
}

/// Create a DELETE builder for the given dialect and table.
pub fn delete(dialect: Dialect, table: &str) -> DeleteQb {
    DeleteQb::new(dialect, table)
}

/// Create a lock builder for the given dialect.
pub fn lock(dialect: Dialect) -> LockQb {
    LockQb::new(dialect)
}

// ==================== Shared clause rendering ====================

/// Render the ORDER BY clause body for a list of keys.
///
/// Engines without `NULLS FIRST/LAST` (MsSQL) emulate the placement with a
/// CASE prefix key.
pub(crate) fn render_order_by(
    keys: &[OrderKey],
    pre: &Precompiler,
    dialect: Dialect,
) -> DbResult<String> {
    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let col = pre.quote_identifier(&key.column)?;
        let dir = match key.sort {
            Sort::Asc => "ASC",
            Sort::Desc => "DESC",
        };
        let part = match (key.nulls, dialect) {
            (Nulls::Default, _) => format!("{col} {dir}"),
            (Nulls::First, Dialect::MsSql) => {
                format!("CASE WHEN {col} IS NULL THEN 0 ELSE 1 END, {col} {dir}")
            }
            (Nulls::Last, Dialect::MsSql) => {
                format!("CASE WHEN {col} IS NULL THEN 1 ELSE 0 END, {col} {dir}")
            }
            (Nulls::First, _) => format!("{col} {dir} NULLS FIRST"),
            (Nulls::Last, _) => format!("{col} {dir} NULLS LAST"),
        };
        parts.push(part);
    }
    Ok(parts.join(", "))
}

/// Render accumulated JOIN clauses, leading space included.
pub(crate) fn render_joins(joins: &[JoinClause], pre: &Precompiler) -> DbResult<String> {
    let mut out = String::new();
    for join in joins {
        out.push(' ');
        out.push_str(join.kind.as_sql());
        out.push(' ');
        out.push_str(&pre.quote_identifier(&join.table)?);
        if join.kind == JoinKind::Cross {
            continue;
        }
        if join.on.is_empty() {
            return Err(DbError::state(format!(
                "{} on '{}' has no ON condition",
                join.kind.as_sql(),
                join.table
            )));
        }
        out.push_str(" ON ");
        for (i, (left, right)) in join.on.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            out.push_str(&pre.quote_identifier(left)?);
            out.push_str(" = ");
            out.push_str(&pre.quote_identifier(right)?);
        }
    }
    Ok(out)
}

/// Wrap a SELECT in Oracle's ROWNUM pagination idiom.
///
/// With both bounds present the filter window is `[offset, offset + limit - 1]`,
/// 1-based and inclusive on both ends; with a single bound only that side
/// is filtered.
pub(crate) fn rownum_wrap(sql: String, limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (Some(limit), Some(offset)) => {
            let max_row = offset + limit.saturating_sub(1);
            let min_row = offset;
            format!(
                "SELECT * FROM (SELECT \"t0\".*, ROWNUM AS \"rn\" FROM ({sql}) \"t0\" \
                 WHERE ROWNUM <= {max_row}) WHERE \"rn\" >= {min_row}"
            )
        }
        (Some(limit), None) => format!("SELECT * FROM ({sql}) WHERE ROWNUM <= {limit}"),
        (None, Some(offset)) => format!("SELECT * FROM ({sql}) WHERE ROWNUM >= {offset}"),
        (None, None) => sql,
    }
}
