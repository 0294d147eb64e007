//! The predicate tree backing every statement kind's WHERE clause.
//!
//! Nodes are kept as a flat sequence of comparisons and group markers; each
//! node carries the boolean connector that precedes it. The connector is
//! suppressed at the start of the clause and directly after an opening
//! group marker, and a closing marker is never preceded by one.

use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::value::Value;

/// Boolean connector between predicate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// A comparison operator together with its right-hand value(s).
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// column = value
    Eq(Value),
    /// column <> value
    Ne(Value),
    /// column > value
    Gt(Value),
    /// column >= value
    Gte(Value),
    /// column < value
    Lt(Value),
    /// column <= value
    Lte(Value),
    /// column LIKE pattern
    Like(Value),
    /// column NOT LIKE pattern
    NotLike(Value),
    /// column IN (values...)
    In(Vec<Value>),
    /// column NOT IN (values...)
    NotIn(Vec<Value>),
    /// column BETWEEN from AND to
    Between(Value, Value),
    /// column IS NULL
    IsNull,
    /// column IS NOT NULL
    IsNotNull,
}

impl Op {
    /// Create an equality operator.
    pub fn eq(val: impl Into<Value>) -> Self {
        Op::Eq(val.into())
    }

    /// Create a not-equal operator.
    pub fn ne(val: impl Into<Value>) -> Self {
        Op::Ne(val.into())
    }

    /// Create a greater-than operator.
    pub fn gt(val: impl Into<Value>) -> Self {
        Op::Gt(val.into())
    }

    /// Create a greater-than-or-equal operator.
    pub fn gte(val: impl Into<Value>) -> Self {
        Op::Gte(val.into())
    }

    /// Create a less-than operator.
    pub fn lt(val: impl Into<Value>) -> Self {
        Op::Lt(val.into())
    }

    /// Create a less-than-or-equal operator.
    pub fn lte(val: impl Into<Value>) -> Self {
        Op::Lte(val.into())
    }

    /// Create a LIKE operator.
    pub fn like(pattern: impl Into<Value>) -> Self {
        Op::Like(pattern.into())
    }

    /// Create a NOT LIKE operator.
    pub fn not_like(pattern: impl Into<Value>) -> Self {
        Op::NotLike(pattern.into())
    }

    /// Create an IN operator.
    pub fn in_list<T: Into<Value>>(vals: Vec<T>) -> Self {
        Op::In(vals.into_iter().map(Into::into).collect())
    }

    /// Create a NOT IN operator.
    pub fn not_in<T: Into<Value>>(vals: Vec<T>) -> Self {
        Op::NotIn(vals.into_iter().map(Into::into).collect())
    }

    /// Create a BETWEEN operator.
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    /// Create an IS NULL operator.
    pub fn is_null() -> Self {
        Op::IsNull
    }

    /// Create an IS NOT NULL operator.
    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Comparison {
        column: String,
        op: Op,
        connector: Connector,
    },
    GroupOpen(Connector),
    GroupClose,
}

/// The structured representation of a WHERE clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateTree {
    nodes: Vec<Node>,
    depth: usize,
}

impl PredicateTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a comparison node.
    pub fn push(&mut self, column: impl Into<String>, op: Op, connector: Connector) {
        self.nodes.push(Node::Comparison {
            column: column.into(),
            op,
            connector,
        });
    }

    /// Open a predicate group.
    pub fn open_group(&mut self, connector: Connector) {
        self.nodes.push(Node::GroupOpen(connector));
        self.depth += 1;
    }

    /// Close the innermost predicate group.
    ///
    /// Closing more groups than are open fails at the call site.
    pub fn close_group(&mut self) -> DbResult<()> {
        if self.depth == 0 {
            return Err(DbError::state(
                "Predicate group closed without a matching open",
            ));
        }
        self.nodes.push(Node::GroupClose);
        self.depth -= 1;
        Ok(())
    }

    /// Check the balanced-group invariant.
    pub fn validate(&self) -> DbResult<()> {
        if self.depth != 0 {
            return Err(DbError::state(format!(
                "Predicate tree has {} unclosed group(s)",
                self.depth
            )));
        }
        Ok(())
    }

    /// Render the clause body (without the leading `WHERE`).
    pub fn render(&self, pre: &Precompiler) -> DbResult<String> {
        self.validate()?;

        let mut out = String::new();
        let mut append = false;
        for node in &self.nodes {
            match node {
                Node::GroupOpen(connector) => {
                    if append {
                        out.push(' ');
                        out.push_str(connector.as_sql());
                        out.push(' ');
                    }
                    out.push('(');
                    append = false;
                }
                Node::GroupClose => {
                    out.push(')');
                    append = true;
                }
                Node::Comparison {
                    column,
                    op,
                    connector,
                } => {
                    if append {
                        out.push(' ');
                        out.push_str(connector.as_sql());
                        out.push(' ');
                    }
                    render_comparison(&mut out, pre, column, op)?;
                    append = true;
                }
            }
        }
        Ok(out)
    }
}

fn render_comparison(
    out: &mut String,
    pre: &Precompiler,
    column: &str,
    op: &Op,
) -> DbResult<()> {
    let col = pre.quote_identifier(column)?;
    match op {
        Op::Eq(v) => push_binary(out, &col, "=", pre, v),
        Op::Ne(v) => push_binary(out, &col, "<>", pre, v),
        Op::Gt(v) => push_binary(out, &col, ">", pre, v),
        Op::Gte(v) => push_binary(out, &col, ">=", pre, v),
        Op::Lt(v) => push_binary(out, &col, "<", pre, v),
        Op::Lte(v) => push_binary(out, &col, "<=", pre, v),
        Op::Like(v) => push_binary(out, &col, "LIKE", pre, v),
        Op::NotLike(v) => push_binary(out, &col, "NOT LIKE", pre, v),
        Op::In(vals) => push_in(out, &col, "IN", pre, vals),
        Op::NotIn(vals) => push_in(out, &col, "NOT IN", pre, vals),
        Op::Between(from, to) => {
            out.push_str(&col);
            out.push_str(" BETWEEN ");
            out.push_str(&pre.quote_value(from));
            out.push_str(" AND ");
            out.push_str(&pre.quote_value(to));
        }
        Op::IsNull => {
            out.push_str(&col);
            out.push_str(" IS NULL");
        }
        Op::IsNotNull => {
            out.push_str(&col);
            out.push_str(" IS NOT NULL");
        }
    }
    Ok(())
}

fn push_binary(out: &mut String, col: &str, operator: &str, pre: &Precompiler, v: &Value) {
    out.push_str(col);
    out.push(' ');
    out.push_str(operator);
    out.push(' ');
    out.push_str(&pre.quote_value(v));
}

fn push_in(out: &mut String, col: &str, operator: &str, pre: &Precompiler, vals: &[Value]) {
    if vals.is_empty() {
        // Empty IN list - always false / true
        if operator == "IN" {
            out.push_str("1 = 0");
        } else {
            out.push_str("1 = 1");
        }
        return;
    }
    out.push_str(col);
    out.push(' ');
    out.push_str(operator);
    out.push_str(" (");
    for (i, v) in vals.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&pre.quote_value(v));
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn pre() -> Precompiler {
        Precompiler::new(Dialect::Ansi)
    }

    #[test]
    fn renders_flat_comparisons() {
        let mut tree = PredicateTree::new();
        tree.push("status", Op::eq("active"), Connector::And);
        tree.push("age", Op::gt(18), Connector::And);
        assert_eq!(
            tree.render(&pre()).unwrap(),
            "status = 'active' AND age > 18"
        );
    }

    #[test]
    fn suppresses_connector_after_group_open() {
        let mut tree = PredicateTree::new();
        tree.push("deleted", Op::eq(false), Connector::And);
        tree.open_group(Connector::And);
        tree.push("role", Op::eq("admin"), Connector::And);
        tree.push("role", Op::eq("staff"), Connector::Or);
        tree.close_group().unwrap();
        assert_eq!(
            tree.render(&pre()).unwrap(),
            "deleted = FALSE AND (role = 'admin' OR role = 'staff')"
        );
    }

    #[test]
    fn unclosed_group_fails_at_render() {
        let mut tree = PredicateTree::new();
        tree.open_group(Connector::And);
        tree.push("id", Op::eq(1), Connector::And);
        let err = tree.render(&pre()).unwrap_err();
        assert!(err.is_builder_state());
    }

    #[test]
    fn over_closing_fails_at_call_site() {
        let mut tree = PredicateTree::new();
        tree.push("id", Op::eq(1), Connector::And);
        assert!(tree.close_group().is_err());
    }

    #[test]
    fn empty_in_list_short_circuits() {
        let mut tree = PredicateTree::new();
        tree.push("id", Op::in_list(Vec::<i64>::new()), Connector::And);
        assert_eq!(tree.render(&pre()).unwrap(), "1 = 0");

        let mut tree = PredicateTree::new();
        tree.push("id", Op::not_in(Vec::<i64>::new()), Connector::And);
        assert_eq!(tree.render(&pre()).unwrap(), "1 = 1");
    }

    #[test]
    fn in_list_and_between() {
        let mut tree = PredicateTree::new();
        tree.push("id", Op::in_list(vec![1i64, 2, 3]), Connector::And);
        tree.push("age", Op::between(18, 65), Connector::And);
        assert_eq!(
            tree.render(&pre()).unwrap(),
            "id IN (1, 2, 3) AND age BETWEEN 18 AND 65"
        );
    }

    #[test]
    fn null_checks() {
        let mut tree = PredicateTree::new();
        tree.push("deleted_at", Op::is_null(), Connector::And);
        tree.push("email", Op::is_not_null(), Connector::Or);
        assert_eq!(
            tree.render(&pre()).unwrap(),
            "deleted_at IS NULL OR email IS NOT NULL"
        );
    }

    #[test]
    fn columns_pass_through_precompiler() {
        let mut tree = PredicateTree::new();
        tree.push("order", Op::eq(1), Connector::And);
        assert_eq!(tree.render(&pre()).unwrap(), "\"order\" = 1");

        let mut tree = PredicateTree::new();
        tree.push("id; DROP TABLE x", Op::eq(1), Connector::And);
        assert!(tree.render(&pre()).is_err());
    }
}
