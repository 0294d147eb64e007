//! # polysql
//!
//! A dialect-aware SQL statement core for Rust.
//!
//! ## Features
//!
//! - **SQL explicit**: builders render plain, inspectable SQL text (use `to_sql()` to see it)
//! - **Dialect-aware**: one builder API, per-engine rendering (ANSI, DB2, MsSQL, Oracle, SQLite)
//! - **Escaping at one boundary**: every identifier and literal passes through the precompiler
//! - **Black-box transport**: bring your own [`Driver`]; the core never speaks a wire protocol
//! - **Transaction-friendly**: connections track depth; table locks ride on explicit transactions
//! - **Primary/replica routing**: the pool routes reads to replicas and writes to the primary
//!
//! ## Statement builders (qb)
//!
//! The `qb` module provides one builder per statement kind:
//!
//! ```ignore
//! use polysql::{qb, Dialect, Op};
//! use polysql::qb::{Sort, Nulls};
//!
//! // SELECT, paginated the Oracle way
//! let cmd = qb::select(Dialect::Oracle, "users")
//!     .column("id")
//!     .and_where("status", Op::eq("active"))
//!     .order_by("created_at", Sort::Desc, Nulls::Default)
//!     .limit(10)
//!     .offset(20)
//!     .render(true)?;
//!
//! // INSERT
//! let cmd = qb::insert(Dialect::SqLite, "users")
//!     .value("username", "alice")
//!     .value("email", "alice@example.com")
//!     .render(true)?;
//!
//! // UPDATE
//! let cmd = qb::update(Dialect::MsSql, "users")
//!     .set("status", "inactive")
//!     .and_where("id", Op::eq(7))
//!     .render(true)?;
//!
//! // DELETE
//! let cmd = qb::delete(Dialect::MsSql, "sessions")
//!     .and_where("expired", Op::eq(true))
//!     .limit(100)
//!     .render(true)?;
//! # Ok::<(), polysql::DbError>(())
//! ```

pub mod command;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod pool;
pub mod precompiler;
pub mod predicate;
pub mod qb;
pub mod source;
pub mod value;

pub use command::Command;
pub use connection::Connection;
pub use dialect::Dialect;
pub use driver::{Driver, DriverError, ResultSet, Session};
pub use error::{DbError, DbResult};
pub use pool::{Access, ConnectionPool};
pub use precompiler::Precompiler;
pub use predicate::{Connector, Op, PredicateTree};
pub use source::{DataSource, Role};
pub use value::Value;

// Re-export qb module for easy access
pub use qb::{
    delete, insert, lock, select, update, DeleteQb, InsertQb, LockQb, LockState, SelectQb,
    UpdateQb,
};
