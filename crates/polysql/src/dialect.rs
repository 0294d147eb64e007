//! Database dialect identifiers and per-engine syntax facts.
//!
//! A [`Dialect`] is resolved once, when a builder or connection is created,
//! from its [`DataSource`](crate::DataSource) and never changes afterwards.
//! Every engine-specific rendering decision in the crate is an exhaustive
//! `match` on this enum, so adding or removing an engine is a compile-time
//! visible change.

use crate::error::{DbError, DbResult};
use serde::Deserialize;
use std::fmt;

/// The SQL syntax variant of a specific database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Standard ANSI SQL; also the fallback rendering for engines without
    /// an override for a given statement kind.
    Ansi,
    /// IBM DB2
    Db2,
    /// Microsoft SQL Server
    MsSql,
    /// Oracle Database
    Oracle,
    /// SQLite
    SqLite,
}

impl Dialect {
    /// Parse a dialect identifier as it appears in a data source
    /// configuration (case-insensitive).
    pub fn parse(s: &str) -> DbResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" | "sql" | "standard" => Ok(Self::Ansi),
            "db2" => Ok(Self::Db2),
            "mssql" | "sqlserver" => Ok(Self::MsSql),
            "oracle" => Ok(Self::Oracle),
            "sqlite" | "sqlite3" => Ok(Self::SqLite),
            other => Err(DbError::connection(format!(
                "Unknown dialect identifier: '{other}'"
            ))),
        }
    }

    /// Opening and closing identifier quote characters.
    pub fn quote_chars(self) -> (char, char) {
        match self {
            Self::MsSql => ('[', ']'),
            Self::Ansi | Self::Db2 | Self::Oracle | Self::SqLite => ('"', '"'),
        }
    }

    /// Maximum length of a single identifier part.
    pub fn max_identifier_len(self) -> usize {
        match self {
            Self::Oracle => 30,
            Self::Ansi | Self::Db2 | Self::MsSql | Self::SqLite => 128,
        }
    }

    /// Whether the engine has a boolean literal type; engines without one
    /// get `1` / `0` from the precompiler.
    pub fn has_boolean_literals(self) -> bool {
        matches!(self, Self::Ansi)
    }

    /// Whether `LIMIT n [OFFSET m]` is native syntax on SELECT.
    pub fn has_native_limit(self) -> bool {
        matches!(self, Self::Ansi | Self::SqLite)
    }

    /// Whether table locks are taken by starting a transaction in a given
    /// mode (`BEGIN <mode> TRANSACTION`) rather than by explicit
    /// `LOCK TABLE` statements.
    pub fn uses_transaction_mode_locking(self) -> bool {
        matches!(self, Self::SqLite)
    }

    /// The statement text that opens an explicit transaction.
    pub fn begin_transaction_text(self) -> &'static str {
        match self {
            Self::Ansi | Self::Db2 => "START TRANSACTION;",
            Self::MsSql | Self::SqLite => "BEGIN TRANSACTION;",
            // Oracle has no explicit BEGIN; a transaction starts with the
            // first statement after this marker.
            Self::Oracle => "SET TRANSACTION READ WRITE;",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ansi => "ansi",
            Self::Db2 => "db2",
            Self::MsSql => "mssql",
            Self::Oracle => "oracle",
            Self::SqLite => "sqlite",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Dialect::parse("MsSQL").unwrap(), Dialect::MsSql);
        assert_eq!(Dialect::parse("ORACLE").unwrap(), Dialect::Oracle);
        assert_eq!(Dialect::parse("sqlite3").unwrap(), Dialect::SqLite);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(Dialect::parse("postgres9").is_err());
    }

    #[test]
    fn mssql_uses_brackets() {
        assert_eq!(Dialect::MsSql.quote_chars(), ('[', ']'));
        assert_eq!(Dialect::Oracle.quote_chars(), ('"', '"'));
    }
}
