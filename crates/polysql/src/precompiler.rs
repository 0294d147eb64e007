//! Per-dialect escaping of identifiers, literal values, and aliases.
//!
//! The precompiler is the sole SQL-injection boundary of the crate: every
//! caller-supplied identifier and literal value passes through it before
//! being concatenated into statement text.
//!
//! - Unquoted identifier parts are validated against `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL; the closing quote
//!   character is escaped by doubling
//! - Dotted notation (`schema.table.column`) is supported
//!
//! # Example
//! ```ignore
//! use polysql::{Dialect, Precompiler};
//!
//! let pre = Precompiler::new(Dialect::MsSql);
//! assert_eq!(pre.quote_identifier("dbo.users")?, "dbo.users");
//! assert_eq!(pre.quote_identifier("order")?, "[order]");
//! # Ok::<(), polysql::DbError>(())
//! ```

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::collections::HashSet;

/// Reserved words that force quoting of an otherwise plain identifier.
///
/// A deliberately conservative cross-engine set; quoting a word that one
/// engine would have accepted bare is harmless.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "COMMIT",
    "CREATE", "CROSS", "CURRENT", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "EXCLUSIVE", "EXISTS", "FETCH", "FIRST", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN",
    "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LEVEL", "LIKE", "LIMIT",
    "LOCK", "MODE", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "RIGHT",
    "ROLLBACK", "ROW", "ROWNUM", "ROWS", "SELECT", "SESSION", "SET", "SHARE", "SIZE", "TABLE",
    "THEN", "TOP", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "USER", "VALUES", "WHEN", "WHERE",
    "WITH",
];

/// A part of a parsed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentPart {
    /// Written bare; quoted on output only when reserved.
    Unquoted(String),
    /// Written quoted; always quoted on output.
    Quoted(String),
}

/// Per-dialect renderer for identifiers, literals, and aliases.
#[derive(Debug, Clone)]
pub struct Precompiler {
    dialect: Dialect,
    issued_aliases: HashSet<String>,
}

impl Precompiler {
    /// Create a precompiler for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            issued_aliases: HashSet::new(),
        }
    }

    /// The dialect this precompiler renders for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    // ==================== Identifiers ====================

    /// Escape an identifier (column, table, or schema name) into
    /// dialect-safe SQL.
    ///
    /// Supports dotted notation (`schema.table.column`) and pre-quoted
    /// parts (`"CamelCase"."UserTable"` on most engines, `[..]` on MsSQL).
    /// Reserved words and parts that were written quoted render quoted;
    /// plain parts render bare.
    pub fn quote_identifier(&self, name: &str) -> DbResult<String> {
        let parts = self.parse_identifier(name)?;
        let mut out = String::with_capacity(name.len() + 4);
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => {
                    if is_reserved(s) {
                        self.write_quoted(&mut out, s);
                    } else {
                        out.push_str(s);
                    }
                }
                IdentPart::Quoted(s) => self.write_quoted(&mut out, s),
            }
        }
        Ok(out)
    }

    fn parse_identifier(&self, s: &str) -> DbResult<Vec<IdentPart>> {
        if s.is_empty() {
            return Err(DbError::state("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(DbError::state("Identifier cannot contain NUL character"));
        }

        let (open, close) = self.dialect.quote_chars();
        let max_len = self.dialect.max_identifier_len();
        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(DbError::state("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(DbError::state(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            // Quoted identifier part.
            if chars.peek() == Some(&open) {
                chars.next(); // opening quote
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == close => {
                            // Escaped closing quote: doubled
                            if chars.peek() == Some(&close) {
                                chars.next();
                                name.push(close);
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(DbError::state("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(DbError::state("Empty quoted identifier"));
                }
                if name.chars().count() > max_len {
                    return Err(DbError::state(format!(
                        "Identifier part '{name}' exceeds the {} dialect's {max_len}-character limit",
                        self.dialect
                    )));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            // Unquoted identifier part.
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if name.is_empty() {
                    // First char: letter or underscore.
                    if c == '_' || c.is_ascii_alphabetic() {
                        name.push(c);
                        chars.next();
                    } else {
                        return Err(DbError::state(format!(
                            "Invalid identifier start character: '{c}'"
                        )));
                    }
                } else {
                    // Subsequent chars: letter, digit, underscore, or $.
                    if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        chars.next();
                    } else {
                        return Err(DbError::state(format!(
                            "Invalid character in identifier: '{c}'"
                        )));
                    }
                }
            }
            if name.is_empty() {
                return Err(DbError::state("Empty identifier segment"));
            }
            if name.chars().count() > max_len {
                return Err(DbError::state(format!(
                    "Identifier part '{name}' exceeds the {} dialect's {max_len}-character limit",
                    self.dialect
                )));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        if parts.is_empty() {
            return Err(DbError::state("Empty identifier"));
        }

        Ok(parts)
    }

    fn write_quoted(&self, out: &mut String, name: &str) {
        let (open, close) = self.dialect.quote_chars();
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
                out.push(close);
            } else {
                out.push(ch);
            }
        }
        out.push(close);
    }

    // ==================== Literal values ====================

    /// Escape a literal value into dialect-safe SQL text.
    pub fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => {
                if self.dialect.has_boolean_literals() {
                    if *b { "TRUE" } else { "FALSE" }.to_string()
                } else {
                    if *b { "1" } else { "0" }.to_string()
                }
            }
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() {
                    f.to_string()
                } else {
                    "NULL".to_string()
                }
            }
            Value::Text(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for ch in s.chars() {
                    if ch == '\'' {
                        out.push('\'');
                        out.push('\'');
                    } else {
                        out.push(ch);
                    }
                }
                out.push('\'');
                out
            }
            Value::Bytes(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    hex.push_str(&format!("{b:02X}"));
                }
                match self.dialect {
                    Dialect::MsSql => format!("0x{hex}"),
                    _ => format!("X'{hex}'"),
                }
            }
        }
    }

    // ==================== Aliases ====================

    /// Derive a safe alias from a hint.
    ///
    /// The hint is reduced to the unquoted identifier charset, truncated to
    /// the engine's max identifier length, steered away from reserved words,
    /// and suffixed with a counter when it collides with an alias already
    /// issued by this precompiler.
    pub fn make_alias(&mut self, hint: &str) -> String {
        let mut base: String = hint
            .chars()
            .filter(|c| *c == '_' || *c == '$' || c.is_ascii_alphanumeric())
            .collect();
        if !base
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        {
            base.insert(0, 't');
        }

        let max_len = self.dialect.max_identifier_len();
        truncate_to(&mut base, max_len);

        let mut candidate = base.clone();
        let mut counter = 0usize;
        while is_reserved(&candidate) || self.issued_aliases.contains(&candidate) {
            let suffix = counter.to_string();
            candidate = base.clone();
            truncate_to(&mut candidate, max_len.saturating_sub(suffix.len()));
            candidate.push_str(&suffix);
            counter += 1;
        }
        self.issued_aliases.insert(candidate.clone());
        candidate
    }
}

fn is_reserved(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    RESERVED_WORDS.binary_search(&upper.as_str()).is_ok()
}

fn truncate_to(s: &mut String, max_chars: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_simple() {
        let pre = Precompiler::new(Dialect::Ansi);
        assert_eq!(pre.quote_identifier("users").unwrap(), "users");
    }

    #[test]
    fn identifier_dotted() {
        let pre = Precompiler::new(Dialect::Ansi);
        assert_eq!(pre.quote_identifier("public.users").unwrap(), "public.users");
    }

    #[test]
    fn identifier_reserved_word_is_quoted() {
        let pre = Precompiler::new(Dialect::Ansi);
        assert_eq!(pre.quote_identifier("order").unwrap(), "\"order\"");
        let pre = Precompiler::new(Dialect::MsSql);
        assert_eq!(pre.quote_identifier("order").unwrap(), "[order]");
    }

    #[test]
    fn identifier_quoted_part_round_trips() {
        let pre = Precompiler::new(Dialect::Ansi);
        let sql = pre.quote_identifier(r#""has""quote""#).unwrap();
        assert_eq!(sql, r#""has""quote""#);
        // Re-parsing the rendered text recovers the same rendering.
        assert_eq!(pre.quote_identifier(&sql).unwrap(), sql);
    }

    #[test]
    fn identifier_mssql_brackets() {
        let pre = Precompiler::new(Dialect::MsSql);
        assert_eq!(
            pre.quote_identifier("[Weird Name].id").unwrap(),
            "[Weird Name].id"
        );
    }

    #[test]
    fn identifier_rejects_injection_attempts() {
        let pre = Precompiler::new(Dialect::Ansi);
        assert!(pre.quote_identifier("users; DROP TABLE x").is_err());
        assert!(pre.quote_identifier("a'b").is_err());
        assert!(pre.quote_identifier("").is_err());
        assert!(pre.quote_identifier("schema..table").is_err());
        assert!(pre.quote_identifier("1starts_with_digit").is_err());
    }

    #[test]
    fn identifier_oracle_length_limit() {
        let pre = Precompiler::new(Dialect::Oracle);
        let long = "a".repeat(31);
        assert!(pre.quote_identifier(&long).is_err());
        let ok = "a".repeat(30);
        assert!(pre.quote_identifier(&ok).is_ok());
    }

    #[test]
    fn value_text_escaping() {
        let pre = Precompiler::new(Dialect::Ansi);
        assert_eq!(
            pre.quote_value(&Value::Text("O'Brien".into())),
            "'O''Brien'"
        );
    }

    #[test]
    fn value_bool_per_dialect() {
        assert_eq!(
            Precompiler::new(Dialect::Ansi).quote_value(&Value::Bool(true)),
            "TRUE"
        );
        assert_eq!(
            Precompiler::new(Dialect::SqLite).quote_value(&Value::Bool(true)),
            "1"
        );
        assert_eq!(
            Precompiler::new(Dialect::Oracle).quote_value(&Value::Bool(false)),
            "0"
        );
    }

    #[test]
    fn value_bytes_per_dialect() {
        let bytes = Value::Bytes(vec![0xDE, 0xAD]);
        assert_eq!(
            Precompiler::new(Dialect::Ansi).quote_value(&bytes),
            "X'DEAD'"
        );
        assert_eq!(
            Precompiler::new(Dialect::MsSql).quote_value(&bytes),
            "0xDEAD"
        );
    }

    #[test]
    fn alias_avoids_reserved_and_collisions() {
        let mut pre = Precompiler::new(Dialect::Ansi);
        assert_eq!(pre.make_alias("order"), "order0");
        assert_eq!(pre.make_alias("id"), "id");
        assert_eq!(pre.make_alias("id"), "id0");
        assert_eq!(pre.make_alias("id"), "id1");
    }

    #[test]
    fn alias_sanitizes_and_truncates() {
        let mut pre = Precompiler::new(Dialect::Oracle);
        let alias = pre.make_alias("count(*) over ()");
        assert!(alias.chars().all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric()));

        let long = "c".repeat(40);
        let alias = pre.make_alias(&long);
        assert_eq!(alias.len(), 30);
    }

    #[test]
    fn reserved_word_table_is_sorted() {
        let mut sorted = RESERVED_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_WORDS);
    }
}
