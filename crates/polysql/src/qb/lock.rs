use crate::command::Command;
use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use tracing::warn;

/// Lifecycle state of a [`LockQb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No tables added yet.
    Unlocked,
    /// Tables added, lock not yet taken.
    Acquiring,
    /// Lock statements ran inside an open transaction.
    Locked,
    /// Transaction ended; the builder is spent.
    Released,
}

/// Table-lock mode, resolved from caller hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Exclusive,
    Share,
    Immediate,
    Deferred,
}

impl LockMode {
    fn as_sql(self) -> &'static str {
        match self {
            LockMode::Exclusive => "EXCLUSIVE",
            LockMode::Share => "SHARE",
            LockMode::Immediate => "IMMEDIATE",
            LockMode::Deferred => "DEFERRED",
        }
    }

    fn parse(hint: &str) -> Option<Self> {
        match hint.to_ascii_uppercase().as_str() {
            "EXCLUSIVE" => Some(LockMode::Exclusive),
            "SHARE" => Some(LockMode::Share),
            "IMMEDIATE" => Some(LockMode::Immediate),
            "DEFERRED" => Some(LockMode::Deferred),
            _ => None,
        }
    }

    /// Whether this mode applies to the given dialect's locking style.
    fn applies_to(self, dialect: Dialect) -> bool {
        if dialect.uses_transaction_mode_locking() {
            matches!(self, LockMode::Exclusive | LockMode::Immediate | LockMode::Deferred)
        } else {
            matches!(self, LockMode::Exclusive | LockMode::Share)
        }
    }
}

/// Table-lock builder with an acquire/release lifecycle.
///
/// Most engines lock per table with `LOCK TABLE .. IN .. MODE` statements
/// run inside an explicit transaction; SQLite instead carries the mode on
/// the transaction itself (`BEGIN EXCLUSIVE TRANSACTION`), so on that
/// dialect the builder collapses to a single begin statement and added
/// tables only contribute their mode hints.
///
/// The mode defaults to EXCLUSIVE. Hints are matched case-insensitively
/// against the modes the dialect's locking style understands; a later
/// matching hint overrides an earlier one and inapplicable (but known)
/// hints are ignored.
///
/// `acquire` opens a transaction and runs the lock statements in it; on
/// failure the transaction is left open so the caller decides how to clean
/// up. `release` ends the transaction with COMMIT, or ROLLBACK when the
/// method argument says so.
#[derive(Debug)]
pub struct LockQb {
    dialect: Dialect,
    state: LockState,
    /// Pending lock statements keyed by quoted table (a single empty key on
    /// transaction-mode engines). Re-adding a key replaces its statement.
    statements: Vec<(String, Command)>,
    build_error: Option<String>,
}

impl LockQb {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: LockState::Unlocked,
            statements: Vec::new(),
            build_error: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LockState {
        self.state
    }

    /// The statements `acquire` would run, in order.
    pub fn commands(&self) -> Vec<&Command> {
        self.statements.iter().map(|(_, c)| c).collect()
    }

    /// Add a table to lock, with optional mode hints.
    pub fn add(mut self, table: &str, hints: &[&str]) -> Self {
        if matches!(self.state, LockState::Locked | LockState::Released) {
            self.build_error
                .get_or_insert_with(|| "add() called after acquire()".to_string());
            return self;
        }

        let mut mode = LockMode::Exclusive;
        for hint in hints {
            match LockMode::parse(hint) {
                Some(parsed) if parsed.applies_to(self.dialect) => mode = parsed,
                Some(_) => {}
                None => {
                    self.build_error
                        .get_or_insert_with(|| format!("Invalid lock-mode hint: '{hint}'"));
                    return self;
                }
            }
        }

        if self.dialect.uses_transaction_mode_locking() {
            let command = Command::new(format!("BEGIN {} TRANSACTION;", mode.as_sql()), true);
            self.statements = vec![(String::new(), command)];
        } else {
            let pre = Precompiler::new(self.dialect);
            let table = match pre.quote_identifier(table) {
                Ok(table) => table,
                Err(e) => {
                    self.build_error.get_or_insert_with(|| e.to_string());
                    return self;
                }
            };
            let command = Command::new(
                format!("LOCK TABLE {table} IN {} MODE;", mode.as_sql()),
                true,
            );
            match self.statements.iter_mut().find(|(t, _)| *t == table) {
                Some(slot) => slot.1 = command,
                None => self.statements.push((table, command)),
            }
        }

        self.state = LockState::Acquiring;
        self
    }

    /// Open a transaction and take the pending locks.
    ///
    /// On failure the transaction (if it was opened) stays open and the
    /// builder stays in the acquiring state.
    pub fn acquire<D: Driver>(&mut self, conn: &mut Connection<D>) -> DbResult<&mut Self> {
        if let Some(message) = &self.build_error {
            return Err(DbError::state(message.clone()));
        }
        if self.state != LockState::Acquiring {
            return Err(DbError::state(format!(
                "acquire() called in the {:?} state",
                self.state
            )));
        }

        if self.dialect.uses_transaction_mode_locking() {
            let (_, command) = &self.statements[0];
            conn.begin_with(command)?;
        } else {
            conn.begin_transaction()?;
            for (_, command) in &self.statements {
                conn.execute(command)?;
            }
        }

        self.state = LockState::Locked;
        Ok(self)
    }

    /// End the lock transaction.
    ///
    /// `method` is matched case-insensitively: `"ROLLBACK"` rolls the
    /// transaction back, anything else commits it.
    pub fn release<D: Driver>(
        &mut self,
        conn: &mut Connection<D>,
        method: &str,
    ) -> DbResult<&mut Self> {
        if self.state != LockState::Locked {
            return Err(DbError::state(format!(
                "release() called in the {:?} state",
                self.state
            )));
        }

        if method.eq_ignore_ascii_case("rollback") {
            conn.rollback()?;
        } else {
            conn.commit()?;
        }

        self.state = LockState::Released;
        Ok(self)
    }
}

impl Drop for LockQb {
    fn drop(&mut self) {
        if self.state == LockState::Locked {
            warn!(
                dialect = %self.dialect,
                "lock builder dropped while locked; transaction left open"
            );
        }
    }
}
