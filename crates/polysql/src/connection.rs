//! A stateful, single-engine database session.

use crate::command::Command;
use crate::dialect::Dialect;
use crate::driver::{Driver, ResultSet, Session};
use crate::error::{DbError, DbResult};
use crate::precompiler::Precompiler;
use crate::source::DataSource;
use std::sync::Arc;
use tracing::debug;

/// A lazily-opened connection to one data source.
///
/// The dialect is copied from the data source at creation and never changes.
/// A connection is created unopened; [`open`](Connection::open) (or the
/// first `execute`/`query`, which opens lazily) establishes the driver
/// session. No statement is retried internally: a failure surfaces to the
/// caller, who decides whether to retry `open()` or abandon the connection.
pub struct Connection<D: Driver> {
    driver: Arc<D>,
    source: DataSource,
    dialect: Dialect,
    session: Option<D::Session>,
    /// Transaction depth; 0 = autocommit.
    depth: u32,
}

impl<D: Driver> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.source.host)
            .field("database", &self.source.database)
            .field("dialect", &self.dialect)
            .field("open", &self.session.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

impl<D: Driver> Connection<D> {
    /// Create an unopened connection.
    pub fn new(driver: Arc<D>, source: DataSource) -> Self {
        let dialect = source.dialect;
        Self {
            driver,
            source,
            dialect,
            session: None,
            depth: 0,
        }
    }

    /// The dialect this connection renders and executes for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The data source this connection targets.
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Whether a driver session is currently established.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Current transaction depth (0 = autocommit).
    pub fn transaction_depth(&self) -> u32 {
        self.depth
    }

    /// Establish the driver session.
    ///
    /// Idempotent: a second call on an open connection is a no-op. On
    /// failure the connection stays unopened, so callers may retry.
    pub fn open(&mut self) -> DbResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        debug!(dialect = %self.dialect, host = %self.source.host, "opening connection");
        let session = self
            .driver
            .connect(&self.source)
            .map_err(|e| DbError::connection(e.to_string()))?;
        self.session = Some(session);
        Ok(())
    }

    /// Run a non-returning statement, opening the connection if needed.
    ///
    /// Does not roll back an open transaction on failure; that decision
    /// belongs to the caller.
    pub fn execute(&mut self, command: &Command) -> DbResult<u64> {
        self.open()?;
        debug!(dialect = %self.dialect, sql = %command.text, "execute");
        let session = self.session.as_mut().expect("opened above");
        session
            .execute(&command.text)
            .map_err(|e| DbError::execution(e.to_string(), command.text.clone()))
    }

    /// Run a returning statement, opening the connection if needed.
    pub fn query(&mut self, command: &Command) -> DbResult<ResultSet> {
        self.open()?;
        debug!(dialect = %self.dialect, sql = %command.text, "query");
        let session = self.session.as_mut().expect("opened above");
        session
            .query(&command.text)
            .map_err(|e| DbError::execution(e.to_string(), command.text.clone()))
    }

    // ==================== Transactions ====================

    /// Open an explicit transaction.
    ///
    /// Nested calls are a caller error: the engines covered here have no
    /// native transaction nesting and the depth counter is not silently
    /// flattened.
    pub fn begin_transaction(&mut self) -> DbResult<()> {
        let command = Command::new(self.dialect.begin_transaction_text(), true);
        self.begin_with(&command)
    }

    /// Open a transaction with a caller-supplied begin statement (used by
    /// lock builders on engines whose lock mode rides on BEGIN).
    pub(crate) fn begin_with(&mut self, command: &Command) -> DbResult<()> {
        if self.depth > 0 {
            return Err(DbError::state(
                "begin_transaction called inside an open transaction",
            ));
        }
        self.execute(command)?;
        self.depth = 1;
        Ok(())
    }

    /// Commit the open transaction and return to autocommit.
    pub fn commit(&mut self) -> DbResult<()> {
        if self.depth == 0 {
            return Err(DbError::state("commit called outside of a transaction"));
        }
        self.execute(&Command::new("COMMIT;", true))?;
        self.depth = 0;
        Ok(())
    }

    /// Roll back the open transaction and return to autocommit.
    pub fn rollback(&mut self) -> DbResult<()> {
        if self.depth == 0 {
            return Err(DbError::state("rollback called outside of a transaction"));
        }
        self.execute(&Command::new("ROLLBACK;", true))?;
        self.depth = 0;
        Ok(())
    }

    // ==================== Last insert id ====================

    /// Retrieve the id generated by the most recent insert.
    ///
    /// Without a table, the engine's session-scoped identity function is
    /// used where one exists. With a `(table, column)` pair, falls back to
    /// `SELECT MAX(column) FROM table` — a best-effort approximation that
    /// is not safe under concurrent inserts.
    pub fn last_insert_id(&mut self, table: Option<&str>, column: &str) -> DbResult<i64> {
        let command = match table {
            Some(table) => {
                let mut pre = Precompiler::new(self.dialect);
                let table = pre.quote_identifier(table)?;
                let column = pre.quote_identifier(column)?;
                let alias = pre.make_alias("id");
                Command::new(format!("SELECT MAX({column}) AS {alias} FROM {table};"), true)
            }
            None => match self.dialect {
                Dialect::SqLite => Command::new("SELECT last_insert_rowid() AS \"id\";", true),
                Dialect::MsSql => Command::new("SELECT SCOPE_IDENTITY() AS [id];", true),
                Dialect::Db2 => Command::new(
                    "SELECT IDENTITY_VAL_LOCAL() AS \"id\" FROM SYSIBM.SYSDUMMY1;",
                    true,
                ),
                Dialect::Ansi | Dialect::Oracle => {
                    return Err(DbError::unsupported(format!(
                        "The {} dialect has no session identity function; pass a table and column",
                        self.dialect
                    )));
                }
            },
        };
        let rows = self.query(&command)?;
        Ok(rows.scalar_i64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::RecordingDriver;
    use crate::value::Value;

    fn source(dialect: Dialect) -> DataSource {
        DataSource::new(dialect, "primary", "app", "user", "pw")
    }

    fn conn(driver: &Arc<RecordingDriver>, dialect: Dialect) -> Connection<RecordingDriver> {
        Connection::new(Arc::clone(driver), source(dialect))
    }

    #[test]
    fn open_is_lazy_and_idempotent() {
        let driver = Arc::new(RecordingDriver::new());
        let mut conn = conn(&driver, Dialect::Ansi);
        assert!(!conn.is_open());

        conn.execute(&Command::new("DELETE FROM t;", true)).unwrap();
        assert!(conn.is_open());
        conn.open().unwrap();
        conn.execute(&Command::new("DELETE FROM u;", true)).unwrap();

        assert_eq!(driver.connected_hosts(), vec!["primary"]);
        assert_eq!(
            driver.statements(),
            vec!["DELETE FROM t;", "DELETE FROM u;"]
        );
    }

    #[test]
    fn failed_open_leaves_connection_retryable() {
        let driver = Arc::new(RecordingDriver::new());
        driver.set_fail_connect(true);
        let mut conn = conn(&driver, Dialect::Ansi);

        let err = conn.open().unwrap_err();
        assert!(err.is_connection());
        assert!(!conn.is_open());

        driver.set_fail_connect(false);
        conn.open().unwrap();
        assert!(conn.is_open());
    }

    #[test]
    fn execution_error_carries_command_text() {
        let driver = Arc::new(RecordingDriver::new());
        driver.fail_sql_containing("broken");
        let mut conn = conn(&driver, Dialect::Ansi);

        let err = conn
            .execute(&Command::new("UPDATE broken SET x = 1;", true))
            .unwrap_err();
        match err {
            DbError::Execution { command, .. } => assert!(command.contains("broken")),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn transaction_depth_tracking() {
        let driver = Arc::new(RecordingDriver::new());
        let mut conn = conn(&driver, Dialect::Ansi);

        assert!(conn.commit().unwrap_err().is_builder_state());
        assert!(conn.rollback().unwrap_err().is_builder_state());

        conn.begin_transaction().unwrap();
        assert_eq!(conn.transaction_depth(), 1);
        assert!(conn.begin_transaction().unwrap_err().is_builder_state());

        conn.commit().unwrap();
        assert_eq!(conn.transaction_depth(), 0);

        assert_eq!(
            driver.statements(),
            vec!["START TRANSACTION;", "COMMIT;"]
        );
    }

    #[test]
    fn last_insert_id_uses_identity_functions() {
        let driver = Arc::new(RecordingDriver::new());
        driver.set_query_result(ResultSet::new(vec!["id".into()], vec![vec![Value::Int(42)]]));

        let mut conn = conn(&driver, Dialect::SqLite);
        assert_eq!(conn.last_insert_id(None, "id").unwrap(), 42);
        assert_eq!(
            driver.statements(),
            vec!["SELECT last_insert_rowid() AS \"id\";"]
        );

        let mut conn = self::conn(&driver, Dialect::MsSql);
        assert_eq!(conn.last_insert_id(None, "id").unwrap(), 42);
        assert!(driver
            .statements()
            .contains(&"SELECT SCOPE_IDENTITY() AS [id];".to_string()));
    }

    #[test]
    fn last_insert_id_max_fallback() {
        let driver = Arc::new(RecordingDriver::new());
        driver.set_query_result(ResultSet::new(vec!["id".into()], vec![vec![Value::Int(9)]]));
        let mut conn = conn(&driver, Dialect::Oracle);

        assert_eq!(conn.last_insert_id(Some("users"), "id").unwrap(), 9);
        assert_eq!(
            driver.statements(),
            vec!["SELECT MAX(id) AS id FROM users;"]
        );
    }

    #[test]
    fn last_insert_id_unsupported_without_table() {
        let driver = Arc::new(RecordingDriver::new());
        let mut conn = conn(&driver, Dialect::Ansi);
        assert!(conn.last_insert_id(None, "id").unwrap_err().is_unsupported());
    }
}
