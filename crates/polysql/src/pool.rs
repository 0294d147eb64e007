//! Keyed connection cache with primary/replica routing.

use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::source::{DataSource, Role};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// How a statement intends to use its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only; may be routed to a replica.
    Read,
    /// Mutating; always routed to the primary.
    Write,
}

/// An explicit, process-wide cache of connections keyed by
/// `(data source name, role)`.
///
/// Constructed once at startup with the driver and the known data sources,
/// then passed by reference to anything that needs a connection. Each key's
/// connection is created at most once, under the pool lock, and reused
/// afterwards; connections themselves are handed out behind a mutex, and a
/// caller must not share one connection across overlapping statements.
///
/// # Example
/// ```ignore
/// let mut pool = ConnectionPool::new(driver);
/// pool.register("default", primary_source);
/// pool.register("default", replica_source);
///
/// let conn = pool.connection("default", Access::Read)?;
/// conn.lock().unwrap().query(&command)?;
/// # Ok::<(), polysql::DbError>(())
/// ```
pub struct ConnectionPool<D: Driver> {
    driver: Arc<D>,
    sources: HashMap<String, Vec<DataSource>>,
    connections: Mutex<HashMap<(String, Role), Arc<Mutex<Connection<D>>>>>,
}

impl<D: Driver> ConnectionPool<D> {
    /// Create an empty pool around a driver.
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            sources: HashMap::new(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a data source under a name; the source's role decides
    /// whether it serves as the primary or a replica for that name.
    pub fn register(&mut self, name: impl Into<String>, source: DataSource) {
        self.sources.entry(name.into()).or_default().push(source);
    }

    /// Fetch (creating on first use) the connection serving the given
    /// access kind for a data source name.
    ///
    /// Reads route to the lowest-index replica registered for the name, or
    /// to the primary when no replica exists; writes always route to the
    /// primary.
    pub fn connection(
        &self,
        name: &str,
        access: Access,
    ) -> DbResult<Arc<Mutex<Connection<D>>>> {
        let sources = self.sources.get(name).ok_or_else(|| {
            DbError::connection(format!("No data source registered under '{name}'"))
        })?;

        let role = match access {
            Access::Write => Role::Primary,
            Access::Read => sources
                .iter()
                .filter_map(|s| match s.role {
                    Role::Replica(index) => Some(index),
                    Role::Primary => None,
                })
                .min()
                .map_or(Role::Primary, Role::Replica),
        };

        let source = sources
            .iter()
            .find(|s| s.role == role)
            .ok_or_else(|| {
                DbError::connection(format!("No {role:?} source registered under '{name}'"))
            })?;

        let mut connections = self.connections.lock().expect("pool lock poisoned");
        let key = (name.to_string(), role);
        if let Some(existing) = connections.get(&key) {
            return Ok(Arc::clone(existing));
        }

        debug!(name, role = ?role, host = %source.host, "creating pooled connection");
        let conn = Arc::new(Mutex::new(Connection::new(
            Arc::clone(&self.driver),
            source.clone(),
        )));
        connections.insert(key, Arc::clone(&conn));
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::dialect::Dialect;
    use crate::driver::mock::RecordingDriver;

    fn pool_with_replica() -> (Arc<RecordingDriver>, ConnectionPool<RecordingDriver>) {
        let driver = Arc::new(RecordingDriver::new());
        let mut pool = ConnectionPool::new(Arc::clone(&driver));
        pool.register(
            "default",
            DataSource::new(Dialect::Ansi, "primary", "app", "u", "p"),
        );
        pool.register(
            "default",
            DataSource::new(Dialect::Ansi, "replica1", "app", "u", "p").replica(1),
        );
        pool.register(
            "default",
            DataSource::new(Dialect::Ansi, "replica0", "app", "u", "p").replica(0),
        );
        (driver, pool)
    }

    #[test]
    fn reads_route_to_lowest_replica() {
        let (driver, pool) = pool_with_replica();

        let conn = pool.connection("default", Access::Read).unwrap();
        conn.lock()
            .unwrap()
            .query(&Command::new("SELECT * FROM t;", true))
            .unwrap();

        assert_eq!(driver.statements_for("replica0"), vec!["SELECT * FROM t;"]);
        assert!(driver.statements_for("primary").is_empty());
    }

    #[test]
    fn writes_route_to_primary() {
        let (driver, pool) = pool_with_replica();

        let conn = pool.connection("default", Access::Write).unwrap();
        conn.lock()
            .unwrap()
            .execute(&Command::new("DELETE FROM t;", true))
            .unwrap();

        assert_eq!(driver.statements_for("primary"), vec!["DELETE FROM t;"]);
        assert!(driver.statements_for("replica0").is_empty());
    }

    #[test]
    fn reads_fall_back_to_primary_without_replica() {
        let driver = Arc::new(RecordingDriver::new());
        let mut pool = ConnectionPool::new(Arc::clone(&driver));
        pool.register(
            "solo",
            DataSource::new(Dialect::Ansi, "primary", "app", "u", "p"),
        );

        let conn = pool.connection("solo", Access::Read).unwrap();
        conn.lock()
            .unwrap()
            .query(&Command::new("SELECT 1;", true))
            .unwrap();
        assert_eq!(driver.statements_for("primary"), vec!["SELECT 1;"]);
    }

    #[test]
    fn connections_are_created_once_per_key() {
        let (_driver, pool) = pool_with_replica();

        let a = pool.connection("default", Access::Write).unwrap();
        let b = pool.connection("default", Access::Write).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let r = pool.connection("default", Access::Read).unwrap();
        assert!(!Arc::ptr_eq(&a, &r));
    }

    #[test]
    fn unknown_source_name_errors() {
        let (_driver, pool) = pool_with_replica();
        assert!(pool.connection("missing", Access::Read).unwrap_err().is_connection());
    }
}
