//! Driver abstraction: the blocking JDBC-shaped surface the runtime
//! executes against.
//!
//! The runtime never talks to a database directly. It acquires a
//! [`Connection`] from a [`ConnectionSupplier`], prepares a [`Statement`],
//! runs it and walks the resulting [`Rows`]. Each layer has an idempotent
//! `close`; the runtime releases them in reverse acquisition order.

use std::sync::Arc;

use sluice_query::error::{SluiceError, SluiceResult};
use sluice_query::value::SqlValue;

/// One fetched row, detached from the driver cursor.
///
/// Values appear in SELECT column order; the shared column-name list lets
/// mappers address values by name without copying it per row.
#[derive(Debug, Clone)]
pub struct RowData {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl RowData {
    /// Create a row over a shared column list.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// The column names, in SELECT order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of values in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a 0-based column position.
    pub fn get(&self, index: usize) -> SluiceResult<&SqlValue> {
        self.values.get(index).ok_or_else(|| SluiceError::Mapping {
            column: index.to_string(),
            message: format!("row has only {} columns", self.values.len()),
        })
    }

    /// Value for a named column.
    pub fn get_named(&self, column: &str) -> SluiceResult<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| SluiceError::Mapping {
                column: column.to_string(),
                message: "column not present in result set".to_string(),
            })
    }

    /// Consume the row, yielding its values in column order.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Maps a fetched row into an entity.
///
/// A mapping failure surfaces as an `Err` item in the entity stream; it
/// does not terminate the stream.
pub type RowMapper<E> = Arc<dyn Fn(&RowData) -> SluiceResult<E> + Send + Sync>;

/// Configures a statement around execution.
///
/// Hooks are the extension point for driver-level settings this layer
/// does not own, such as fetch size or statement timeouts.
pub type StatementHook = Arc<dyn Fn(&mut dyn Statement) -> SluiceResult<()> + Send + Sync>;

/// A forward-only cursor over a query result.
pub trait Rows {
    /// Fetch the next row, or `None` when the result set is exhausted.
    fn next_row(&mut self) -> SluiceResult<Option<RowData>>;

    /// Release the cursor. Idempotent.
    fn close(&mut self) -> SluiceResult<()> {
        Ok(())
    }
}

/// A prepared-and-executable statement on one connection.
pub trait Statement {
    /// Execute a SELECT, yielding a row cursor.
    fn execute_query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> SluiceResult<Box<dyn Rows>>;

    /// Execute an INSERT/UPDATE/DELETE, yielding the affected-row count.
    fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> SluiceResult<u64>;

    /// Keys the database generated for the most recent update, in the
    /// order the driver reports them.
    fn generated_keys(&mut self) -> SluiceResult<Vec<i64>> {
        Ok(Vec::new())
    }

    /// Release the statement. Idempotent.
    fn close(&mut self) -> SluiceResult<()> {
        Ok(())
    }
}

/// One database connection.
pub trait Connection {
    /// Create a statement on this connection.
    fn statement(&mut self) -> SluiceResult<Box<dyn Statement>>;

    /// Release the connection. Idempotent.
    fn close(&mut self) -> SluiceResult<()> {
        Ok(())
    }
}

/// Hands out connections; typically backed by a pool.
pub trait ConnectionSupplier: Send + Sync {
    /// Acquire a connection.
    fn connection(&self) -> SluiceResult<Box<dyn Connection>>;
}
