//! In-memory mock driver shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use sluice_query::error::{SluiceError, SluiceResult};
use sluice_query::value::SqlValue;

use crate::driver::{Connection, ConnectionSupplier, RowData, Rows, Statement};

/// Which driver layer released, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseLog {
    Rows,
    Statement,
    Connection,
}

#[derive(Default)]
struct Inner {
    executed_queries: Mutex<Vec<(String, Vec<SqlValue>)>>,
    executed_updates: Mutex<Vec<(String, Vec<SqlValue>)>>,
    release_log: Mutex<Vec<ReleaseLog>>,
    closed_connections: Mutex<usize>,
}

/// A scripted [`ConnectionSupplier`]: serves a fixed result set, records
/// every statement it sees and counts releases.
pub struct MockSupplier {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    generated_keys: Vec<i64>,
    fail_statement: bool,
    fail_execute: bool,
    fail_close: bool,
    inner: Arc<Inner>,
}

impl MockSupplier {
    pub fn new(columns: Vec<&str>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: Arc::new(columns.into_iter().map(String::from).collect()),
            rows,
            generated_keys: Vec::new(),
            fail_statement: false,
            fail_execute: false,
            fail_close: false,
            inner: Arc::new(Inner::default()),
        }
    }

    /// Every statement creation fails.
    pub fn fail_statement(mut self) -> Self {
        self.fail_statement = true;
        self
    }

    /// Every execute call fails.
    pub fn fail_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    /// Every release call fails.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Keys reported by `generated_keys` after each update.
    pub fn with_generated_keys(mut self, keys: Vec<i64>) -> Self {
        self.generated_keys = keys;
        self
    }

    pub fn executed_queries(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.inner.executed_queries.lock().clone()
    }

    pub fn executed_updates(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.inner.executed_updates.lock().clone()
    }

    pub fn release_log(&self) -> Vec<ReleaseLog> {
        self.inner.release_log.lock().clone()
    }

    pub fn closed_connections(&self) -> usize {
        *self.inner.closed_connections.lock()
    }
}

impl ConnectionSupplier for MockSupplier {
    fn connection(&self) -> SluiceResult<Box<dyn Connection>> {
        Ok(Box::new(MockConnection {
            columns: Arc::clone(&self.columns),
            rows: self.rows.clone(),
            generated_keys: self.generated_keys.clone(),
            fail_statement: self.fail_statement,
            fail_execute: self.fail_execute,
            fail_close: self.fail_close,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockConnection {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    generated_keys: Vec<i64>,
    fail_statement: bool,
    fail_execute: bool,
    fail_close: bool,
    inner: Arc<Inner>,
}

impl Connection for MockConnection {
    fn statement(&mut self) -> SluiceResult<Box<dyn Statement>> {
        if self.fail_statement {
            return Err(SluiceError::execution("scripted statement failure"));
        }
        Ok(Box::new(MockStatement {
            columns: Arc::clone(&self.columns),
            rows: self.rows.clone(),
            generated_keys: self.generated_keys.clone(),
            fail_execute: self.fail_execute,
            fail_close: self.fail_close,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn close(&mut self) -> SluiceResult<()> {
        self.inner.release_log.lock().push(ReleaseLog::Connection);
        *self.inner.closed_connections.lock() += 1;
        if self.fail_close {
            return Err(SluiceError::execution("connection close failed"));
        }
        Ok(())
    }
}

struct MockStatement {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    generated_keys: Vec<i64>,
    fail_execute: bool,
    fail_close: bool,
    inner: Arc<Inner>,
}

impl Statement for MockStatement {
    fn execute_query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> SluiceResult<Box<dyn Rows>> {
        if self.fail_execute {
            return Err(SluiceError::execution("scripted execute failure"));
        }
        self.inner
            .executed_queries
            .lock()
            .push((sql.to_string(), params.to_vec()));
        Ok(Box::new(MockRows {
            columns: Arc::clone(&self.columns),
            rows: self.rows.clone().into_iter(),
            fail_close: self.fail_close,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> SluiceResult<u64> {
        if self.fail_execute {
            return Err(SluiceError::execution("scripted execute failure"));
        }
        self.inner
            .executed_updates
            .lock()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn generated_keys(&mut self) -> SluiceResult<Vec<i64>> {
        Ok(self.generated_keys.clone())
    }

    fn close(&mut self) -> SluiceResult<()> {
        self.inner.release_log.lock().push(ReleaseLog::Statement);
        if self.fail_close {
            return Err(SluiceError::execution("statement close failed"));
        }
        Ok(())
    }
}

struct MockRows {
    columns: Arc<Vec<String>>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
    fail_close: bool,
    inner: Arc<Inner>,
}

impl Rows for MockRows {
    fn next_row(&mut self) -> SluiceResult<Option<RowData>> {
        Ok(self
            .rows
            .next()
            .map(|values| RowData::new(Arc::clone(&self.columns), values)))
    }

    fn close(&mut self) -> SluiceResult<()> {
        self.inner.release_log.lock().push(ReleaseLog::Rows);
        if self.fail_close {
            return Err(SluiceError::execution("cursor close failed"));
        }
        Ok(())
    }
}
