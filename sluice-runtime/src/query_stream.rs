//! The asynchronous query result: a lazily-executing, single-use stream
//! of mapped entities over driver resources.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use sluice_query::error::{SluiceError, SluiceResult};
use sluice_query::optimizer::SqlQuery;

use crate::driver::{Connection, ConnectionSupplier, RowMapper, Rows, Statement, StatementHook};

/// Lifecycle of a [`QueryStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created; no database work done yet.
    Init,
    /// Resource acquisition in progress or failed partway.
    Establish,
    /// Executed; rows are being consumed.
    Open,
    /// All resources released.
    Closed,
}

/// A single-use entity stream over one SQL statement.
///
/// No database work happens at construction. The first (and only
/// permitted) call to [`QueryStream::stream`] acquires a connection,
/// prepares and executes the statement and leaves the stream open for
/// iteration; rows are fetched and mapped one at a time as the iterator
/// is advanced.
///
/// [`QueryStream::close`] releases the cursor, statement and connection
/// in reverse acquisition order. It never fails: release errors are
/// logged and swallowed, and repeated calls are no-ops. Dropping the
/// stream closes it.
pub struct QueryStream<E> {
    supplier: Arc<dyn ConnectionSupplier>,
    query: SqlQuery,
    mapper: RowMapper<E>,
    state: StreamState,
    before_execute: Vec<StatementHook>,
    after_execute: Vec<StatementHook>,
    conn: Option<Box<dyn Connection>>,
    stmt: Option<Box<dyn Statement>>,
    rows: Option<Box<dyn Rows>>,
}

impl<E> QueryStream<E> {
    /// Create a stream for one query. Nothing executes yet.
    pub fn new(
        supplier: Arc<dyn ConnectionSupplier>,
        query: SqlQuery,
        mapper: RowMapper<E>,
    ) -> Self {
        Self {
            supplier,
            query,
            mapper,
            state: StreamState::Init,
            before_execute: Vec::new(),
            after_execute: Vec::new(),
            conn: None,
            stmt: None,
            rows: None,
        }
    }

    /// Run a hook on the statement before it executes, in registration
    /// order. Used for driver settings like fetch size or timeouts.
    pub fn with_before_execute(mut self, hook: StatementHook) -> Self {
        self.before_execute.push(hook);
        self
    }

    /// Run a hook on the statement right after it executes.
    pub fn with_after_execute(mut self, hook: StatementHook) -> Self {
        self.after_execute.push(hook);
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The SQL this stream executes.
    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    /// Acquire resources and execute the statement.
    ///
    /// Permitted exactly once, from [`StreamState::Init`]. A second call,
    /// or a call on a closed stream, is an execution error. When
    /// acquisition fails partway the state stays at
    /// [`StreamState::Establish`]; already-acquired resources are
    /// released by [`QueryStream::close`] or drop.
    pub fn stream(&mut self) -> SluiceResult<()> {
        match self.state {
            StreamState::Init => {}
            StreamState::Open | StreamState::Establish => {
                return Err(SluiceError::execution("stream() already called"));
            }
            StreamState::Closed => {
                return Err(SluiceError::execution("stream() called on closed stream"));
            }
        }

        self.state = StreamState::Establish;
        // every acquired resource is stored before the next fallible step,
        // so close() can release it after a partial failure
        self.conn = Some(self.supplier.connection()?);
        if let Some(conn) = self.conn.as_mut() {
            self.stmt = Some(conn.statement()?);
        }
        if let Some(stmt) = self.stmt.as_mut() {
            for hook in &self.before_execute {
                hook(&mut **stmt)?;
            }
            let rows = stmt.execute_query(self.query.sql(), self.query.params())?;
            for hook in &self.after_execute {
                hook(&mut **stmt)?;
            }
            self.rows = Some(rows);
        }
        self.state = StreamState::Open;

        debug!(sql = %self.query.sql(), params = self.query.params().len(), "stream opened");
        Ok(())
    }

    /// Fetch and map the next row.
    ///
    /// `Ok(None)` means the result set is exhausted. A mapping failure
    /// yields an `Err` without ending the stream; a fetch failure closes
    /// the stream.
    fn fetch_next(&mut self) -> Option<SluiceResult<E>> {
        let rows = self.rows.as_mut()?;
        match rows.next_row() {
            Ok(Some(row)) => Some((self.mapper)(&row)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }

    /// Release all held resources, newest first. Idempotent; release
    /// failures are logged and swallowed.
    pub fn close(&mut self) {
        if self.state == StreamState::Closed {
            return;
        }

        if let Some(mut rows) = self.rows.take()
            && let Err(e) = rows.close()
        {
            warn!(error = %e, "releasing result cursor failed");
        }
        if let Some(mut stmt) = self.stmt.take()
            && let Err(e) = stmt.close()
        {
            warn!(error = %e, "releasing statement failed");
        }
        if let Some(mut conn) = self.conn.take()
            && let Err(e) = conn.close()
        {
            warn!(error = %e, "releasing connection failed");
        }
        self.state = StreamState::Closed;
    }
}

impl<E> Iterator for QueryStream<E> {
    type Item = SluiceResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != StreamState::Open {
            return None;
        }
        self.fetch_next()
    }
}

impl<E> Drop for QueryStream<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E> fmt::Debug for QueryStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("state", &self.state)
            .field("sql", &self.query.sql())
            .finish_non_exhaustive()
    }
}
