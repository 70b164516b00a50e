//! Optimizer abstraction: scoring and rewriting pipelines into partially
//! SQL-pushed-down form.
//!
//! A [`StreamOptimizer`] is a stateless strategy. `metrics` scores how much
//! of a pipeline the optimizer could translate for a given dialect; it is a
//! pure function, safe to call for any pipeline including an empty one.
//! `optimize` consumes the translatable prefix, mutating the [`SqlQuery`]
//! the terminator will execute, and returns a new pipeline holding only the
//! remaining in-memory actions. Calling `optimize` on a pipeline the
//! optimizer scored `0` for must be a safe no-op.

use std::fmt;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::field::TableSchema;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;
use crate::value::SqlValue;

/// SQL text plus its ordered parameter list.
///
/// This is the value an optimizer rewrites: the terminator seeds it with
/// the base SELECT, the chosen optimizer appends WHERE/ORDER BY/OFFSET
/// rendering and bound parameters, and the runtime executes the result.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlQuery {
    /// Create a query from base SQL text with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// The current SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Replace the SQL text.
    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    /// Mutable access to the parameter list.
    pub fn params_mut(&mut self) -> &mut Vec<SqlValue> {
        &mut self.params
    }

    /// Split into SQL text and parameters.
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

/// Everything an optimizer needs to know about the queried table.
///
/// Immutable; created once per stream-terminator invocation and bound to
/// one table: the base SELECT and COUNT texts, an optional row-count
/// estimate, the field-to-column layout and the dialect in effect.
pub struct SqlStreamInfo<E> {
    schema: Arc<TableSchema<E>>,
    dialect: Arc<dyn Dialect>,
    select_sql: String,
    count_sql: String,
    row_count: Option<Arc<dyn Fn() -> u64 + Send + Sync>>,
}

impl<E> SqlStreamInfo<E> {
    /// Build the info for a table, deriving the base SELECT and COUNT
    /// texts from the schema and dialect.
    pub fn new(schema: Arc<TableSchema<E>>, dialect: Arc<dyn Dialect>) -> Self {
        let table = dialect.full_name(schema.db_schema(), schema.table());
        let columns = schema
            .fields()
            .iter()
            .map(|f| dialect.quote(f.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let select_sql = format!("SELECT {} FROM {}", columns, table);
        let count_sql = format!("SELECT COUNT(*) FROM {}", table);
        Self {
            schema,
            dialect,
            select_sql,
            count_sql,
            row_count: None,
        }
    }

    /// Attach a row-count estimator.
    pub fn with_row_count(mut self, f: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.row_count = Some(Arc::new(f));
        self
    }

    /// The table schema.
    pub fn schema(&self) -> &TableSchema<E> {
        &self.schema
    }

    /// The dialect in effect for this query.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The base (un-filtered) SELECT text.
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// The base COUNT text.
    pub fn count_sql(&self) -> &str {
        &self.count_sql
    }

    /// Estimated table row count, when an estimator was attached.
    pub fn row_count(&self) -> Option<u64> {
        self.row_count.as_ref().map(|f| f())
    }
}

impl<E> Clone for SqlStreamInfo<E> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            dialect: Arc::clone(&self.dialect),
            select_sql: self.select_sql.clone(),
            count_sql: self.count_sql.clone(),
            row_count: self.row_count.clone(),
        }
    }
}

impl<E> fmt::Debug for SqlStreamInfo<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlStreamInfo")
            .field("table", &self.schema.table())
            .field("dialect", &self.dialect.name())
            .field("select_sql", &self.select_sql)
            .finish_non_exhaustive()
    }
}

/// A strategy that scores and rewrites pipelines.
///
/// Implementations must be stateless with respect to `metrics` so that
/// concurrent scoring of different pipelines never interferes.
pub trait StreamOptimizer<E>: Send + Sync {
    /// A short name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Score how much of the pipeline this optimizer can push down.
    ///
    /// Pure; must not mutate the pipeline; returns [`Metrics::ZERO`] when
    /// nothing is optimizable, including for an empty pipeline.
    fn metrics(&self, pipeline: &Pipeline<E>, dialect: &dyn Dialect) -> Metrics;

    /// Consume the translatable prefix, mutating `query`, and return the
    /// pipeline of remaining in-memory actions.
    ///
    /// For a pipeline this optimizer scores `0`, returns the input
    /// pipeline unchanged and leaves `query` untouched.
    fn optimize(
        &self,
        pipeline: &Pipeline<E>,
        info: &SqlStreamInfo<E>,
        query: &mut SqlQuery,
    ) -> Pipeline<E>;
}

/// The identity optimizer: scores every pipeline `0` and pushes nothing
/// down.
///
/// Always installed first in a registry so that a lookup can never come
/// back empty — the worst case is full in-memory execution of the
/// pipeline over the base SELECT.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackOptimizer;

impl<E> StreamOptimizer<E> for FallbackOptimizer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn metrics(&self, _pipeline: &Pipeline<E>, _dialect: &dyn Dialect) -> Metrics {
        Metrics::ZERO
    }

    fn optimize(
        &self,
        pipeline: &Pipeline<E>,
        _info: &SqlStreamInfo<E>,
        _query: &mut SqlQuery,
    ) -> Pipeline<E> {
        pipeline.clone()
    }
}
