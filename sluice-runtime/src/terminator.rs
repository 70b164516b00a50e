//! The stream terminator: where a pipeline meets the database.
//!
//! A terminal call hands the accumulated [`Pipeline`] here. The terminator
//! asks the registry for the best optimizer, lets it push a prefix of the
//! pipeline down into the SQL it is about to execute, opens a
//! [`QueryStream`] for the rewritten query and folds whatever actions
//! remain over the mapped rows in memory.

use std::sync::Arc;

use tracing::debug;

use sluice_query::error::{SluiceError, SluiceResult};
use sluice_query::optimizer::{SqlQuery, SqlStreamInfo};
use sluice_query::pipeline::{Action, Pipeline};
use sluice_query::registry::OptimizerRegistry;

use crate::driver::{ConnectionSupplier, RowMapper};
use crate::query_stream::QueryStream;

/// A stream of entities, any element of which may be an error.
///
/// Mapping failures travel through the fold as `Err` items; stateless
/// adapters pass them along untouched, materializing adapters stop at the
/// first one.
pub type EntityStream<E> = Box<dyn Iterator<Item = SluiceResult<E>>>;

/// Apply one action to an entity stream.
fn apply_action<E>(action: &Action<E>, source: EntityStream<E>) -> EntityStream<E>
where
    E: Clone + PartialEq + 'static,
{
    match action {
        Action::Filter(predicate) => {
            let predicate = predicate.clone();
            Box::new(source.filter(move |item| match item {
                Ok(entity) => predicate.test(entity),
                Err(_) => true,
            }))
        }
        Action::Sort(comparator) => {
            let comparator = comparator.clone();
            let mut entities = Vec::new();
            for item in source {
                match item {
                    Ok(entity) => entities.push(entity),
                    Err(e) => return Box::new(std::iter::once(Err(e))),
                }
            }
            // Vec::sort_by is stable, so equal entities keep their order
            entities.sort_by(move |a, b| comparator.compare(a, b));
            Box::new(entities.into_iter().map(Ok))
        }
        Action::Skip(n) => {
            let mut remaining = *n;
            Box::new(source.filter(move |item| match item {
                Ok(_) if remaining > 0 => {
                    remaining -= 1;
                    false
                }
                _ => true,
            }))
        }
        Action::Limit(n) => {
            let mut source = source;
            let mut left = *n;
            Box::new(std::iter::from_fn(move || {
                if left == 0 {
                    return None;
                }
                match source.next() {
                    Some(Ok(entity)) => {
                        left -= 1;
                        Some(Ok(entity))
                    }
                    other => other,
                }
            }))
        }
        Action::Peek(observer) => {
            let observer = Arc::clone(observer);
            Box::new(source.inspect(move |item| {
                if let Ok(entity) = item {
                    observer(entity);
                }
            }))
        }
        Action::Distinct => {
            let mut seen: Vec<E> = Vec::new();
            Box::new(source.filter(move |item| match item {
                Ok(entity) => {
                    if seen.contains(entity) {
                        false
                    } else {
                        seen.push(entity.clone());
                        true
                    }
                }
                Err(_) => true,
            }))
        }
    }
}

/// Fold a pipeline over any entity source in memory.
///
/// Skip and limit count successfully mapped entities only; errors are not
/// consumed by either. Distinct keeps the first occurrence of each
/// entity.
pub fn fold<E>(
    pipeline: &Pipeline<E>,
    source: impl Iterator<Item = SluiceResult<E>> + 'static,
) -> EntityStream<E>
where
    E: Clone + PartialEq + 'static,
{
    let mut stream: EntityStream<E> = Box::new(source);
    for action in pipeline.actions() {
        stream = apply_action(action, stream);
    }
    stream
}

/// Executes pipelines against one table.
pub struct StreamTerminator<E> {
    info: SqlStreamInfo<E>,
    registry: Arc<OptimizerRegistry<E>>,
    supplier: Arc<dyn ConnectionSupplier>,
    mapper: RowMapper<E>,
}

impl<E> StreamTerminator<E>
where
    E: Clone + PartialEq + 'static,
{
    /// Create a terminator for one table.
    pub fn new(
        info: SqlStreamInfo<E>,
        registry: Arc<OptimizerRegistry<E>>,
        supplier: Arc<dyn ConnectionSupplier>,
        mapper: RowMapper<E>,
    ) -> Self {
        Self {
            info,
            registry,
            supplier,
            mapper,
        }
    }

    /// The stream info this terminator executes against.
    pub fn info(&self) -> &SqlStreamInfo<E> {
        &self.info
    }

    /// Execute a pipeline: push down what the best optimizer can take,
    /// run the rewritten query and fold the rest in memory.
    pub fn execute(&self, pipeline: Pipeline<E>) -> SluiceResult<EntityStream<E>> {
        let (optimizer, score) = self.registry.select(&pipeline, self.info.dialect());
        let mut query = SqlQuery::new(self.info.select_sql());
        let remaining = optimizer.optimize(&pipeline, &self.info, &mut query);

        debug!(
            table = self.info.schema().table(),
            optimizer = optimizer.name(),
            score = %score,
            remaining = remaining.len(),
            sql = %query.sql(),
            "executing pipeline"
        );

        let mut stream = QueryStream::new(
            Arc::clone(&self.supplier),
            query,
            Arc::clone(&self.mapper),
        );
        stream.stream()?;
        Ok(fold(&remaining, stream))
    }

    /// Count the entities a pipeline yields.
    ///
    /// An empty pipeline becomes a single `COUNT(*)`; otherwise the
    /// pipeline executes normally and the entities are counted, failing
    /// on the first error item.
    pub fn count(&self, pipeline: Pipeline<E>) -> SluiceResult<u64> {
        if pipeline.is_empty() {
            let mapper: RowMapper<u64> = Arc::new(|row| {
                row.get(0)?.as_i64().map(|n| n as u64).ok_or_else(|| {
                    SluiceError::Mapping {
                        column: "count".to_string(),
                        message: "expected integer count".to_string(),
                    }
                })
            });
            let mut stream = QueryStream::new(
                Arc::clone(&self.supplier),
                SqlQuery::new(self.info.count_sql()),
                mapper,
            );
            stream.stream()?;
            return stream
                .next()
                .unwrap_or_else(|| Err(SluiceError::execution("count query returned no rows")));
        }

        let mut total = 0u64;
        for item in self.execute(pipeline)? {
            item?;
            total += 1;
        }
        Ok(total)
    }
}

impl<E> std::fmt::Debug for StreamTerminator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTerminator")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
