//! Pushdown of a leading `filter -> sorted -> skip` prefix into
//! WHERE / ORDER BY / OFFSET rendering.

use tracing::debug;

use crate::dialect::Dialect;
use crate::metrics::Metrics;
use crate::optimizer::{SqlQuery, SqlStreamInfo, StreamOptimizer};
use crate::pipeline::{Action, Pipeline};

/// Score contributed by each consumed action.
const POINTS_PER_ACTION: u32 = 10;

/// Pushes down a leading prefix of at most one filter, one sort and one
/// skip, in that relative order.
///
/// Each consumed action scores 10 points, so the score is one of
/// `0`, `10`, `20` or `30`. Scanning stops at the first action that is
/// out of order, repeats an already-consumed kind, carries an opaque
/// closure, or is any other kind entirely; everything from that action on
/// stays in the returned pipeline and runs in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOrderSkipOptimizer;

/// Relative pushdown position of a consumable action. Consumption requires
/// strictly increasing stages, which caps each kind at one occurrence and
/// enforces the filter-sort-skip order.
fn stage<E>(action: &Action<E>) -> Option<u8> {
    match action {
        Action::Filter(p) if p.is_translatable() => Some(0),
        Action::Sort(c) if c.is_translatable() => Some(1),
        Action::Skip(_) => Some(2),
        _ => None,
    }
}

fn consumable_prefix<E>(pipeline: &Pipeline<E>) -> &[Action<E>] {
    let mut next_stage = 0;
    let mut taken = 0;
    for action in pipeline.actions() {
        match stage(action) {
            Some(s) if s >= next_stage => {
                next_stage = s + 1;
                taken += 1;
            }
            _ => break,
        }
    }
    &pipeline.actions()[..taken]
}

impl<E> StreamOptimizer<E> for FilterOrderSkipOptimizer {
    fn name(&self) -> &'static str {
        "filter_order_skip"
    }

    fn metrics(&self, pipeline: &Pipeline<E>, _dialect: &dyn Dialect) -> Metrics {
        Metrics::new(consumable_prefix(pipeline).len() as u32 * POINTS_PER_ACTION)
    }

    fn optimize(
        &self,
        pipeline: &Pipeline<E>,
        info: &SqlStreamInfo<E>,
        query: &mut SqlQuery,
    ) -> Pipeline<E> {
        let consumed = consumable_prefix(pipeline);
        if consumed.is_empty() {
            return pipeline.clone();
        }

        let dialect = info.dialect();
        let mut sql = query.sql().to_string();
        let mut skip = None;

        for action in consumed {
            match action {
                Action::Filter(predicate) => {
                    if let Some(fragment) = predicate.to_sql(dialect, query.params_mut()) {
                        sql.push_str(" WHERE ");
                        sql.push_str(&fragment);
                    }
                }
                Action::Sort(comparator) => {
                    if let Some(order_by) = comparator.to_order_by(dialect) {
                        sql.push_str(" ORDER BY ");
                        sql.push_str(&order_by);
                    }
                }
                Action::Skip(n) => skip = Some(*n),
                // stage() admits no other kinds into the prefix
                _ => unreachable!("non-consumable action in pushdown prefix"),
            }
        }

        if skip.is_some() {
            sql = dialect.apply_skip_limit(&sql, query.params_mut(), skip, None);
        }
        query.set_sql(sql);

        debug!(
            optimizer = "filter_order_skip",
            consumed = consumed.len(),
            remaining = pipeline.len() - consumed.len(),
            sql = %query.sql(),
            "pipeline prefix pushed down"
        );

        pipeline.rebuild(pipeline.actions()[consumed.len()..].to_vec())
    }
}
