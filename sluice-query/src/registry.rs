//! Optimizer registry: installation and best-match selection.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::dialect::Dialect;
use crate::metrics::Metrics;
use crate::optimizer::{FallbackOptimizer, StreamOptimizer};
use crate::pipeline::Pipeline;

/// Holds the installed [`StreamOptimizer`]s and picks the best one for a
/// pipeline.
///
/// The optimizer list is kept behind a copy-on-write snapshot: lookups
/// clone an `Arc` to the current list and scan it without holding the
/// lock, so a concurrent `install` never blocks selection and never
/// mutates a list a lookup is scanning. The fallback optimizer is
/// installed at construction, so [`OptimizerRegistry::select`] always
/// returns an optimizer.
///
/// Ties are broken in favor of the earliest installed optimizer: a later
/// candidate replaces the current best only with a strictly greater score.
pub struct OptimizerRegistry<E> {
    optimizers: RwLock<Arc<Vec<Arc<dyn StreamOptimizer<E>>>>>,
}

impl<E> OptimizerRegistry<E> {
    /// Create a registry holding only the fallback optimizer.
    pub fn new() -> Self {
        let fallback: Arc<dyn StreamOptimizer<E>> = Arc::new(FallbackOptimizer);
        Self {
            optimizers: RwLock::new(Arc::new(vec![fallback])),
        }
    }

    /// Install an optimizer after all currently installed ones.
    pub fn install(&self, optimizer: Arc<dyn StreamOptimizer<E>>) {
        let mut guard = self.optimizers.write();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        debug!(optimizer = optimizer.name(), "optimizer installed");
        next.push(optimizer);
        *guard = Arc::new(next);
    }

    /// Number of installed optimizers, fallback included.
    pub fn len(&self) -> usize {
        self.optimizers.read().len()
    }

    /// Whether only the fallback is installed.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Score every installed optimizer against the pipeline and return the
    /// best one together with its score.
    ///
    /// Never comes back empty: when nothing scores above zero the fallback
    /// wins and the whole pipeline runs in memory.
    pub fn select(
        &self,
        pipeline: &Pipeline<E>,
        dialect: &dyn Dialect,
    ) -> (Arc<dyn StreamOptimizer<E>>, Metrics) {
        let snapshot = Arc::clone(&self.optimizers.read());

        let mut best = Arc::clone(&snapshot[0]);
        let mut best_score = best.metrics(pipeline, dialect);
        for candidate in &snapshot[1..] {
            let score = candidate.metrics(pipeline, dialect);
            if score > best_score {
                best = Arc::clone(candidate);
                best_score = score;
            }
        }

        debug!(
            optimizer = best.name(),
            score = %best_score,
            candidates = snapshot.len(),
            "optimizer selected"
        );
        (best, best_score)
    }
}

impl<E> Default for OptimizerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for OptimizerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.optimizers.read().iter().map(|o| o.name()).collect();
        f.debug_struct("OptimizerRegistry")
            .field("optimizers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::StandardDialect;
    use crate::optimizer::{SqlQuery, SqlStreamInfo};
    use crate::optimizers::FilterOrderSkipOptimizer;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
    }

    fn id_field() -> crate::field::Field<User> {
        crate::field::Field::new("id", "id", crate::field::DbType::BigInt, |u: &User| {
            u.id.into()
        })
    }

    /// Scores every pipeline with a fixed value.
    struct FixedScore(&'static str, u32);

    impl StreamOptimizer<User> for FixedScore {
        fn name(&self) -> &'static str {
            self.0
        }

        fn metrics(&self, _pipeline: &Pipeline<User>, _dialect: &dyn Dialect) -> Metrics {
            Metrics::new(self.1)
        }

        fn optimize(
            &self,
            pipeline: &Pipeline<User>,
            _info: &SqlStreamInfo<User>,
            _query: &mut SqlQuery,
        ) -> Pipeline<User> {
            pipeline.clone()
        }
    }

    #[test]
    fn test_new_registry_holds_fallback() {
        let registry = OptimizerRegistry::<User>::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_empty());

        let (best, score) = registry.select(&Pipeline::new().skip(1), &StandardDialect);
        assert_eq!(best.name(), "fallback");
        assert_eq!(score, Metrics::ZERO);
    }

    #[test]
    fn test_select_prefers_higher_score() {
        let registry = OptimizerRegistry::<User>::new();
        registry.install(Arc::new(FixedScore("low", 5)));
        registry.install(Arc::new(FixedScore("high", 25)));
        assert!(!registry.is_empty());

        let (best, score) = registry.select(&Pipeline::new(), &StandardDialect);
        assert_eq!(best.name(), "high");
        assert_eq!(score, Metrics::new(25));
    }

    #[test]
    fn test_tie_breaks_to_earliest_installed() {
        let registry = OptimizerRegistry::<User>::new();
        registry.install(Arc::new(FixedScore("first", 20)));
        registry.install(Arc::new(FixedScore("second", 20)));

        let (best, _) = registry.select(&Pipeline::new(), &StandardDialect);
        assert_eq!(best.name(), "first");
    }

    #[test]
    fn test_zero_scores_fall_back() {
        let registry = OptimizerRegistry::<User>::new();
        registry.install(Arc::new(FilterOrderSkipOptimizer));

        // a limit-first pipeline scores 0 everywhere
        let pipeline = Pipeline::new().limit(3).filter(id_field().eq(1));
        let (best, score) = registry.select(&pipeline, &StandardDialect);
        assert_eq!(best.name(), "fallback");
        assert!(score.is_zero());
    }

    #[test]
    fn test_concurrent_install_and_select() {
        let registry = Arc::new(OptimizerRegistry::<User>::new());

        let selectors: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let pipeline = Pipeline::new().filter(id_field().eq(1)).skip(1);
                        // a lookup mid-install must always find an optimizer
                        let (best, _) = registry.select(&pipeline, &StandardDialect);
                        assert!(!best.name().is_empty());
                    }
                })
            })
            .collect();

        for i in 0..8 {
            registry.install(Arc::new(FixedScore("installed", i)));
        }
        for handle in selectors {
            handle.join().unwrap();
        }

        // fallback plus every install survived the concurrent lookups
        assert_eq!(registry.len(), 9);
        let (best, score) = registry.select(&Pipeline::new(), &StandardDialect);
        assert_eq!(best.name(), "installed");
        assert_eq!(score, Metrics::new(7));
    }

    #[test]
    fn test_filter_order_skip_beats_fallback() {
        let registry = OptimizerRegistry::<User>::new();
        registry.install(Arc::new(FilterOrderSkipOptimizer));

        let pipeline = Pipeline::new().filter(id_field().eq(1)).skip(1);
        let (best, score) = registry.select(&pipeline, &StandardDialect);
        assert_eq!(best.name(), "filter_order_skip");
        assert_eq!(score, Metrics::new(20));
    }
}
