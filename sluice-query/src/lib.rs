//! # sluice-query
//!
//! Pipeline planning for the Sluice streaming query engine.
//!
//! This crate provides the database-independent half of the engine:
//! - The pipeline/action model (`filter`, `sorted`, `skip`, `limit`, `peek`, `distinct`)
//! - Typed fields, predicates and comparators that evaluate in memory
//!   *and* render into SQL fragments
//! - Optimizer scoring and selection, including the built-in
//!   filter/order/skip pushdown
//! - Database dialects for identifier quoting, placeholders and
//!   skip/limit rendering
//!
//! ## Pipelines
//!
//! Build a pipeline with the fluent API:
//!
//! ```rust
//! use sluice_query::field::{DbType, Field};
//! use sluice_query::pipeline::Pipeline;
//!
//! #[derive(Clone)]
//! struct User { id: i64 }
//!
//! let id = Field::new("id", "id", DbType::BigInt, |u: &User| u.id.into());
//!
//! let pipeline = Pipeline::new()
//!     .filter(id.gt(10))
//!     .skip(5)
//!     .limit(20);
//! assert_eq!(pipeline.len(), 3);
//! ```
//!
//! ## Predicates
//!
//! Field predicates evaluate in memory and translate into WHERE fragments:
//!
//! ```rust
//! use sluice_query::dialect::StandardDialect;
//! use sluice_query::field::{DbType, Field};
//!
//! #[derive(Clone)]
//! struct User { id: i64 }
//!
//! let id = Field::new("id", "id", DbType::BigInt, |u: &User| u.id.into());
//! let predicate = id.eq(7);
//!
//! assert!(predicate.test(&User { id: 7 }));
//!
//! let mut params = Vec::new();
//! let sql = predicate.to_sql(&StandardDialect, &mut params).unwrap();
//! assert_eq!(sql, "\"id\" = $1");
//! ```
//!
//! ## Optimizer selection
//!
//! A registry scores every installed optimizer and picks the best:
//!
//! ```rust
//! use std::sync::Arc;
//! use sluice_query::dialect::StandardDialect;
//! use sluice_query::field::{DbType, Field};
//! use sluice_query::optimizers::FilterOrderSkipOptimizer;
//! use sluice_query::pipeline::Pipeline;
//! use sluice_query::registry::OptimizerRegistry;
//!
//! #[derive(Clone)]
//! struct User { id: i64 }
//!
//! let id = Field::new("id", "id", DbType::BigInt, |u: &User| u.id.into());
//!
//! let registry = OptimizerRegistry::new();
//! registry.install(Arc::new(FilterOrderSkipOptimizer));
//!
//! let pipeline = Pipeline::new().filter(id.eq(1)).skip(1);
//! let (best, score) = registry.select(&pipeline, &StandardDialect);
//! assert_eq!(best.name(), "filter_order_skip");
//! assert_eq!(score.get(), 20);
//! ```

pub mod compare;
pub mod dialect;
pub mod error;
pub mod field;
pub mod logging;
pub mod metrics;
pub mod optimizer;
pub mod optimizers;
pub mod pipeline;
pub mod predicate;
pub mod registry;
pub mod value;

pub use compare::{Comparator, SortKey, SortOrder};
pub use dialect::{Dialect, MySqlDialect, StandardDialect};
pub use error::{SluiceError, SluiceResult};
pub use field::{DbType, Field, GeneratedField, Getter, Setter, TableSchema, TableSchemaBuilder};
pub use metrics::Metrics;
pub use optimizer::{FallbackOptimizer, SqlQuery, SqlStreamInfo, StreamOptimizer};
pub use optimizers::FilterOrderSkipOptimizer;
pub use pipeline::{Action, ActionKind, Pipeline};
pub use predicate::{CompareOp, Predicate};
pub use registry::OptimizerRegistry;
pub use value::SqlValue;

pub use logging::{init as init_logging, init_with_level};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::compare::{Comparator, SortKey, SortOrder};
    pub use crate::dialect::{Dialect, MySqlDialect, StandardDialect};
    pub use crate::error::{SluiceError, SluiceResult};
    pub use crate::field::{DbType, Field, GeneratedField, TableSchema};
    pub use crate::metrics::Metrics;
    pub use crate::optimizer::{SqlQuery, SqlStreamInfo, StreamOptimizer};
    pub use crate::optimizers::FilterOrderSkipOptimizer;
    pub use crate::pipeline::{Action, ActionKind, Pipeline};
    pub use crate::predicate::{CompareOp, Predicate};
    pub use crate::registry::OptimizerRegistry;
    pub use crate::value::SqlValue;
}
