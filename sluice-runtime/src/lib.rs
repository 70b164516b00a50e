//! # sluice-runtime
//!
//! Blocking execution for the Sluice streaming query engine.
//!
//! This crate provides the database-facing half of the engine:
//! - The driver abstraction ([`driver::ConnectionSupplier`],
//!   [`driver::Connection`], [`driver::Statement`], [`driver::Rows`])
//! - The single-use [`query_stream::QueryStream`] with its
//!   acquire/execute/release lifecycle
//! - The [`terminator::StreamTerminator`], which selects an optimizer,
//!   executes the rewritten query and folds residual pipeline actions in
//!   memory
//! - [`persist::SqlPersistence`] for INSERT/UPDATE/DELETE with
//!   generated-key retrieval
//!
//! ## Executing a pipeline
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sluice_query::prelude::*;
//! use sluice_runtime::terminator::StreamTerminator;
//!
//! let registry = Arc::new(OptimizerRegistry::new());
//! registry.install(Arc::new(FilterOrderSkipOptimizer));
//!
//! let terminator = StreamTerminator::new(info, registry, supplier, mapper);
//! let pipeline = Pipeline::new().filter(user::id.gt(10)).skip(5);
//! for user in terminator.execute(pipeline)? {
//!     println!("{:?}", user?);
//! }
//! ```

pub mod driver;
pub mod persist;
pub mod query_stream;
pub mod terminator;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{
    Connection, ConnectionSupplier, RowData, RowMapper, Rows, Statement, StatementHook,
};
pub use persist::SqlPersistence;
pub use query_stream::{QueryStream, StreamState};
pub use terminator::{EntityStream, StreamTerminator, fold};
