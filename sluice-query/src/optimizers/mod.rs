//! Built-in pipeline optimizers.

mod filter_order_skip;

pub use filter_order_skip::FilterOrderSkipOptimizer;
