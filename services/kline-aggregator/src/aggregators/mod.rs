//! Aggregator implementations

pub mod accumulator;
pub mod rollup;

pub use accumulator::{OhlcvAccumulator, OhlcvSnapshot};
pub use rollup::{Delivery, RollupEngine};
