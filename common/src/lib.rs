//! Common market types for the kline aggregator workspace

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod feed;
pub mod market;
pub mod types;

pub use feed::*;
pub use market::*;
pub use types::*;
