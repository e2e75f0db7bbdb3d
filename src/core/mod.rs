pub mod blocks;
pub mod config;
pub mod fetch;
pub mod materialize;
pub mod pool;
pub mod resolve;
pub mod select;
#[cfg(test)]
pub mod testutil;
