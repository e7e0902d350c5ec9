//! CLI command implementations.

pub mod cache;
pub mod cart;
