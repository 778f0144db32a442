//! Application services: token acquisition and product retrieval.

pub mod commerce;
pub mod error;
pub mod products;
pub mod tokens;
