//! Domain layer: catalogue product types and the shaping transform.

pub mod error;
pub mod product;
pub mod shaping;
