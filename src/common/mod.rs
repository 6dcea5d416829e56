//! Shared infrastructure: error types, binary slice access, geometry.

pub mod binary;
pub mod error;
pub mod geometry;

pub use error::{Error, Result};
pub use geometry::Rect;
