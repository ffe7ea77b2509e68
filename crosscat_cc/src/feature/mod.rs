//! Column types and the per-view record of a column's model
mod column;

pub use column::ViewColumn;
pub use crosscat_stats::{FType, FTypeError};
