//! Transformation module.
//!
//! - Row: one query string → one flattened record
//! - Schema: union of all records' columns into one table
//! - Pipeline: parse, resolve, flatten, union

pub mod pipeline;
pub mod row;
pub mod schema;

pub use pipeline::*;
pub use row::*;
pub use schema::*;
