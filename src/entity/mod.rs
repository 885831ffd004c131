//! Value types shared by archive generation and extraction.

pub mod common;
pub mod object;
pub mod report;
pub mod slice;

pub use common::{FileFormat, ReportSettings, ValueRange};
pub use object::LeafObject;
pub use report::Report;
pub use slice::{FirstRow, SecondRow, Slice, Slices};
