//! Typed descriptors that render to the query, projection, sort and update
//! documents the driver understands.

mod filter;
mod options;
mod projection;
mod sort;
mod update;

pub use filter::Filter;
pub use options::FindOptions;
pub use projection::Projection;
pub use sort::{Direction, Sort};
pub use update::UpdateSpec;
