//! CLI command implementations.

mod data_sources;
mod listing;
mod query;

pub use data_sources::data_sources;
pub use listing::{queries, users};
pub use query::{paginate, query, show_query};
