pub mod client;
pub mod types;

pub use client::CatalogClient;
pub use types::{Product, SearchResult};
