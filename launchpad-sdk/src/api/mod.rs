//! Off-chain backends: indexer, metadata service and block explorer

pub mod explorer;
pub mod indexer;
pub mod metadata;
pub mod types;

pub use explorer::{page_slice, ExplorerClient};
pub use indexer::IndexerClient;
pub use metadata::{to_usd_history, MetadataClient};
pub use types::*;
