//! triad-services — the catalog, blob storage, server loops, and wire
//! clients shared by the Triad daemons and the CLI.

mod blobstore;
mod catalog;
pub mod client;
pub mod coordinator;
pub mod node;
mod timed;

pub use blobstore::{BlobStore, PurgeOutcome};
pub use catalog::Catalog;
pub use client::{CoordinatorClient, NodeClient};
pub use coordinator::Coordinator;
pub use node::NodeServer;
pub use timed::{read_timeout, TimedReader};

pub(crate) use timed::timed;
