//! triad-core — wire framing, partition scheme, and configuration.
//!
//! Everything in this crate is shared between the coordinator, the storage
//! nodes, and the command-line client. The wire module in particular is the
//! single source of truth for the framing: both ends of every connection
//! link this crate, so the format is bit-compatible by construction.

pub mod config;
pub mod partition;
pub mod wire;
