//! Build observation: status classification and log synchronization

pub mod registry;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod synchronizer;
