//! Kautoploy REST API client

pub mod builds;
pub mod client;
pub mod projects;
