//! Domain models

pub mod build;
