//! Observation surfaces

pub mod history;
pub mod inline;
