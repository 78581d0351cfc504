//! Wire models of the Kautoploy REST API

pub mod models;
