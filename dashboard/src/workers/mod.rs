//! Background workers

pub mod feed;
