//! Kautoploy Dashboard Library
//!
//! Project status, build history and live build logs of the Kautoploy
//! deployment platform.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod observe;
pub mod storage;
pub mod surfaces;
pub mod utils;
pub mod workers;
