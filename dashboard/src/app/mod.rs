//! Dashboard application: options, state, rendering and commands

pub mod options;
pub mod render;
pub mod run;
pub mod state;
