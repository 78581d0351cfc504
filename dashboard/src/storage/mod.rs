//! Local storage: layout, settings and login

pub mod layout;
pub mod session;
pub mod settings;
