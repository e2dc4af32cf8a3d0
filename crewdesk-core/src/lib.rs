//! crewdesk core - shared error, logging and configuration types

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;
