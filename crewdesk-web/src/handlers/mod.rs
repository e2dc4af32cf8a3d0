//! HTTP request handlers for the Crewdesk web server
//!
//! This module contains all the HTTP request handlers organized by functionality.

pub mod devices;
pub mod health;
pub mod lending;
pub mod pages;
pub mod users;

pub use devices::*;
pub use health::*;
pub use lending::*;
pub use pages::*;
pub use users::*;
