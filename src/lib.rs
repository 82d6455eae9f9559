//! shellcache - offline resource cache for bundled web applications
//!
//! Keeps a browser-style cache of an application's static resources in step
//! with the resource manifest shipped by each build: unchanged resources
//! survive an upgrade, changed ones are evicted and refetched lazily, and
//! the CORE set needed for first render is staged before a new generation
//! takes over.

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod manifest;
pub mod net;
pub mod store;
pub mod ui;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ShellcacheError, ShellcacheResult};
