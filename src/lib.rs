pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod sync;
pub mod util;

pub use error::SyncError;
