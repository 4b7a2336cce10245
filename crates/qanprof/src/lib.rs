pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod details;
pub mod error;
pub mod explain;
pub mod format;
pub mod params;
pub mod profile;
pub mod storage;
pub mod table_info;

pub use error::{Error, Result};
