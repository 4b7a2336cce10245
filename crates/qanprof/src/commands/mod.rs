pub mod details;
pub mod list;
pub mod profile;
pub mod query;
pub mod tables;
