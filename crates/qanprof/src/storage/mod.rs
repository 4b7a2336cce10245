mod schema;
pub mod writer;

pub use schema::get_meta;
pub use writer::{Storage, entry_count};
