//! Query profile session
//!
//! A profile is a ranked list of query fingerprints for one instance and time
//! window, fetched page by page. `ProfileSession` holds what has been loaded
//! so far and `ProfileLoader` is the only thing that mutates it.

mod loader;
mod session;

pub use loader::ProfileLoader;
pub use session::{LoadState, NO_DATA_MESSAGE, PAGE_SIZE, ProfileSession, SessionError};
