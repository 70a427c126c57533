//! crosspost adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite and in-memory post stores
//! - `publishers`: Twitter, LinkedIn and Reddit API publishers plus an
//!   offline stub

mod store_memory;
mod store_sqlite;

pub mod publishers;

/// Re-exports for post store adapters
pub mod store {
    pub use crate::store_memory::InMemoryPostStore;
    pub use crate::store_sqlite::SqlitePostStore;
}
