pub mod cache;
pub mod connection_pool;
pub mod database; // Relational drivers behind an ORM-style handle
pub mod document_store;
pub mod health;

pub use cache::*;
pub use connection_pool::*;
pub use database::{Database, Driver, LogLevel, RelationalPool};
pub use document_store::*;
pub use health::*;
