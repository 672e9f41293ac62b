//! Persistence layer
//!
//! The crawler core only depends on the [`GraphStore`] trait; the SQLite
//! backend is the concrete implementation the binary wires in.

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, StoreError, StoreResult};
