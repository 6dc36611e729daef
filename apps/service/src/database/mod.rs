//! Database abstraction layer
//!
//! Persistent store for monitor definitions and run logs. The scheduler only
//! sees the [`Database`] trait; `DatabaseImpl` backs it with LibSQL and
//! `MemoryDatabase` keeps everything in process.

pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;

pub use memory::MemoryDatabase;
pub use models::StoredRunRecord;
pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
