//! Database access for neurotempo-server
//!
//! Only provider keys live in SQLite; recommendations and session state are
//! in-memory.

pub mod settings;

use neurotempo_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the settings database in the root folder
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    neurotempo_common::db::init_database(db_path).await
}
