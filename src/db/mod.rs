use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

pub mod member;
pub mod store;

pub use member::{MemberRecord, MemberUpdate, MessageEntry, Timestamp};
pub use store::{ActivityStore, StoreError};

pub type DbPool = SqlitePool;

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        if let Some(parent) = Path::new(path.trim_start_matches("//")).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Fresh database in a temporary directory. Keep the `TempDir` alive for as
/// long as the pool is used.
#[cfg(test)]
pub async fn test_pool() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite:{}", dir.path().join("doorbell.db").display());
    let pool = init_db(&url).await.expect("initialize test database");
    (dir, pool)
}
