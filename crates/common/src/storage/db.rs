//! SQLite 连接池管理
//!
//! 所有表共用一个数据库文件 `{sqlite_path}/lnauth.db`，启用 WAL 模式，
//! 保证轮询读请求不会被正在进行的校验写入阻塞。

use crate::error::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// 主数据库文件名
pub const DB_FILE_NAME: &str = "lnauth.db";

/// 创建 SQLite 连接池
///
/// # Arguments
/// * `dir` - 数据库文件存储目录路径，必须已存在
///
/// # Returns
/// 启用 WAL 模式、busy timeout 5 秒的连接池
pub async fn connect_sqlite<P: AsRef<Path>>(dir: P) -> Result<SqlitePool, DatabaseError> {
    let db_file = dir.as_ref().join(DB_FILE_NAME);

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_file.display()))
        .map_err(|e| DatabaseError::ConnectionFailed {
            message: format!("Failed to parse SQLite URL: {e}"),
        })?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed {
            message: format!("Failed to connect to SQLite: {e}"),
        })?;

    info!(
        "SQLite pool ready: path={}, WAL mode enabled",
        db_file.display()
    );

    Ok(pool)
}
