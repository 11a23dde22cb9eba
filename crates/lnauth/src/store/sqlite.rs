//! SQLite 存储后端实现
//!
//! 使用 sqlx 提供原生异步 SQLite 存储支持

use crate::error::{LnAuthError, LnAuthResult};
use crate::store::backend::ChallengeStore;
use crate::types::{Challenge, ChallengeId, ChallengeStatus, Response, ResponseStatus};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// 单条 DELETE ... IN (...) 语句最多绑定的参数个数
const DELETE_CHUNK: usize = 500;

/// SQLite 存储后端
#[derive(Clone)]
pub struct SqliteChallengeStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteChallengeStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl SqliteChallengeStore {
    /// 基于已有连接池创建存储并建表
    pub async fn new(pool: SqlitePool) -> LnAuthResult<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// 在 `dir` 下打开 `lnauth.db`
    ///
    /// # Arguments
    /// * `dir` - 数据库文件存储目录路径（来自 LnAuthdConfig.sqlite_path）
    pub async fn open<P: AsRef<Path>>(dir: P) -> LnAuthResult<Self> {
        let pool = lnauth_common::connect_sqlite(dir).await?;
        Self::new(pool).await
    }
}

#[async_trait]
impl ChallengeStore for SqliteChallengeStore {
    async fn init(&self) -> LnAuthResult<()> {
        // 挑战表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lnauth_challenges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created INTEGER NOT NULL,
                updated INTEGER,
                challenge TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to create challenges table: {e}")))?;

        // 校验记录表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lnauth_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                challenge_id INTEGER NOT NULL,
                created INTEGER NOT NULL,
                signature TEXT NOT NULL,
                key TEXT NOT NULL,
                status INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to create responses table: {e}")))?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_challenges_challenge ON lnauth_challenges(challenge)",
            "CREATE INDEX IF NOT EXISTS idx_challenges_status_created ON lnauth_challenges(status, created)",
            "CREATE INDEX IF NOT EXISTS idx_responses_challenge_id ON lnauth_responses(challenge_id)",
            "CREATE INDEX IF NOT EXISTS idx_responses_key ON lnauth_responses(key)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| LnAuthError::Storage(format!("Failed to create index: {e}")))?;
        }

        debug!("SQLite challenge tables and indexes initialized");
        Ok(())
    }

    async fn create(&self, nonce: &str, now: i64) -> LnAuthResult<ChallengeId> {
        let result = sqlx::query(
            "INSERT INTO lnauth_challenges (created, updated, challenge, status) VALUES (?1, NULL, ?2, ?3)",
        )
        .bind(now)
        .bind(nonce)
        .bind(ChallengeStatus::New.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to insert challenge: {e}")))?;

        let id = result.last_insert_rowid();
        debug!("Created challenge id={}", id);
        Ok(id)
    }

    async fn find_by_nonce(&self, nonce: &str) -> LnAuthResult<Vec<Challenge>> {
        let rows = sqlx::query_as::<_, (i64, i64, Option<i64>, String, i64)>(
            "SELECT id, created, updated, challenge, status FROM lnauth_challenges WHERE challenge = ? ORDER BY id",
        )
        .bind(nonce)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to query challenges: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, created, updated, nonce, status)| Challenge {
                id,
                nonce,
                created,
                updated,
                status: ChallengeStatus::from_i64(status),
            })
            .collect())
    }

    async fn mark_used(&self, id: ChallengeId, now: i64) -> LnAuthResult<bool> {
        let result = sqlx::query(
            "UPDATE lnauth_challenges SET status = ?1, updated = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(ChallengeStatus::Used.as_i64())
        .bind(now)
        .bind(id)
        .bind(ChallengeStatus::New.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to update challenge {id}: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_response(
        &self,
        challenge_id: ChallengeId,
        signature: &str,
        key: &str,
        status: ResponseStatus,
        now: i64,
    ) -> LnAuthResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO lnauth_responses (challenge_id, created, signature, key, status)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(challenge_id)
        .bind(now)
        .bind(signature)
        .bind(key)
        .bind(status.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            LnAuthError::Storage(format!(
                "Failed to insert response for challenge {challenge_id}: {e}"
            ))
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn responses_for(&self, challenge_id: ChallengeId) -> LnAuthResult<Vec<Response>> {
        let rows = sqlx::query_as::<_, (i64, i64, i64, String, String, i64)>(
            "SELECT id, challenge_id, created, signature, key, status FROM lnauth_responses WHERE challenge_id = ? ORDER BY id",
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            LnAuthError::Storage(format!(
                "Failed to query responses for challenge {challenge_id}: {e}"
            ))
        })?;

        Ok(rows
            .into_iter()
            .map(
                |(id, challenge_id, created, signature, key, status)| Response {
                    id,
                    challenge_id,
                    created,
                    signature,
                    key,
                    status: ResponseStatus::from_i64(status),
                },
            )
            .collect())
    }

    async fn delete_expired_new(&self, cutoff: i64) -> LnAuthResult<u64> {
        let result =
            sqlx::query("DELETE FROM lnauth_challenges WHERE status = ?1 AND created <= ?2")
                .bind(ChallengeStatus::New.as_i64())
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    LnAuthError::Storage(format!("Failed to prune expired challenges: {e}"))
                })?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!("Pruned {} expired challenges (cutoff={})", deleted, cutoff);
        }
        Ok(deleted)
    }

    async fn delete_responses_for_keys(&self, keys: &[String]) -> LnAuthResult<u64> {
        let mut deleted = 0;

        for chunk in keys.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM lnauth_responses WHERE key IN ({placeholders})");

            let mut query = sqlx::query(&sql);
            for key in chunk {
                query = query.bind(key);
            }

            let result = query
                .execute(&self.pool)
                .await
                .map_err(|e| LnAuthError::Storage(format!("Failed to prune responses: {e}")))?;
            deleted += result.rows_affected();
        }

        if deleted > 0 {
            info!("Pruned {} responses for linked keys", deleted);
        }
        Ok(deleted)
    }

    async fn count(&self) -> LnAuthResult<u64> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM lnauth_challenges")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LnAuthError::Storage(format!("Failed to count challenges: {e}")))?;

        Ok(count as u64)
    }
}
