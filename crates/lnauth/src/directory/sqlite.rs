//! SQLite 账户目录

use crate::directory::{AccountDirectory, default_account_name};
use crate::error::{LnAuthError, LnAuthResult};
use crate::types::{Account, AccountData, AuthData};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, warn};

/// SQLite 账户目录
///
/// `lnauth_accounts` 保存账户，`lnauth_authmap` 保存 `(provider, authname)` 到账户的映射。
#[derive(Clone)]
pub struct SqliteAccountDirectory {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteAccountDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAccountDirectory").finish()
    }
}

impl SqliteAccountDirectory {
    /// 基于已有连接池创建目录并建表
    pub async fn new(pool: SqlitePool) -> LnAuthResult<Self> {
        let directory = Self { pool };
        directory.init().await?;
        Ok(directory)
    }

    async fn init(&self) -> LnAuthResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lnauth_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to create accounts table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lnauth_authmap (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                provider TEXT NOT NULL,
                authname TEXT NOT NULL,
                data TEXT NOT NULL,
                UNIQUE(provider, authname)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LnAuthError::Storage(format!("Failed to create authmap table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_authmap_provider ON lnauth_authmap(provider)")
            .execute(&self.pool)
            .await
            .map_err(|e| LnAuthError::Storage(format!("Failed to create index: {e}")))?;

        debug!("SQLite account directory tables initialized");
        Ok(())
    }

    async fn find_account_by_name(&self, name: &str) -> LnAuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, name, created FROM lnauth_accounts WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, created)| Account { id, name, created }))
    }
}

#[async_trait]
impl AccountDirectory for SqliteAccountDirectory {
    async fn login_or_register(
        &self,
        identity: &str,
        provider: &str,
        account_data: &AccountData,
        auth_data: &AuthData,
    ) -> LnAuthResult<Account> {
        if let Some(account) = self.login(identity, provider).await? {
            return Ok(account);
        }

        let name = account_data
            .name
            .clone()
            .unwrap_or_else(|| default_account_name(identity));
        let now = chrono::Utc::now().timestamp();

        // 并发注册同一身份时两条 INSERT OR IGNORE 都是无害的
        sqlx::query("INSERT OR IGNORE INTO lnauth_accounts (name, created) VALUES (?1, ?2)")
            .bind(&name)
            .bind(now)
            .execute(&self.pool)
            .await?;

        let account = self.find_account_by_name(&name).await?.ok_or_else(|| {
            LnAuthError::AccountResolution(format!("account '{name}' vanished after insert"))
        })?;

        let data = serde_json::to_string(auth_data)
            .map_err(|e| LnAuthError::AccountResolution(format!("invalid auth data: {e}")))?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO lnauth_authmap (account_id, provider, authname, data) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(account.id)
        .bind(provider)
        .bind(identity)
        .bind(data)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            info!("Registered account {} for provider {}", account.id, provider);
        }

        // 以映射表为准，竞争失败方拿到胜出方的账户
        self.login(identity, provider).await?.ok_or_else(|| {
            LnAuthError::AccountResolution(format!("no account mapped for identity {identity}"))
        })
    }

    async fn login(&self, identity: &str, provider: &str) -> LnAuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"SELECT a.id, a.name, a.created
               FROM lnauth_authmap m
               JOIN lnauth_accounts a ON a.id = m.account_id
               WHERE m.provider = ?1 AND m.authname = ?2"#,
        )
        .bind(provider)
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, created)| Account { id, name, created }))
    }

    async fn linked_keys(&self, provider: &str) -> LnAuthResult<Vec<String>> {
        let rows =
            sqlx::query_as::<_, (String,)>("SELECT data FROM lnauth_authmap WHERE provider = ?")
                .bind(provider)
                .fetch_all(&self.pool)
                .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for (data,) in rows {
            match serde_json::from_str::<AuthData>(&data) {
                Ok(auth_data) if !auth_data.key.is_empty() => keys.push(auth_data.key),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable authmap data: {}", e),
            }
        }
        Ok(keys)
    }
}
