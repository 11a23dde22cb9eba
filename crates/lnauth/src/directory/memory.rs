//! 内存账户目录

use crate::directory::{AccountDirectory, default_account_name};
use crate::error::LnAuthResult;
use crate::types::{Account, AccountData, AuthData};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Entries {
    next_id: i64,
    /// (provider, authname) -> (账户, 附加数据)
    map: HashMap<(String, String), (Account, AuthData)>,
}

/// 内存账户目录
#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    entries: RwLock<Entries>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn login_or_register(
        &self,
        identity: &str,
        provider: &str,
        account_data: &AccountData,
        auth_data: &AuthData,
    ) -> LnAuthResult<Account> {
        let mut entries = self.entries.write().await;
        let map_key = (provider.to_string(), identity.to_string());

        if let Some((account, _)) = entries.map.get(&map_key) {
            return Ok(account.clone());
        }

        entries.next_id += 1;
        let account = Account {
            id: entries.next_id,
            name: account_data
                .name
                .clone()
                .unwrap_or_else(|| default_account_name(identity)),
            created: chrono::Utc::now().timestamp(),
        };
        entries
            .map
            .insert(map_key, (account.clone(), auth_data.clone()));
        Ok(account)
    }

    async fn login(&self, identity: &str, provider: &str) -> LnAuthResult<Option<Account>> {
        let entries = self.entries.read().await;
        Ok(entries
            .map
            .get(&(provider.to_string(), identity.to_string()))
            .map(|(account, _)| account.clone()))
    }

    async fn linked_keys(&self, provider: &str) -> LnAuthResult<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .map
            .iter()
            .filter(|((p, _), (_, data))| p == provider && !data.key.is_empty())
            .map(|(_, (_, data))| data.key.clone())
            .collect())
    }
}
