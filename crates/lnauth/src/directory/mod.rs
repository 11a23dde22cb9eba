//! 账户目录
//!
//! 把公钥派生出的身份标识映射到本地账户。挑战服务只依赖 [`AccountDirectory`]，
//! 这里提供 SQLite 和内存两种实现。

pub mod memory;
pub mod sqlite;

use crate::error::LnAuthResult;
use crate::types::{Account, AccountData, AuthData};
use async_trait::async_trait;

pub use memory::MemoryAccountDirectory;
pub use sqlite::SqliteAccountDirectory;

/// 账户目录接口
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// 登录或注册
    ///
    /// 同一 `(provider, identity)` 重复调用返回同一个账户。
    ///
    /// # Arguments
    /// * `identity` - 由公钥派生的身份标识
    /// * `provider` - provider 标识，固定为 `lnauth`
    /// * `account_data` - 新建账户时使用的附加字段
    /// * `auth_data` - 写入映射表的附加数据（linking key 原文）
    async fn login_or_register(
        &self,
        identity: &str,
        provider: &str,
        account_data: &AccountData,
        auth_data: &AuthData,
    ) -> LnAuthResult<Account>;

    /// 查找已关联的账户
    ///
    /// # Returns
    /// * `Ok(Some(account))` - 身份已关联账户
    /// * `Ok(None)` - 未注册
    async fn login(&self, identity: &str, provider: &str) -> LnAuthResult<Option<Account>>;

    /// 该 provider 下所有已关联账户的 linking key
    async fn linked_keys(&self, provider: &str) -> LnAuthResult<Vec<String>>;
}

/// 未指定名称时的默认账户名
pub(crate) fn default_account_name(identity: &str) -> String {
    format!("lnauth_{identity}")
}
