//! LNURL-auth 服务配置
//!
//! 对应登录服务的可调参数：挑战有效期、客户端轮询契约、清理策略和限流。

use serde::{Deserialize, Serialize};

/// 挑战有效期下限（秒）
pub const MIN_EXPIRATION_SECS: u64 = 60;
/// 轮询间隔下限（毫秒）
pub const MIN_FREQUENCY_MS: u64 = 1000;

/// LNURL-auth 服务配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LnAuthConfig {
    /// 挑战有效期（秒）
    ///
    /// NEW 状态的挑战在 `now - created > expiration` 后视为过期，
    /// 校验时被跳过，随后由清理任务删除。
    #[serde(default = "default_expiration")]
    pub expiration: u64,

    /// 客户端轮询间隔（毫秒）
    #[serde(default = "default_frequency")]
    pub frequency: u64,

    /// 客户端最多轮询次数，0 表示不限
    ///
    /// 仅作为客户端契约下发，服务端不强制。
    #[serde(default)]
    pub attempts: u32,

    /// 是否清理过期的 NEW 挑战
    #[serde(default = "default_true")]
    pub prune: bool,

    /// 是否清理已关联账户的校验记录
    #[serde(default = "default_true")]
    pub prune_responses: bool,

    /// 定时清理间隔（秒）
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,

    /// 路由前缀
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// IP 级别限流
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// 存储后端
    #[serde(default)]
    pub storage: StorageBackend,
}

/// 存储后端类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite 持久化存储（默认）
    #[default]
    Sqlite,
    /// 进程内存储，重启即丢失
    Memory,
}

/// IP 级别限流配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// 补充一个请求配额的间隔（秒）
    #[serde(default = "default_per_second")]
    pub per_second: u64,

    /// 突发请求上限
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

impl Default for LnAuthConfig {
    fn default() -> Self {
        Self {
            expiration: default_expiration(),
            frequency: default_frequency(),
            attempts: 0,
            prune: true,
            prune_responses: true,
            prune_interval_secs: default_prune_interval_secs(),
            route_prefix: default_route_prefix(),
            rate_limit: RateLimitConfig::default(),
            storage: StorageBackend::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

impl LnAuthConfig {
    /// 校验数值范围，返回所有问题
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.expiration < MIN_EXPIRATION_SECS {
            errors.push(format!(
                "lnauth.expiration must be at least {MIN_EXPIRATION_SECS} seconds, got {}",
                self.expiration
            ));
        }

        if self.frequency < MIN_FREQUENCY_MS {
            errors.push(format!(
                "lnauth.frequency must be at least {MIN_FREQUENCY_MS} ms, got {}",
                self.frequency
            ));
        }

        if self.prune_interval_secs == 0 {
            errors.push("lnauth.prune_interval_secs must be greater than 0".to_string());
        }

        if !self.route_prefix.starts_with('/') {
            errors.push(format!(
                "lnauth.route_prefix must start with '/', got '{}'",
                self.route_prefix
            ));
        }

        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            errors.push("lnauth.rate_limit values must be greater than 0".to_string());
        }

        if !self.prune && !self.prune_responses {
            errors.push(
                "Warning: both lnauth.prune and lnauth.prune_responses are disabled, stale rows will accumulate"
                    .to_string(),
            );
        }

        errors
    }
}

/// 默认挑战有效期：1 小时
fn default_expiration() -> u64 {
    3600
}

/// 默认轮询间隔：5 秒
fn default_frequency() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_prune_interval_secs() -> u64 {
    300
}

fn default_route_prefix() -> String {
    "/lnauth".to_string()
}

fn default_per_second() -> u64 {
    2
}

fn default_burst_size() -> u32 {
    100
}
