//! LNURL-auth 核心数据类型

use serde::{Deserialize, Serialize};

/// 账户目录中的 provider 标识
pub const PROVIDER: &str = "lnauth";

/// 挑战主键
pub type ChallengeId = i64;

/// 挑战状态
///
/// 只允许 NEW → USED 单向迁移。过期是派生状态，不落库。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    New,
    Used,
}

impl ChallengeStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            ChallengeStatus::New => 0,
            ChallengeStatus::Used => 1,
        }
    }

    /// 未知取值按 USED 处理，不会再被校验
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            ChallengeStatus::New
        } else {
            ChallengeStatus::Used
        }
    }
}

/// 单次校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Invalid,
    Valid,
}

impl ResponseStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            ResponseStatus::Invalid => 0,
            ResponseStatus::Valid => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            ResponseStatus::Valid
        } else {
            ResponseStatus::Invalid
        }
    }

    pub fn is_valid(self) -> bool {
        self == ResponseStatus::Valid
    }
}

impl From<bool> for ResponseStatus {
    fn from(valid: bool) -> Self {
        if valid {
            ResponseStatus::Valid
        } else {
            ResponseStatus::Invalid
        }
    }
}

/// 已签发的挑战
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    /// k1，hex 编码的随机数
    pub nonce: String,
    /// 签发时间（秒）
    pub created: i64,
    /// 迁移到 USED 的时间，NEW 状态下为 None
    pub updated: Option<i64>,
    pub status: ChallengeStatus,
}

impl Challenge {
    /// 严格大于：恰好处于边界时仍然有效
    pub fn is_expired(&self, now: i64, expiration: u64) -> bool {
        now.saturating_sub(self.created) > i64::try_from(expiration).unwrap_or(i64::MAX)
    }
}

/// 一次钱包回调的校验记录，写入后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: i64,
    pub challenge_id: ChallengeId,
    pub created: i64,
    /// 钱包提交的 DER 签名（hex）
    pub signature: String,
    /// 钱包提交的 linking key（hex）
    pub key: String,
    pub status: ResponseStatus,
}

/// 本地账户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created: i64,
}

/// 账户映射附加数据
///
/// 记录 linking key 原文，供校验记录清理时反查。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub key: String,
}

/// 新建账户时的附加字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 签发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub id: ChallengeId,
    pub nonce: String,
}

/// 一次清理的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub challenges: u64,
    pub responses: u64,
}
