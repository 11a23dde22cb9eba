//! 挑战存储后端抽象接口
//!
//! 定义了所有存储后端必须实现的统一异步接口

use crate::error::LnAuthResult;
use crate::types::{Challenge, ChallengeId, Response, ResponseStatus};
use async_trait::async_trait;

/// 挑战存储后端抽象接口
///
/// 持久化已签发的挑战和每次钱包回调的校验记录，是并发控制的单元。
/// 读接口返回快照，不会被进行中的写操作阻塞。
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// 初始化存储后端
    ///
    /// 执行必要的初始化操作，如创建表、索引等
    async fn init(&self) -> LnAuthResult<()>;

    /// 插入一条 NEW 状态的挑战
    ///
    /// # Arguments
    /// * `nonce` - hex 编码的 k1
    /// * `now` - 签发时间（秒）
    ///
    /// # Returns
    /// 新挑战的 ID
    async fn create(&self, nonce: &str, now: i64) -> LnAuthResult<ChallengeId>;

    /// 按 k1 精确匹配查找挑战
    ///
    /// 可能返回零条、一条或多条，调用方必须遍历全部结果
    async fn find_by_nonce(&self, nonce: &str) -> LnAuthResult<Vec<Challenge>>;

    /// 将挑战从 NEW 迁移到 USED
    ///
    /// 条件更新：只有当前状态仍为 NEW 的行会被修改。
    ///
    /// # Returns
    /// * `Ok(true)` - 本次调用完成了迁移
    /// * `Ok(false)` - 挑战已被使用或已被删除
    /// * `Err(...)` - 存储错误
    async fn mark_used(&self, id: ChallengeId, now: i64) -> LnAuthResult<bool>;

    /// 追加一条校验记录
    async fn record_response(
        &self,
        challenge_id: ChallengeId,
        signature: &str,
        key: &str,
        status: ResponseStatus,
        now: i64,
    ) -> LnAuthResult<i64>;

    /// 查询挑战的全部校验记录
    async fn responses_for(&self, challenge_id: ChallengeId) -> LnAuthResult<Vec<Response>>;

    /// 删除 `created <= cutoff` 的 NEW 挑战
    ///
    /// # Returns
    /// 被删除的挑战数量
    async fn delete_expired_new(&self, cutoff: i64) -> LnAuthResult<u64>;

    /// 删除 key 属于给定集合的校验记录
    ///
    /// # Returns
    /// 被删除的记录数量
    async fn delete_responses_for_keys(&self, keys: &[String]) -> LnAuthResult<u64>;

    /// 挑战总数
    async fn count(&self) -> LnAuthResult<u64>;
}
