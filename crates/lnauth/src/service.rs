//! 挑战服务
//!
//! LNURL-auth 协议状态机：签发 k1、校验钱包签名、供浏览器轮询、定期清理。
//!
//! 状态迁移：
//!
//! ```text
//! issue() ──► NEW ──(签名有效, mark_used 成功)──► USED
//!              │
//!              └──(now - created > expiration)──► 过期（派生状态）──prune()──► 删除
//! ```
//!
//! 服务本身不持有跨请求的可变状态，所有并发控制都落在 [`ChallengeStore::mark_used`] 上。

use crate::clock::{Clock, SystemClock};
use crate::directory::AccountDirectory;
use crate::error::LnAuthResult;
use crate::metrics::{CHALLENGES_ISSUED, CHECKS, PRUNED_ROWS, VERIFY_ATTEMPTS};
use crate::random::{OsRandom, RandomSource, generate_nonce};
use crate::store::ChallengeStore;
use crate::types::{
    AccountData, AuthData, Challenge, ChallengeStatus, IssuedChallenge, PROVIDER, PruneReport,
    ResponseStatus,
};
use crate::verifier::{Secp256k1Verifier, SignatureVerifier};
use lnauth_common::config::LnAuthConfig;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 服务运行参数
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// 挑战有效期（秒）
    pub expiration: u64,
    /// 是否清理过期挑战
    pub prune: bool,
    /// 是否清理已关联账户的校验记录
    pub prune_responses: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&LnAuthConfig::default())
    }
}

impl From<&LnAuthConfig> for ServiceSettings {
    fn from(config: &LnAuthConfig) -> Self {
        Self {
            expiration: config.expiration,
            prune: config.prune,
            prune_responses: config.prune_responses,
        }
    }
}

/// 单条挑战的处理结果
enum Attempt {
    Skipped,
    Checked(bool),
    /// 签名有效但 USED 迁移未能持久化
    Failed,
}

/// LNURL-auth 挑战服务
///
/// 每个进程构建一次，以 `Arc` 在 HTTP 处理器和清理任务之间共享。
pub struct ChallengeService {
    store: Arc<dyn ChallengeStore>,
    directory: Arc<dyn AccountDirectory>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    settings: ServiceSettings,
}

impl std::fmt::Debug for ChallengeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeService")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChallengeService {
    /// 使用系统时钟、操作系统随机源和 secp256k1 校验器创建服务
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        directory: Arc<dyn AccountDirectory>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            directory,
            verifier: Arc::new(Secp256k1Verifier),
            clock: Arc::new(SystemClock),
            random: Arc::new(OsRandom),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ChallengeStore> {
        &self.store
    }

    /// 签发新挑战
    ///
    /// 随机源不可用时返回 `Randomness` 错误，不会写入任何挑战。
    pub async fn issue(&self) -> LnAuthResult<IssuedChallenge> {
        let nonce = generate_nonce(self.random.as_ref()).inspect_err(|e| {
            error!("Failed to generate challenge nonce: {}", e);
            CHALLENGES_ISSUED.with_label_values(&["error"]).inc();
        })?;

        let now = self.clock.now();
        let id = self.store.create(&nonce, now).await.inspect_err(|e| {
            error!("Failed to persist challenge: {}", e);
            CHALLENGES_ISSUED.with_label_values(&["error"]).inc();
        })?;

        CHALLENGES_ISSUED.with_label_values(&["ok"]).inc();
        debug!("Issued challenge {}", id);
        Ok(IssuedChallenge { id, nonce })
    }

    /// 校验钱包回调
    ///
    /// 遍历所有匹配 `nonce` 的挑战：已使用或已过期的跳过，其余逐条校验签名并写入
    /// 一条校验记录。只要有一条挑战在本次调用中完成 NEW → USED 迁移即返回 true。
    ///
    /// 任一参数为空时不做校验、不写记录，返回 false。挑战已被清理时同样返回 false。
    pub async fn verify(&self, nonce: &str, signature: &str, key: &str) -> LnAuthResult<bool> {
        // 记录、账户关联和身份派生统一使用小写 key
        let key = key.to_ascii_lowercase();
        let challenges = self.store.find_by_nonce(nonce).await?;
        let now = self.clock.now();

        let mut authenticated = false;
        for challenge in challenges {
            match self.attempt(&challenge, nonce, signature, &key, now).await {
                Attempt::Skipped => {
                    VERIFY_ATTEMPTS.with_label_values(&["skipped"]).inc();
                }
                Attempt::Checked(valid) => {
                    let outcome = if valid { "valid" } else { "invalid" };
                    VERIFY_ATTEMPTS.with_label_values(&[outcome]).inc();
                    authenticated |= valid;
                }
                Attempt::Failed => {
                    VERIFY_ATTEMPTS.with_label_values(&["error"]).inc();
                }
            }
        }

        Ok(authenticated)
    }

    async fn attempt(
        &self,
        challenge: &Challenge,
        nonce: &str,
        signature: &str,
        key: &str,
        now: i64,
    ) -> Attempt {
        if challenge.status != ChallengeStatus::New {
            debug!("Challenge {} already used, skipping", challenge.id);
            return Attempt::Skipped;
        }

        if challenge.is_expired(now, self.settings.expiration) {
            debug!("Challenge {} expired, skipping", challenge.id);
            return Attempt::Skipped;
        }

        if nonce.is_empty() || signature.is_empty() || key.is_empty() {
            return Attempt::Skipped;
        }

        // 钱包对 k1 解码后的 32 字节签名
        let valid = match hex::decode(nonce) {
            Ok(message) => self.verifier.verify(key, signature, &message),
            Err(e) => {
                debug!("Challenge {} has non-hex nonce: {}", challenge.id, e);
                false
            }
        };

        let mut transition_failed = false;
        if valid {
            match self.store.mark_used(challenge.id, now).await {
                Ok(true) => self.link_account(key).await,
                Ok(false) => {
                    // 并发回调中的落败方，或挑战已被清理
                    debug!("Challenge {} no longer NEW, skipping", challenge.id);
                    return Attempt::Skipped;
                }
                Err(e) => {
                    error!(
                        "Failed to mark challenge {} as used (key: {}, signature: {}): {}",
                        challenge.id, key, signature, e
                    );
                    transition_failed = true;
                }
            }
        }

        if let Err(e) = self
            .store
            .record_response(
                challenge.id,
                signature,
                key,
                ResponseStatus::from(valid && !transition_failed),
                now,
            )
            .await
        {
            error!(
                "Failed to record response for challenge {} (key: {}, signature: {}): {}",
                challenge.id, key, signature, e
            );
        }

        if transition_failed {
            Attempt::Failed
        } else {
            Attempt::Checked(valid)
        }
    }

    /// 签名有效后登录或注册账户，失败只记录日志
    async fn link_account(&self, key: &str) {
        let identity = Self::identity_for(key);
        let auth_data = AuthData {
            key: key.to_string(),
        };

        match self
            .directory
            .login_or_register(&identity, PROVIDER, &AccountData::default(), &auth_data)
            .await
        {
            Ok(account) => info!("Linking key authenticated as account {}", account.id),
            Err(e) => warn!("Failed to resolve account for key {}: {}", key, e),
        }
    }

    /// 由 linking key 派生的身份标识
    ///
    /// 对小写 hex 公钥做 SHA-256，同一把钥匙的大小写写法映射到同一身份。
    pub fn identity_for(public_key_hex: &str) -> String {
        let digest = Sha256::digest(public_key_hex.to_ascii_lowercase().as_bytes());
        hex::encode(digest)
    }

    /// 轮询登录状态
    ///
    /// 只读：查找已使用的挑战的有效校验记录，对应身份能在账户目录中登录即返回 true。
    pub async fn check_authenticated(&self, nonce: &str) -> LnAuthResult<bool> {
        let result = self.find_authenticated(nonce).await;
        let label = match &result {
            Ok(true) => "authenticated",
            Ok(false) => "pending",
            Err(_) => "error",
        };
        CHECKS.with_label_values(&[label]).inc();
        result
    }

    async fn find_authenticated(&self, nonce: &str) -> LnAuthResult<bool> {
        for challenge in self.store.find_by_nonce(nonce).await? {
            if challenge.status != ChallengeStatus::Used {
                continue;
            }

            for response in self.store.responses_for(challenge.id).await? {
                if !response.status.is_valid() {
                    continue;
                }

                let identity = Self::identity_for(&response.key);
                if self.directory.login(&identity, PROVIDER).await?.is_some() {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// 清理
    ///
    /// - 过期的 NEW 挑战（`created <= now - expiration - 1`），受 `prune` 控制
    /// - key 已关联账户的校验记录，受 `prune_responses` 控制
    pub async fn prune(&self) -> LnAuthResult<PruneReport> {
        let mut report = PruneReport::default();
        let now = self.clock.now();

        if self.settings.prune {
            let cutoff = now
                .saturating_sub(i64::try_from(self.settings.expiration).unwrap_or(i64::MAX))
                .saturating_sub(1);
            report.challenges = self.store.delete_expired_new(cutoff).await?;
            PRUNED_ROWS
                .with_label_values(&["challenges"])
                .inc_by(report.challenges);
        }

        if self.settings.prune_responses {
            let keys = self.directory.linked_keys(PROVIDER).await?;
            if !keys.is_empty() {
                report.responses = self.store.delete_responses_for_keys(&keys).await?;
                PRUNED_ROWS
                    .with_label_values(&["responses"])
                    .inc_by(report.responses);
            }
        }

        if report.challenges > 0 || report.responses > 0 {
            info!(
                "Pruned {} expired challenges and {} responses",
                report.challenges, report.responses
            );
        }

        Ok(report)
    }
}
