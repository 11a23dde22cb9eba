//! LNURL-auth - 基于 secp256k1 签名的无密码登录服务
//!
//! 服务提供以下功能：
//! 1. 签发一次性挑战 k1，生成钱包回调地址和 LNURL
//! 2. 校验钱包对 k1 的 DER 签名，首次成功时将挑战标记为已使用并登录/注册账户
//! 3. 浏览器按 `frequency` 轮询登录状态
//! 4. 定期清理过期挑战和已关联账户的校验记录
//!
//! ```text
//! Browser            lnauthd                    Wallet
//!    │  GET /login      │                          │
//!    │─────────────────►│ issue() → k1 (NEW)       │
//!    │◄─────────────────│ {k1, lnurl, check}       │
//!    │        (扫码 LNURL)                         │
//!    │                  │ GET /callback?k1&sig&key │
//!    │                  │◄─────────────────────────│
//!    │                  │ verify() → USED          │
//!    │                  │─────────────────────────►│ {"status":"OK"}
//!    │  GET /check?k1   │                          │
//!    │─────────────────►│ check_authenticated()    │
//!    │◄─────────────────│ {authenticated: true}    │
//! ```

pub mod clock;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod lnurl;
pub mod metrics;
pub mod random;
pub mod ratelimit;
pub mod service;
pub mod store;
pub mod types;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{AccountDirectory, MemoryAccountDirectory, SqliteAccountDirectory};
pub use error::{LnAuthError, LnAuthResult};
pub use handlers::{LnAuthState, create_limited_router, create_router};
pub use metrics::register_lnauth_metrics;
pub use random::{OsRandom, RandomSource};
pub use service::{ChallengeService, ServiceSettings};
pub use store::{ChallengeStore, MemoryChallengeStore, SqliteChallengeStore};
pub use types::{Challenge, ChallengeStatus, IssuedChallenge, PROVIDER, PruneReport, Response};
pub use verifier::{Secp256k1Verifier, SignatureVerifier};

use lnauth_common::LnAuthdConfig;
use lnauth_common::config::StorageBackend;
use std::sync::Arc;
use tracing::info;

/// 按配置构建挑战服务
///
/// SQLite 后端下挑战表与账户表共用 `{sqlite_path}/lnauth.db` 的连接池。
pub async fn create_challenge_service(config: &LnAuthdConfig) -> LnAuthResult<ChallengeService> {
    let settings = ServiceSettings::from(&config.lnauth);

    let (store, directory): (Arc<dyn ChallengeStore>, Arc<dyn AccountDirectory>) =
        match config.lnauth.storage {
            StorageBackend::Sqlite => {
                info!(
                    "Opening LNURL-auth SQLite storage at {}",
                    config.sqlite_path.display()
                );
                let pool = lnauth_common::connect_sqlite(&config.sqlite_path).await?;
                (
                    Arc::new(SqliteChallengeStore::new(pool.clone()).await?),
                    Arc::new(SqliteAccountDirectory::new(pool).await?),
                )
            }
            StorageBackend::Memory => {
                info!("Using in-memory LNURL-auth storage, state is lost on restart");
                (
                    Arc::new(MemoryChallengeStore::new()),
                    Arc::new(MemoryAccountDirectory::new()),
                )
            }
        };

    Ok(ChallengeService::new(store, directory, settings))
}

/// 从主配置创建 LnAuthState
pub async fn create_lnauth_state(config: &LnAuthdConfig) -> LnAuthResult<LnAuthState> {
    let service = Arc::new(create_challenge_service(config).await?);
    Ok(LnAuthState::new(
        service,
        &config.public_base_url(),
        &config.lnauth,
    ))
}
