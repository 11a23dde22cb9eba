//! LNURL-auth 集成测试
//!
//! 基于 SQLite 后端走完整的登录链路：签发、钱包回调、轮询、过期、清理和限流。

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use k256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use lnauth::handlers::LoginResponse;
use lnauth::{
    ChallengeService, ChallengeStore, LnAuthState, ManualClock, ServiceSettings,
    SqliteAccountDirectory, SqliteChallengeStore, create_limited_router, create_router,
};
use lnauth_common::config::{LnAuthConfig, RateLimitConfig};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const T0: i64 = 1_700_000_000;

struct TestEnv {
    _temp_dir: TempDir,
    service: Arc<ChallengeService>,
    store: Arc<SqliteChallengeStore>,
    clock: Arc<ManualClock>,
}

impl TestEnv {
    async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = lnauth_common::connect_sqlite(temp_dir.path())
            .await
            .expect("Failed to open database");

        let store = Arc::new(SqliteChallengeStore::new(pool.clone()).await.unwrap());
        let directory = Arc::new(SqliteAccountDirectory::new(pool).await.unwrap());
        let clock = Arc::new(ManualClock::new(T0));

        let service = Arc::new(
            ChallengeService::new(store.clone(), directory, ServiceSettings::default())
                .with_clock(clock.clone()),
        );

        Self {
            _temp_dir: temp_dir,
            service,
            store,
            clock,
        }
    }

    fn state(&self) -> LnAuthState {
        LnAuthState::new(
            self.service.clone(),
            "https://auth.example.com",
            &LnAuthConfig::default(),
        )
    }

    fn router(&self) -> Router {
        Router::new().nest("/lnauth", create_router(self.state()))
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn wallet_response(wallet: &SigningKey, k1: &str) -> (String, String) {
    let signature: Signature = wallet.sign_prehash(&hex::decode(k1).unwrap()).unwrap();
    (
        hex::encode(signature.to_der().as_bytes()),
        hex::encode(wallet.verifying_key().to_encoded_point(true).as_bytes()),
    )
}

#[tokio::test]
async fn test_full_login_flow() {
    let env = TestEnv::new().await;
    let router = env.router();

    let (status, body) = get(&router, "/lnauth/login").await;
    assert_eq!(status, StatusCode::OK);
    let login: LoginResponse = serde_json::from_value(body).unwrap();
    assert_eq!(
        login.check,
        format!("https://auth.example.com/lnauth/check?k1={}", login.k1)
    );

    let check_uri = format!("/lnauth/check?k1={}", login.k1);
    assert_eq!(
        get(&router, &check_uri).await.1,
        json!({ "error": false, "authenticated": false })
    );

    let wallet = SigningKey::from_slice(&[0x5au8; 32]).unwrap();
    let (sig, key) = wallet_response(&wallet, &login.k1);
    let (status, body) = get(
        &router,
        &format!("/lnauth/callback?action=login&k1={}&sig={sig}&key={key}&tag=login", login.k1),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "OK" }));

    assert_eq!(
        get(&router, &check_uri).await.1,
        json!({ "error": false, "authenticated": true })
    );
}

#[tokio::test]
async fn test_expired_challenge_is_rejected_and_pruned() {
    let env = TestEnv::new().await;
    let router = env.router();

    let (_, body) = get(&router, "/lnauth/login").await;
    let login: LoginResponse = serde_json::from_value(body).unwrap();

    env.clock.advance(3601);

    let wallet = SigningKey::from_slice(&[0x5au8; 32]).unwrap();
    let (sig, key) = wallet_response(&wallet, &login.k1);
    let (status, body) = get(
        &router,
        &format!("/lnauth/callback?k1={}&sig={sig}&key={key}", login.k1),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "ERROR");

    let report = env.service.prune().await.unwrap();
    assert_eq!(report.challenges, 1);
    assert_eq!(env.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_same_wallet_keeps_account_across_logins() {
    let env = TestEnv::new().await;
    let router = env.router();
    let wallet = SigningKey::from_slice(&[0x5au8; 32]).unwrap();

    for _ in 0..2 {
        let (_, body) = get(&router, "/lnauth/login").await;
        let login: LoginResponse = serde_json::from_value(body).unwrap();
        let (sig, key) = wallet_response(&wallet, &login.k1);
        let (status, _) = get(
            &router,
            &format!("/lnauth/callback?k1={}&sig={sig}&key={key}", login.k1),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 两次登录的校验记录都挂在同一个已关联的 key 上
    let report = env.service.prune().await.unwrap();
    assert_eq!(report.responses, 2);
}

#[tokio::test]
async fn test_rate_limit() {
    let env = TestEnv::new().await;
    let limiter = RateLimitConfig {
        per_second: 60,
        burst_size: 2,
    };
    let router = Router::new().nest(
        "/lnauth",
        create_limited_router(env.state(), &limiter).unwrap(),
    );

    assert_eq!(get(&router, "/lnauth/health").await.0, StatusCode::OK);
    assert_eq!(get(&router, "/lnauth/health").await.0, StatusCode::OK);
    assert_eq!(
        get(&router, "/lnauth/health").await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
}
