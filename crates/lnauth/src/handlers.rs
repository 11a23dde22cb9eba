//! LNURL-auth HTTP 处理器
//!
//! 路由挂在 `route_prefix` 下：
//! - `GET /login` 签发挑战，返回 k1、回调地址、LNURL 和轮询契约
//! - `GET /callback` 钱包回调，校验签名
//! - `GET /check` 浏览器轮询登录状态
//! - `GET /health` 健康检查

use crate::{
    error::{LnAuthError, LnAuthResult},
    lnurl::{callback_url, check_url, encode_lnurl},
    ratelimit::ip_rate_limiter,
    service::ChallengeService,
};
use axum::{
    Router,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use lnauth_common::config::{LnAuthConfig, RateLimitConfig};
use lnauth_common::metrics::RequestTimer;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// LNURL-auth 服务状态
#[derive(Clone)]
pub struct LnAuthState {
    pub service: Arc<ChallengeService>,
    /// 对外基础 URL（不含路由前缀）
    pub base_url: String,
    pub route_prefix: String,
    /// 客户端轮询间隔（毫秒）
    pub frequency: u64,
    /// 客户端最多轮询次数，0 表示不限
    pub attempts: u32,
}

impl LnAuthState {
    pub fn new(service: Arc<ChallengeService>, base_url: &str, config: &LnAuthConfig) -> Self {
        Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            route_prefix: config.route_prefix.trim_end_matches('/').to_string(),
            frequency: config.frequency,
            attempts: config.attempts,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.route_prefix, path)
    }
}

/// 钱包回调参数
///
/// `action` 和 `tag` 是协议字段，不参与校验。
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub k1: Option<String>,
    #[serde(default)]
    pub sig: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// 轮询参数
#[derive(Debug, Default, Deserialize)]
pub struct CheckQuery {
    #[serde(default)]
    pub k1: Option<String>,
}

/// 签发结果
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub k1: String,
    pub callback: String,
    pub lnurl: String,
    pub check: String,
    pub frequency: u64,
    pub attempts: u32,
}

/// 轮询结果
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResponse {
    pub error: bool,
    pub authenticated: bool,
}

/// 创建 LNURL-auth 路由（不含限流）
pub fn create_router(state: LnAuthState) -> Router {
    Router::new()
        .route("/login", get(login_handler))
        .route("/callback", get(callback_handler))
        .route("/check", get(check_handler))
        .route("/health", get(health_check_handler))
        .with_state(state)
}

/// 创建带 IP 限流的路由
///
/// 限流器依赖连接对端地址，服务需以 `into_make_service_with_connect_info` 启动。
pub fn create_limited_router(
    state: LnAuthState,
    rate_limit: &RateLimitConfig,
) -> LnAuthResult<Router> {
    Ok(create_router(state).layer(ip_rate_limiter(rate_limit)?))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn login_handler(
    State(state): State<LnAuthState>,
) -> Result<Json<LoginResponse>, LnAuthError> {
    let timer = RequestTimer::new("lnauth", "GET", "/login");

    let result = async {
        let issued = state.service.issue().await?;
        let callback = callback_url(&state.endpoint("/callback"), &issued.nonce)?;
        let lnurl = encode_lnurl(&callback)?;
        let check = check_url(&state.endpoint("/check"), &issued.nonce)?;

        Ok::<_, LnAuthError>(LoginResponse {
            k1: issued.nonce,
            callback,
            lnurl,
            check,
            frequency: state.frequency,
            attempts: state.attempts,
        })
    }
    .await;

    match result {
        Ok(response) => {
            timer.observe(200);
            Ok(Json(response))
        }
        Err(e) => {
            timer.observe(500);
            Err(e)
        }
    }
}

async fn callback_handler(
    State(state): State<LnAuthState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let timer = RequestTimer::new("lnauth", "GET", "/callback");

    let (Some(k1), Some(sig), Some(key)) = (
        non_empty(query.k1),
        non_empty(query.sig),
        non_empty(query.key),
    ) else {
        timer.observe(400);
        return LnAuthError::InvalidRequest("k1, sig and key are required".into()).into_response();
    };

    debug!(
        "Wallet callback: action={:?}, tag={:?}",
        query.action, query.tag
    );

    match state.service.verify(&k1, &sig, &key).await {
        Ok(true) => {
            timer.observe(200);
            info!("Wallet login accepted");
            (StatusCode::OK, Json(json!({ "status": "OK" }))).into_response()
        }
        Ok(false) => {
            timer.observe(500);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "ERROR", "reason": "An error has occurred." })),
            )
                .into_response()
        }
        Err(e) => {
            timer.observe(500);
            e.into_response()
        }
    }
}

async fn check_handler(
    State(state): State<LnAuthState>,
    Query(query): Query<CheckQuery>,
) -> (StatusCode, Json<CheckResponse>) {
    let timer = RequestTimer::new("lnauth", "GET", "/check");

    let failed = || {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CheckResponse {
                error: true,
                authenticated: false,
            }),
        )
    };

    let Some(k1) = non_empty(query.k1) else {
        timer.observe(500);
        return failed();
    };

    match state.service.check_authenticated(&k1).await {
        Ok(authenticated) => {
            timer.observe(200);
            (
                StatusCode::OK,
                Json(CheckResponse {
                    error: false,
                    authenticated,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Status poll failed: {}", e);
            timer.observe(500);
            failed()
        }
    }
}

async fn health_check_handler(
    State(state): State<LnAuthState>,
) -> Result<Json<serde_json::Value>, LnAuthError> {
    debug!("Health check requested");

    let challenge_count = state.service.store().count().await?;

    Ok(Json(json!({
        "status": "healthy",
        "service": "lnauth",
        "challenge_count": challenge_count,
        "timestamp": chrono::Utc::now().timestamp(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryAccountDirectory;
    use crate::service::ServiceSettings;
    use crate::store::MemoryChallengeStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use k256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let service = Arc::new(ChallengeService::new(
            Arc::new(MemoryChallengeStore::new()),
            Arc::new(MemoryAccountDirectory::new()),
            ServiceSettings::default(),
        ));
        let state = LnAuthState::new(service, "https://auth.example.com/", &LnAuthConfig::default());
        create_router(state)
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_login_flow() {
        let router = test_router();

        let (status, body) = get_json(&router, "/login").await;
        assert_eq!(status, StatusCode::OK);
        let login: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(login.frequency, 5000);
        assert_eq!(login.attempts, 0);
        assert_eq!(
            login.callback,
            format!(
                "https://auth.example.com/lnauth/callback?action=login&k1={}&tag=login",
                login.k1
            )
        );
        assert!(login.lnurl.starts_with("LNURL1"));

        let check_uri = format!("/check?k1={}", login.k1);
        let (status, body) = get_json(&router, &check_uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "error": false, "authenticated": false }));

        let wallet = SigningKey::from_slice(&[0x11u8; 32]).unwrap();
        let signature: Signature = wallet
            .sign_prehash(&hex::decode(&login.k1).unwrap())
            .unwrap();
        let sig = hex::encode(signature.to_der().as_bytes());
        let key = hex::encode(wallet.verifying_key().to_encoded_point(true).as_bytes());

        let callback_uri = format!(
            "/callback?action=login&k1={}&sig={}&key={}&tag=login",
            login.k1, sig, key
        );
        let (status, body) = get_json(&router, &callback_uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "OK" }));

        let (_, body) = get_json(&router, &check_uri).await;
        assert_eq!(body, json!({ "error": false, "authenticated": true }));

        // 重复回调不会再次成功
        let (status, body) = get_json(&router, &callback_uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "ERROR");
    }

    #[tokio::test]
    async fn test_callback_missing_params() {
        let router = test_router();
        let (status, body) = get_json(&router, "/callback?k1=abcd").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "status": "ERROR", "reason": "An error has occurred." })
        );
    }

    #[tokio::test]
    async fn test_check_requires_k1() {
        let router = test_router();
        for uri in ["/check", "/check?k1="] {
            let (status, body) = get_json(&router, uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, json!({ "error": true, "authenticated": false }));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router();
        get_json(&router, "/login").await;
        let (status, body) = get_json(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["challenge_count"], 1);
    }
}
