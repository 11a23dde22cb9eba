//! IP 级别限流
//!
//! 协议本身不限制回调和轮询次数（`attempts` 只是客户端契约），
//! 服务端的防护以中间件形式包在路由外层。

use crate::error::{LnAuthError, LnAuthResult};
use axum::body::Body;
use governor::middleware::NoOpMiddleware;
use lnauth_common::config::RateLimitConfig;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

/// 按配置构建 IP 限流层
///
/// 客户端 IP 优先取 `X-Forwarded-For` / `X-Real-IP`，否则取连接对端地址，
/// 因此服务必须以 `into_make_service_with_connect_info::<SocketAddr>` 启动。
pub fn ip_rate_limiter(
    config: &RateLimitConfig,
) -> LnAuthResult<GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware, Body>> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| {
            LnAuthError::Config(format!(
                "invalid rate limit: per_second={}, burst_size={}",
                config.per_second, config.burst_size
            ))
        })?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
