//! HTTP 服务器
//!
//! 把 LNURL-auth 路由挂到 `route_prefix` 下，加上 `/metrics`、请求追踪和 CORS，
//! 并在收到关闭广播后优雅退出。

use crate::trace::http_trace_layer;
use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, routing::get};
use lnauth::{LnAuthState, create_limited_router};
use lnauth_common::LnAuthdConfig;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// 组装完整的应用路由
pub fn build_app(config: &LnAuthdConfig, state: LnAuthState) -> Result<Router> {
    let router = create_limited_router(state, &config.lnauth.rate_limit)
        .context("Failed to build rate limiter")?;

    let route_prefix = config.lnauth.route_prefix.trim_end_matches('/');
    let app = if route_prefix.is_empty() {
        Router::new().merge(router)
    } else {
        info!("Mounting LNURL-auth routes at {}", route_prefix);
        Router::new().nest(route_prefix, router)
    };

    Ok(app
        .route("/metrics", get(metrics_handler))
        .layer(http_trace_layer())
        .layer(CorsLayer::permissive()))
}

/// 绑定端口并在后台运行 HTTP 服务器
pub async fn start_http_server(
    config: &LnAuthdConfig,
    app: Router,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let bind_addr = config.bind.http.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to address '{bind_addr}'"))?;
    let local_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", local_addr);

    let handle = tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP server received shutdown signal");
        });
        if let Err(e) = server.await {
            error!("HTTP server error: {}", e);
            let _ = shutdown_tx.send(());
        }
        info!("HTTP server stopped");
    });

    Ok((local_addr, handle))
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> (StatusCode, String) {
    match lnauth_common::metrics::export_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to export metrics".to_string(),
            )
        }
    }
}
