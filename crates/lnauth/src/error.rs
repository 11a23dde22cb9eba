//! LNURL-auth 服务错误定义

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// LNURL-auth 错误类型
#[derive(Error, Debug)]
pub enum LnAuthError {
    /// 安全随机源不可用，签发中止
    #[error("Secure randomness unavailable: {0}")]
    Randomness(String),

    /// 持久化失败
    #[error("Storage error: {0}")]
    Storage(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 连接池初始化失败
    #[error("Database setup error: {0}")]
    DatabaseSetup(#[from] lnauth_common::DatabaseError),

    /// 账户目录解析失败
    #[error("Account resolution failed: {0}")]
    AccountResolution(String),

    /// 公钥编码非法
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// 签名编码非法
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// 无效的请求参数
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LnAuthError {
    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            LnAuthError::Randomness(_) => "randomness",
            LnAuthError::Storage(_)
            | LnAuthError::Database(_)
            | LnAuthError::DatabaseSetup(_) => "storage",
            LnAuthError::AccountResolution(_) => "account_resolution",
            LnAuthError::MalformedKey(_) => "malformed_key",
            LnAuthError::MalformedSignature(_) => "malformed_signature",
            LnAuthError::InvalidRequest(_) => "invalid_request",
            LnAuthError::Config(_) => "config",
        }
    }
}

impl IntoResponse for LnAuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            LnAuthError::InvalidRequest(_)
            | LnAuthError::MalformedKey(_)
            | LnAuthError::MalformedSignature(_) => {
                tracing::debug!("Rejected request: {}", self);
                StatusCode::BAD_REQUEST
            }
            _ => {
                // 不向客户端暴露内部错误详情
                tracing::error!("Internal error: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "status": "ERROR",
            "reason": "An error has occurred.",
        }));

        (status, body).into_response()
    }
}

/// LNURL-auth 结果类型别名
pub type LnAuthResult<T> = Result<T, LnAuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_map_to_500() {
        let response = LnAuthError::Storage("disk full".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = LnAuthError::InvalidRequest("missing k1".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(LnAuthError::Randomness("x".into()).kind(), "randomness");
        assert_eq!(
            LnAuthError::Database(sqlx::Error::RowNotFound).kind(),
            "storage"
        );
    }
}
