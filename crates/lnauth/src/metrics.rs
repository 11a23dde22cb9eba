//! LNURL-auth 服务指标

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts};

lazy_static! {
    /// 挑战签发次数
    pub static ref CHALLENGES_ISSUED: IntCounterVec = IntCounterVec::new(
        Opts::new("challenges_issued_total", "Total number of LNURL-auth challenges issued")
            .namespace("lnauthd"),
        &["status"]
    ).expect("challenges_issued_total metric definition is valid");

    /// 钱包回调校验结果（valid / invalid / skipped / error）
    pub static ref VERIFY_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("verify_attempts_total", "Total number of challenge verification attempts")
            .namespace("lnauthd"),
        &["outcome"]
    ).expect("verify_attempts_total metric definition is valid");

    /// 轮询结果（authenticated / pending / error）
    pub static ref CHECKS: IntCounterVec = IntCounterVec::new(
        Opts::new("checks_total", "Total number of authentication status polls")
            .namespace("lnauthd"),
        &["result"]
    ).expect("checks_total metric definition is valid");

    /// 清理删除的行数
    pub static ref PRUNED_ROWS: IntCounterVec = IntCounterVec::new(
        Opts::new("pruned_rows_total", "Total number of rows removed by pruning")
            .namespace("lnauthd"),
        &["kind"]
    ).expect("pruned_rows_total metric definition is valid");
}

/// 注册 LNURL-auth metrics 到全局 registry
pub fn register_lnauth_metrics(registry: &prometheus::Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(CHALLENGES_ISSUED.clone()))?;
    registry.register(Box::new(VERIFY_ATTEMPTS.clone()))?;
    registry.register(Box::new(CHECKS.clone()))?;
    registry.register(Box::new(PRUNED_ROWS.clone()))?;
    Ok(())
}
