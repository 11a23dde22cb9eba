//! 定时清理任务

use lnauth::ChallengeService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// 启动定时清理任务
///
/// 每 `period` 调用一次 [`ChallengeService::prune`]，收到关闭广播后退出。
/// 单次清理失败只记录日志，下一周期重试。
pub fn spawn_prune_task(
    service: Arc<ChallengeService>,
    period: Duration,
    shutdown_tx: &broadcast::Sender<()>,
) -> JoinHandle<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Prune task started, interval: {:?}", period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match service.prune().await {
                        Ok(report) => debug!(
                            "Prune finished: {} challenges, {} responses",
                            report.challenges, report.responses
                        ),
                        Err(e) => error!("Failed to prune LNURL-auth tables: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Prune task received shutdown signal");
                    break;
                }
            }
        }
    })
}
