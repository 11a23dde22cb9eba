//! Prometheus 监控指标模块
//!
//! 提供全局 Registry、HTTP 请求指标和文本格式导出。
//! 业务指标由各服务 crate 自行定义并注册到这里的 [`REGISTRY`]。

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::Once;
use std::time::Instant;

static METRICS_INIT: Once = Once::new();

lazy_static! {
    /// 全局 Prometheus Registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// HTTP 请求延迟（秒）
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_seconds", "HTTP request duration in seconds")
            .namespace("lnauthd")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["service", "method", "path", "status"]
    ).expect("request_duration_seconds metric definition is valid");

    /// HTTP 请求总数
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Total number of HTTP requests")
            .namespace("lnauthd"),
        &["service", "method", "path", "status"]
    ).expect("requests_total metric definition is valid");
}

/// 注册通用指标到全局 Registry
///
/// 幂等：只有第一次调用会真正注册。
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());

    METRICS_INIT.call_once(|| {
        let register_result = (|| {
            REGISTRY.register(Box::new(REQUEST_DURATION.clone()))?;
            REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
            Ok::<(), prometheus::Error>(())
        })();

        if let Err(e) = register_result {
            result = Err(e);
        }
    });

    result
}

/// HTTP 请求计时器
pub struct RequestTimer {
    start: Instant,
    service: &'static str,
    method: &'static str,
    path: &'static str,
}

impl RequestTimer {
    /// 创建计时器
    pub fn new(service: &'static str, method: &'static str, path: &'static str) -> Self {
        Self {
            start: Instant::now(),
            service,
            method,
            path,
        }
    }

    /// 完成计时并记录指标
    pub fn observe(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();
        let status_str = status.to_string();
        let labels = [self.service, self.method, self.path, status_str.as_str()];

        REQUEST_DURATION.with_label_values(&labels).observe(duration);
        REQUESTS_TOTAL.with_label_values(&labels).inc();
    }
}

/// 导出 Prometheus 文本格式的指标
pub fn export_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_request_timer() {
        let _ = register_metrics();

        let before = REQUESTS_TOTAL
            .with_label_values(&["test-service", "GET", "/test", "200"])
            .get();

        let timer = RequestTimer::new("test-service", "GET", "/test");
        timer.observe(200);

        let after = REQUESTS_TOTAL
            .with_label_values(&["test-service", "GET", "/test", "200"])
            .get();

        assert_eq!(after, before + 1);
    }

    #[test]
    #[serial]
    fn test_export_metrics() {
        let _ = register_metrics();
        RequestTimer::new("export-test", "GET", "/metrics").observe(200);

        let output = export_metrics().unwrap();
        assert!(
            output.contains("lnauthd_requests_total"),
            "Output should contain requests_total metric. Output: {output}"
        );
        assert!(output.contains("export-test"));
    }
}
