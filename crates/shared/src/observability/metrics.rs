//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册业务指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "completion_events_total",
        "Total number of course completion events handled"
    );
    metrics::describe_counter!(
        "badge_issuance_total",
        "Total number of badge issuance attempts by outcome"
    );
    metrics::describe_histogram!(
        "badge_issuance_duration_seconds",
        "External badge issuance call duration in seconds"
    );
    metrics::describe_counter!(
        "issuance_reconciliation_hazards_total",
        "Badges issued externally but not recorded locally"
    );
    metrics::describe_counter!(
        "certificate_expiry_alerts_total",
        "Certificate expiration alerts sent to administrators"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录完成事件处理结果
#[inline]
pub fn record_completion_event(outcome: &str) {
    metrics::counter!("completion_events_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录一次徽章发放尝试
#[inline]
pub fn record_badge_issuance(outcome: &str, duration_secs: f64) {
    metrics::counter!("badge_issuance_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("badge_issuance_duration_seconds").record(duration_secs);
}

/// 记录对账风险：外部已发放但本地未记录
#[inline]
pub fn record_reconciliation_hazard() {
    metrics::counter!("issuance_reconciliation_hazards_total").increment(1);
}

/// 记录证书过期告警
#[inline]
pub fn record_certificate_alert(severity: &str, recipients: u64) {
    metrics::counter!(
        "certificate_expiry_alerts_total",
        "severity" => severity.to_string()
    )
    .increment(recipients);
}

/// 记录 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}
