//! 证书监控调度 Worker
//!
//! 按 cron 表达式周期性触发 `ExpirationMonitor::check`。

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use obf_shared::observability::metrics;
use tracing::{error, info, warn};

use super::expiration_monitor::ExpirationMonitor;
use crate::error::{IssuanceError, Result};

/// 证书监控调度 Worker
pub struct ExpirationScheduler {
    monitor: Arc<ExpirationMonitor>,
    expression: String,
    schedule: Schedule,
}

impl ExpirationScheduler {
    pub fn new(monitor: Arc<ExpirationMonitor>, cron_expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(cron_expression).map_err(|e| {
            IssuanceError::Validation(format!("无效的 cron 表达式 {cron_expression}: {e}"))
        })?;
        Ok(Self {
            monitor,
            expression: cron_expression.to_string(),
            schedule,
        })
    }

    /// after 之后的下一次执行时间
    pub fn next_run(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// 主循环：等待到下一个执行点后运行检查，直到进程退出
    pub async fn run(&self) {
        info!(schedule = %self.expression, "ExpirationScheduler 已启动");

        loop {
            let now = Utc::now();
            let Some(next) = self.next_run(now) else {
                warn!("cron 表达式没有后续执行时间，调度结束");
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            match self.monitor.check(Utc::now()).await {
                Ok(check) => info!(
                    days_remaining = check.days_remaining,
                    notified = check.notified,
                    "证书过期检查完成"
                ),
                Err(e) => error!(error = %e, code = e.error_code(), "证书过期检查失败"),
            }

            metrics::set_worker_last_run("expiration_monitor");
        }
    }
}
