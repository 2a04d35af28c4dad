//! PostgreSQL 连接池
//!
//! 仅在存储后端为 postgres 时使用。

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 校验配置并建立连接池，建立后立即做一次探活
    #[instrument(skip_all, fields(target = %redact_url(&config.url)))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        validate(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        let db = Self { pool };
        db.health_check().await?;
        info!(
            max_connections = config.max_connections,
            "数据库连接池已就绪"
        );
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        if self.pool.is_closed() {
            warn!("数据库连接池已关闭");
            return;
        }
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}

fn validate(config: &DatabaseConfig) -> Result<()> {
    if config.url.trim().is_empty() {
        return Err(SharedError::InvalidConfig {
            field: "database.url".to_string(),
            message: "不能为空".to_string(),
        });
    }
    if config.min_connections > config.max_connections {
        return Err(SharedError::InvalidConfig {
            field: "database.min_connections".to_string(),
            message: format!(
                "{} 大于 max_connections {}",
                config.min_connections, config.max_connections
            ),
        });
    }
    Ok(())
}

/// 日志中隐藏连接串里的密码
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
