//! 徽章发放服务
//!
//! 从标准输入逐行读取宿主事件（JSON），处理后向标准输出写出一行 JSON 结果。
//! 同时按计划检查 OBF 客户端证书的过期时间。

use std::sync::Arc;

use badge_issuance::notification::TracingAdminNotifier;
use badge_issuance::{
    BadgeCatalog, BadgeIssuingService, CriterionStore, EngineParts, ExpirationMonitor,
    ExpirationScheduler, HostEvent, HostSnapshot, InMemoryCriterionStore, IssuanceEngine,
    ObfClient, PgCriterionStore,
};
use obf_shared::config::{AppConfig, StorageBackend};
use obf_shared::database::Database;
use obf_shared::observability;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

const SERVICE_NAME: &str = "badge-issuance-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        storage = ?config.storage.backend,
        "Starting {}",
        SERVICE_NAME
    );

    let mut database = None;
    let (store, badges): (Arc<dyn CriterionStore>, Arc<dyn BadgeCatalog>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                warn!("使用进程内存储，重启后满足记录会丢失");
                let store = Arc::new(InMemoryCriterionStore::new());
                (store.clone(), store)
            }
            StorageBackend::Postgres => {
                let db = Database::connect(&config.database).await?;
                let store = Arc::new(PgCriterionStore::new(db.pool().clone()));
                store.run_migrations().await?;
                database = Some(db);
                (store.clone(), store)
            }
        };

    let host = Arc::new(match &config.host.snapshot_path {
        Some(path) => {
            let snapshot = HostSnapshot::from_json_file(path)?;
            info!(path = %path, users = snapshot.users.len(), "宿主快照已加载");
            snapshot
        }
        None => {
            warn!("未配置宿主快照，所有用户都将被视为不存在");
            HostSnapshot::new()
        }
    });

    let issuer: Arc<dyn BadgeIssuingService> = Arc::new(ObfClient::new(&config.obf)?);

    let engine = IssuanceEngine::new(
        EngineParts {
            store,
            badges,
            users: host.clone(),
            completions: host.clone(),
            capabilities: host.clone(),
            issuer: issuer.clone(),
        },
        &config.issuance,
    );

    if config.expiration_monitor.enabled {
        let monitor = Arc::new(ExpirationMonitor::new(
            issuer,
            host,
            Arc::new(TracingAdminNotifier),
            config.obf.base_url.clone(),
        ));
        let scheduler = ExpirationScheduler::new(monitor, &config.expiration_monitor.schedule)?;
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号");
                break;
            }
        };
        let Some(line) = line else {
            info!("标准输入已关闭");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match HostEvent::from_json(&line) {
            Ok(event) => engine.handle(event).await,
            Err(e) => Err(e),
        };
        let output = match result {
            Ok(outcome) => serde_json::to_value(&outcome)?,
            Err(e) => {
                warn!(error = %e, "事件处理失败");
                json!({
                    "success": false,
                    "errorCode": e.error_code(),
                    "error": e.to_string(),
                })
            }
        };

        stdout.write_all(output.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    if let Some(db) = database {
        db.close().await;
    }
    info!("Shutting down {}", SERVICE_NAME);
    Ok(())
}
