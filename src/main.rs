use std::sync::Arc;

use lottery_dayclose::backend::HttpCloseDayApi;
use lottery_dayclose::models::Bin;
use lottery_dayclose::service::{report, SessionEvent, TracingNotifier};
use lottery_dayclose::{api, AppConfig, ReconciliationCommitter, ScanStation};
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting scan station with config: {:?}", config);

    // 票箱快照 (由宿主页面提供)
    let raw = std::fs::read_to_string(&config.scan.bins_file)?;
    let bins: Vec<Bin> = serde_json::from_str(&raw)?;
    info!("Loaded {} bins from {}", bins.len(), config.scan.bins_file.display());

    // 日结客户端 + 提交服务
    let api = Arc::new(HttpCloseDayApi::new(&config.backend.base_url, config.backend.timeout())?);
    let committer = Arc::new(ReconciliationCommitter::new(
        api,
        config.backend.store_id.clone(),
        config.backend.current_shift_id.clone(),
    ));

    let station = ScanStation::new(
        &bins,
        committer,
        Arc::new(TracingNotifier),
        config.scan.debounce(),
    )
    .spawn();

    // 日结成功后导出报表
    if let Some(dir) = config.scan.report_dir.clone() {
        let mut events = station.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Committed { summary }) => {
                        if let Err(e) = report::export_summary(&summary, &dir) {
                            warn!("Failed to write day-close report: {}", e);
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    // 构建路由
    let app = api::router(station.clone()).layer(ServiceBuilder::new());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET    /api/scan/session       - session snapshot");
    info!("  POST   /api/scan/input         - scanner keystrokes");
    info!("  POST   /api/scan/code          - submit one code");
    info!("  DELETE /api/scan/bins/:bin_id  - undo bin scan");
    info!("  POST   /api/scan/commit        - close business day");
    info!("  POST   /api/scan/cancel        - discard session");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    station.shutdown().await;
    Ok(())
}
