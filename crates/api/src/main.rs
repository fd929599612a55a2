//! 积分账本服务入口
//!
//! 同时运行 HTTP API 与订单处理 Worker 池，共享同一个数据库连接池。

use std::sync::Arc;

use axum::middleware;
use clap::Parser;
use loyalty_api::{routes, state::AppState};
use loyalty_ledger::{
    accrual::AccrualClient,
    processor::{OrderProcessor, ProcessorPool},
    repository::{MIGRATOR, OrderRepository},
};
use loyalty_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{error, info};

/// 命令行参数，优先级高于配置文件与环境变量
#[derive(Parser, Debug)]
#[command(name = "loyalty-server")]
#[command(about = "积分账本服务", long_about = None)]
struct Cli {
    /// HTTP 监听地址（host:port）
    #[arg(short = 'a', long)]
    run_address: Option<String>,

    /// PostgreSQL 连接串
    #[arg(short = 'd', long)]
    database_uri: Option<String>,

    /// 积分计算系统地址
    #[arg(short = 'r', long)]
    accrual_address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("loyalty-api")?;
    if let Some(addr) = cli.run_address.as_deref() {
        config.set_run_address(addr)?;
    }
    if let Some(uri) = cli.database_uri {
        config.database.url = uri;
    }
    if let Some(addr) = cli.accrual_address.as_deref() {
        config.set_accrual_address(addr);
    }
    config.validate()?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting loyalty-api on {}", config.server_addr());

    let db = Database::connect(&config.database).await?;
    db.run_migrations(&MIGRATOR).await?;

    // 订单处理 Worker 池
    let oracle = AccrualClient::new(
        config.accrual.base_url.clone(),
        config.accrual.request_timeout(),
    )?;
    let processor = Arc::new(OrderProcessor::new(
        Arc::new(OrderRepository::new(db.pool().clone())),
        Arc::new(oracle),
        config.processor.staleness_timeout(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = ProcessorPool::new(processor, &config.processor);
    let pool_task = tokio::spawn(pool.run(shutdown_rx));
    info!(accrual = %config.accrual.base_url, "Order processor started");

    let state = AppState::new(db.clone(), &config.auth);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::app(state)
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(cors)
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到信号后先停止接收新请求，再通知 Worker 退出
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = pool_task.await {
        error!(error = %e, "Order processor task failed");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
