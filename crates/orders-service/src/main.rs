//! 订单服务入口
//!
//! 装配数据库、AMQP 发布者/消费者、outbox 分发器、实时推送中心与
//! HTTP/WebSocket 服务，消费循环运行在主任务上，SIGINT/SIGTERM
//! 触发优雅关闭。

use std::sync::Arc;

use anyhow::Result;
use commerce_shared::amqp::{AmqpConsumer, AmqpPublisher};
use commerce_shared::config::ServiceConfig;
use commerce_shared::database::Database;
use commerce_shared::outbox::OutboxDispatcher;
use tokio::sync::watch;
use tracing::{error, info};

use orders_service::consumer::PaymentResultConsumer;
use orders_service::http::{self, AppState};
use orders_service::hub::Hub;
use orders_service::service::OrderService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load_orders()?;
    commerce_shared::telemetry::init(&config.observability)?;

    info!("Starting orders-service...");

    let db = Database::connect(&config.database, &sqlx::migrate!("./migrations")).await?;

    let publisher = Arc::new(
        AmqpPublisher::connect(&config.rabbit.url, &config.rabbit.exchange).await?,
    );
    let consumer = AmqpConsumer::connect(
        &config.rabbit.url,
        &config.rabbit.peer_exchange,
        &config.rabbit.queue,
        config.rabbit.prefetch,
    )
    .await?;

    let orders = OrderService::new(db.pool().clone());
    let (hub, hub_handle) = Hub::new();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let hub_task = tokio::spawn(hub.run(shutdown_rx.clone()));

    let dispatcher = OutboxDispatcher::new(
        db.pool().clone(),
        publisher.clone(),
        "order_outbox",
        config.outbox.interval(),
        config.outbox.batch_size,
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_rx.clone()));

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "orders http server listening");

    let app = http::router(AppState {
        orders: orders.clone(),
        hub: hub_handle.clone(),
    });
    let mut http_shutdown = shutdown_rx.clone();
    let http_handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = http_shutdown.wait_for(|stop| *stop).await;
        });
        if let Err(e) = server.await {
            error!(error = %e, "HTTP 服务异常退出");
        }
    });

    let shutdown_handle = tokio::spawn(async move {
        shutdown_signal().await;
        info!("收到关闭信号，开始优雅关闭...");
        let _ = shutdown_tx.send(true);
    });

    PaymentResultConsumer::new(consumer, orders, hub_handle)
        .run(shutdown_rx.clone())
        .await?;

    // 在优雅关闭窗口内等待后台任务收尾
    let grace = config.server.shutdown_timeout();
    let _ = tokio::time::timeout(grace, async {
        let _ = dispatcher_handle.await;
        let _ = hub_task.await;
        let _ = http_handle.await;
    })
    .await;
    shutdown_handle.abort();

    publisher.close().await;
    db.close().await;

    info!("orders-service 已关闭");
    Ok(())
}

/// 监听操作系统关闭信号
///
/// 同时监听 SIGINT（Ctrl+C）和 SIGTERM（容器编排发送），
/// 任一信号到达即触发优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 信号失败");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
