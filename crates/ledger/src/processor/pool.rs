//! 订单处理 Worker 池
//!
//! N 个独立的 tokio 任务，各自按固定间隔执行一次订单处理迭代。
//! 每次迭代有超时上限：超时会丢弃迭代 future，进行中的 HTTP 请求被中断，
//! 未提交的数据库事务随连接归还而回滚。
//! 收到关闭信号后，每个 Worker 完成（或超时）当前迭代再退出。

use std::sync::Arc;
use std::time::Duration;

use loyalty_shared::config::ProcessorConfig;
use loyalty_shared::observability::metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::OrderProcessor;

/// Worker 池
pub struct ProcessorPool {
    processor: Arc<OrderProcessor>,
    workers: usize,
    tick_interval: Duration,
    iteration_timeout: Duration,
}

impl ProcessorPool {
    pub fn new(processor: Arc<OrderProcessor>, config: &ProcessorConfig) -> Self {
        Self {
            processor,
            workers: config.workers,
            tick_interval: config.tick_interval(),
            iteration_timeout: config.iteration_timeout(),
        }
    }

    /// 启动所有 Worker，返回各自的 JoinHandle
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            workers = self.workers,
            tick_interval = ?self.tick_interval,
            iteration_timeout = ?self.iteration_timeout,
            "订单处理 Worker 池已启动"
        );

        (0..self.workers)
            .map(|id| {
                let worker = Worker {
                    name: format!("order_processor_{id}"),
                    processor: Arc::clone(&self.processor),
                    tick_interval: self.tick_interval,
                    iteration_timeout: self.iteration_timeout,
                };
                tokio::spawn(worker.run(shutdown.clone()))
            })
            .collect()
    }

    /// 启动所有 Worker 并等待它们在关闭信号后退出
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let handles = self.spawn(shutdown);
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "订单处理 Worker 异常退出");
            }
        }
        info!("订单处理 Worker 池已停止");
    }
}

struct Worker {
    name: String,
    processor: Arc<OrderProcessor>,
    tick_interval: Duration,
    iteration_timeout: Duration,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(worker = %self.name, "Worker 已启动");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // 发送端被丢弃同样视为关闭
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.iterate().await;
                }
            }
        }

        info!(worker = %self.name, "收到关闭信号，Worker 退出");
    }

    async fn iterate(&self) {
        match tokio::time::timeout(self.iteration_timeout, self.processor.process_one_order())
            .await
        {
            Ok(outcome) => debug!(worker = %self.name, outcome = outcome.as_str(), "迭代完成"),
            Err(_) => warn!(
                worker = %self.name,
                timeout = ?self.iteration_timeout,
                "订单处理迭代超时"
            ),
        }
        metrics::set_worker_last_run(&self.name);
    }
}
