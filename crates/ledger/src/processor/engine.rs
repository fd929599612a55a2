//! 订单领取与结算引擎
//!
//! 单次迭代：领取一个订单 → 查询积分计算系统 → 按返回状态结算或标记无效。
//! 任何一步失败都只记录日志，订单保持 PROCESSING，超时后被重新领取。

use std::sync::Arc;
use std::time::{Duration, Instant};

use loyalty_shared::observability::metrics;
use tracing::{debug, error, info, warn};

use crate::accrual::AccrualOracle;
use crate::models::{AccrualStatus, Money};
use crate::repository::OrderRepositoryTrait;

/// 单次迭代的结果
///
/// Worker 循环本身不关心结果，只用于日志、指标和测试断言
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 没有可领取的订单
    Idle,
    /// 订单已入账
    Settled { number: String, accrual: Money },
    /// 订单被判定为无效
    Invalidated { number: String },
    /// 积分计算尚未完成，等待下次重新领取
    Pending { number: String },
    /// 处理失败，订单保持 PROCESSING
    Failed { number: Option<String> },
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Settled { .. } => "settled",
            Self::Invalidated { .. } => "invalidated",
            Self::Pending { .. } => "pending",
            Self::Failed { .. } => "failed",
        }
    }
}

/// 订单处理引擎
pub struct OrderProcessor {
    orders: Arc<dyn OrderRepositoryTrait>,
    oracle: Arc<dyn AccrualOracle>,
    staleness_timeout: Duration,
}

impl OrderProcessor {
    pub fn new(
        orders: Arc<dyn OrderRepositoryTrait>,
        oracle: Arc<dyn AccrualOracle>,
        staleness_timeout: Duration,
    ) -> Self {
        Self {
            orders,
            oracle,
            staleness_timeout,
        }
    }

    /// 处理一个订单
    ///
    /// 不返回错误：所有失败都在此吸收，不会影响其他 Worker
    pub async fn process_one_order(&self) -> ProcessOutcome {
        let start = Instant::now();
        let outcome = self.run_once().await;
        metrics::record_order_processed(outcome.as_str(), start.elapsed().as_secs_f64());
        outcome
    }

    async fn run_once(&self) -> ProcessOutcome {
        let number = match self.orders.claim_next_order(self.staleness_timeout).await {
            Ok(Some(number)) => number,
            Ok(None) => {
                debug!("没有待处理订单");
                return ProcessOutcome::Idle;
            }
            Err(e) => {
                error!(
                    error = %e,
                    code = e.error_code(),
                    retryable = e.is_retryable(),
                    "领取订单失败"
                );
                return ProcessOutcome::Failed { number: None };
            }
        };

        let resp = match self.oracle.fetch_accrual(&number).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    order_number = %number,
                    error = %e,
                    retryable = e.is_retryable(),
                    "查询积分计算结果失败"
                );
                return ProcessOutcome::Failed {
                    number: Some(number),
                };
            }
        };

        match resp.status {
            AccrualStatus::Processed => {
                let raw = resp.accrual.unwrap_or_default();
                let Some(accrual) = Money::try_from_major(raw).filter(|m| !m.is_negative())
                else {
                    warn!(order_number = %number, accrual = raw, "积分金额非法");
                    return ProcessOutcome::Failed {
                        number: Some(number),
                    };
                };

                match self.orders.apply_settled_accrual(&number, accrual).await {
                    Ok(()) => {
                        info!(order_number = %number, accrual = %accrual, "订单积分已入账");
                        ProcessOutcome::Settled { number, accrual }
                    }
                    Err(e) => {
                        error!(
                            order_number = %number,
                            error = %e,
                            code = e.error_code(),
                            retryable = e.is_retryable(),
                            "订单结算失败"
                        );
                        ProcessOutcome::Failed {
                            number: Some(number),
                        }
                    }
                }
            }
            AccrualStatus::Invalid => match self.orders.mark_order_invalid(&number).await {
                Ok(()) => {
                    info!(order_number = %number, "订单已标记为无效");
                    ProcessOutcome::Invalidated { number }
                }
                Err(e) => {
                    error!(
                        order_number = %number,
                        error = %e,
                        code = e.error_code(),
                        retryable = e.is_retryable(),
                        "标记订单无效失败"
                    );
                    ProcessOutcome::Failed {
                        number: Some(number),
                    }
                }
            },
            AccrualStatus::Registered | AccrualStatus::Processing => {
                debug!(
                    order_number = %number,
                    status = resp.status.as_str(),
                    "积分计算尚未完成"
                );
                ProcessOutcome::Pending { number }
            }
        }
    }
}
