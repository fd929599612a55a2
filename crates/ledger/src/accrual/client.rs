//! 积分计算系统 HTTP 客户端

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::{AccrualError, AccrualOracle, AccrualResponse};

/// 基于 reqwest 的积分计算系统客户端
///
/// 请求 `GET {base_url}/api/orders/{number}`
#[derive(Clone)]
pub struct AccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AccrualError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// 使用已构建的 reqwest 客户端
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn order_url(&self, order_number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_number)
    }
}

#[async_trait]
impl AccrualOracle for AccrualClient {
    #[instrument(skip(self))]
    async fn fetch_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError> {
        let url = self.order_url(order_number);
        debug!(url = %url, "请求积分计算系统");

        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NO_CONTENT => {
                return Err(AccrualError::NotRegistered(order_number.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                warn!(retry_after = ?retry_after, "积分计算系统限流");
                return Err(AccrualError::RateLimited);
            }
            status => return Err(AccrualError::UnexpectedStatus(status.as_u16())),
        }

        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(AccrualError::MalformedBody("响应体为空".to_string()));
        }

        let accrual: AccrualResponse = serde_json::from_slice(&body)
            .map_err(|e| AccrualError::MalformedBody(e.to_string()))?;

        if accrual.order != order_number {
            return Err(AccrualError::OrderMismatch {
                requested: order_number.to_string(),
                returned: accrual.order,
            });
        }

        debug!(status = accrual.status.as_str(), accrual = ?accrual.accrual, "积分计算系统响应");
        Ok(accrual)
    }
}
