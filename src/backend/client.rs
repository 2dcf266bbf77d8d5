use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::CommitError;
use crate::models::{CloseDayRequest, ReconciliationSummary};

/// 日结接口 (后端服务)
#[async_trait]
pub trait CloseDayApi: Send + Sync {
    async fn close_day(
        &self,
        store_id: &str,
        request: &CloseDayRequest,
    ) -> Result<ReconciliationSummary, CommitError>;
}

/// 基于 reqwest 的日结客户端
#[derive(Debug, Clone)]
pub struct HttpCloseDayApi {
    client: Client,
    base_url: String,
}

impl HttpCloseDayApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/stores/{store_id}/lottery/day-close`, store_id 作为单个路径段编码
    pub fn day_close_url(&self, store_id: &str) -> Result<Url, CommitError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            CommitError::failed(format!("Invalid backend URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| CommitError::failed(format!("Invalid backend URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["stores", store_id, "lottery", "day-close"]);
        Ok(url)
    }
}

#[async_trait]
impl CloseDayApi for HttpCloseDayApi {
    async fn close_day(
        &self,
        store_id: &str,
        request: &CloseDayRequest,
    ) -> Result<ReconciliationSummary, CommitError> {
        let url = self.day_close_url(store_id)?;
        tracing::info!("POST {} ({} closings)", url, request.closings.len());

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    CommitError::failed(format!("Cannot connect to {}", self.base_url))
                } else if e.is_timeout() {
                    CommitError::failed("Day-close request timed out")
                } else {
                    CommitError::failed(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CommitError::failed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                )
            });
            return Err(CommitError::Failed {
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_slice::<ReconciliationSummary>(&body).map_err(|e| CommitError::Failed {
            status: Some(status.as_u16()),
            message: format!("Unexpected day-close response: {}", e),
        })
    }
}

/// 从错误响应体中提取后端消息: error.message > message > error(字符串)
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .or_else(|| value.get("error").and_then(Value::as_str))
        .map(str::to_string)
}
