use std::sync::Arc;

use crate::backend::CloseDayApi;
use crate::error::CommitError;
use crate::models::{CloseDayRequest, EntryMethod, ReconciliationSummary};

use super::session::{ClosingStore, ScanSession};

/// 日结提交服务
///
/// 一次性提交完整收盘列表, 从不按单次扫描增量提交; 失败不自动重试。
pub struct ReconciliationCommitter {
    api: Arc<dyn CloseDayApi>,
    store_id: String,
    current_shift_id: Option<String>,
}

impl ReconciliationCommitter {
    pub fn new(
        api: Arc<dyn CloseDayApi>,
        store_id: impl Into<String>,
        current_shift_id: Option<String>,
    ) -> Self {
        Self {
            api,
            store_id: store_id.into(),
            current_shift_id,
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// 生成请求体并把会话切到提交中
    pub fn prepare<S: ClosingStore>(
        &self,
        session: &mut ScanSession<S>,
    ) -> Result<CloseDayRequest, CommitError> {
        session.begin_commit(EntryMethod::Scan, self.current_shift_id.clone())
    }

    /// 调用后端 (不触碰会话)
    pub async fn submit(&self, request: &CloseDayRequest) -> Result<ReconciliationSummary, CommitError> {
        let result = self.api.close_day(&self.store_id, request).await;
        match &result {
            Ok(summary) => tracing::info!(
                "Day close committed for store {}: business day {}, {} closings, total {}",
                self.store_id,
                summary.business_day,
                summary.closings_created,
                summary.lottery_total
            ),
            Err(e) => tracing::error!("Day close failed for store {}: {}", self.store_id, e),
        }
        result
    }

    /// 完整提交流程: 成功清空会话, 失败保留记录
    pub async fn commit<S: ClosingStore>(
        &self,
        session: &mut ScanSession<S>,
    ) -> Result<ReconciliationSummary, CommitError> {
        let request = self.prepare(session)?;
        let result = self.submit(&request).await;
        session.finish_commit(result.is_ok());
        result
    }
}
