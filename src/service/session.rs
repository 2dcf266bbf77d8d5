use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{CommitError, ScanError};
use crate::models::{
    Bin, CloseDayRequest, ClosingLine, EntryMethod, ParsedSerial, ReconciliationSummary,
    ScannedClosing,
};

use super::index::BinIndex;
use super::validation::validate;

/// 收盘记录存储 - 会话内部持有或委托给宿主
///
/// 宿主若自己持有权威列表 (例如上层页面状态), 实现此 trait 即可,
/// 会话只通过这些方法读写。
pub trait ClosingStore {
    fn get(&self, bin_id: &str) -> Option<ScannedClosing>;

    /// 插入或替换, 返回被替换的旧记录
    fn upsert(&mut self, closing: ScannedClosing) -> Option<ScannedClosing>;

    fn remove(&mut self, bin_id: &str) -> Option<ScannedClosing>;

    /// 按扫描顺序返回所有记录
    fn entries(&self) -> Vec<ScannedClosing>;

    fn clear(&mut self);

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 内部存储: bin_id -> 记录, 保序
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, ScannedClosing>,
}

impl ClosingStore for MemoryStore {
    fn get(&self, bin_id: &str) -> Option<ScannedClosing> {
        self.entries.get(bin_id).cloned()
    }

    fn upsert(&mut self, closing: ScannedClosing) -> Option<ScannedClosing> {
        self.entries.insert(closing.bin_id.clone(), closing)
    }

    fn remove(&mut self, bin_id: &str) -> Option<ScannedClosing> {
        self.entries.shift_remove(bin_id)
    }

    fn entries(&self) -> Vec<ScannedClosing> {
        self.entries.values().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// 会话生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Scanning,
    Committing,
    Committed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Scanning => "scanning",
            SessionState::Committing => "committing",
            SessionState::Committed => "committed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// 票箱扫描状态 (校验失败只是瞬时提示, 不落到票箱状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinStatus {
    Unscanned,
    Scanned,
}

/// 展示行
#[derive(Debug, Clone, Serialize)]
pub struct BinRow {
    pub bin_id: String,
    pub bin_number: u32,
    pub game_name: String,
    pub pack_number: String,
    pub starting_serial: String,
    pub serial_end: String,
    pub status: BinStatus,
    pub closing_serial: Option<String>,
}

/// 一次成功扫描的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanAccepted {
    pub bin_number: u32,
    pub closing: ScannedClosing,
    /// 重扫时被替换的旧记录
    pub replaced: Option<ScannedClosing>,
}

/// 会话状态变化事件 (通知宿主)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Scanned { bin_number: u32, closing: ScannedClosing },
    Rejected { kind: &'static str, message: String },
    Undone { bin_id: String },
    CommitStarted { closings: usize },
    Committed { summary: ReconciliationSummary },
    CommitFailed { message: String },
    Cancelled,
}

/// 日结扫描会话 - 聚合状态机
#[derive(Debug)]
pub struct ScanSession<S: ClosingStore = MemoryStore> {
    index: BinIndex,
    store: S,
    state: SessionState,
}

impl ScanSession<MemoryStore> {
    pub fn new(bins: &[Bin]) -> Self {
        Self::with_store(bins, MemoryStore::default())
    }
}

impl<S: ClosingStore> ScanSession<S> {
    /// 使用宿主提供的存储创建会话
    pub fn with_store(bins: &[Bin], store: S) -> Self {
        Self {
            index: BinIndex::build(bins),
            store,
            state: SessionState::Scanning,
        }
    }

    /// 应用一次扫描: 索引查找 + 校验, 通过则插入/替换该票箱的记录
    pub fn apply_scan(&mut self, parsed: &ParsedSerial) -> Result<ScanAccepted, ScanError> {
        self.ensure_scanning()?;

        let lookup = self.index.lookup(&parsed.game_code, &parsed.pack_number);
        let existing = lookup.and_then(|hit| self.store.get(&hit.bin.bin_id));
        let bin_number = lookup.map(|hit| hit.bin.bin_number).unwrap_or_default();

        let closing = validate(parsed, lookup, existing.as_ref()).into_result()?;
        let replaced = self.store.upsert(closing.clone());

        tracing::info!(
            "Bin {} scanned: pack {} closing serial {}{}",
            bin_number,
            parsed.pack_number,
            closing.closing_serial,
            if replaced.is_some() { " (rescan)" } else { "" }
        );

        Ok(ScanAccepted {
            bin_number,
            closing,
            replaced,
        })
    }

    /// 撤销某票箱的记录, 回到未扫描; 没有记录时无操作
    pub fn undo(&mut self, bin_id: &str) -> Result<Option<ScannedClosing>, ScanError> {
        self.ensure_scanning()?;
        let removed = self.store.remove(bin_id);
        if removed.is_some() {
            tracing::info!("Bin {} scan undone", bin_id);
        }
        Ok(removed)
    }

    pub fn scanned_count(&self) -> usize {
        self.index
            .scannable()
            .filter(|b| self.store.get(&b.bin_id).is_some())
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.index.scannable_count()
    }

    /// 完成百分比 (四舍五入), 仅用于提示
    pub fn progress(&self) -> u8 {
        let total = self.total_count();
        if total == 0 {
            return 0;
        }
        let scanned = self.scanned_count();
        ((scanned * 100 + total / 2) / total) as u8
    }

    /// 全部需扫描票箱都有记录; 没有可扫描票箱时为 false
    pub fn is_complete(&self) -> bool {
        let total = self.total_count();
        total > 0 && self.scanned_count() == total
    }

    /// 提交按钮是否可用
    pub fn can_commit(&self) -> bool {
        self.state == SessionState::Scanning && self.is_complete()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn closings(&self) -> Vec<ScannedClosing> {
        self.store.entries()
    }

    pub fn closing_for(&self, bin_id: &str) -> Option<ScannedClosing> {
        self.store.get(bin_id)
    }

    pub fn index(&self) -> &BinIndex {
        &self.index
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rows(&self) -> Vec<BinRow> {
        self.index
            .scannable()
            .filter_map(|bin| {
                let pack = bin.pack.as_ref()?;
                let closing = self.store.get(&bin.bin_id);
                Some(BinRow {
                    bin_id: bin.bin_id.clone(),
                    bin_number: bin.bin_number,
                    game_name: pack.game_name.clone(),
                    pack_number: pack.pack_number.clone(),
                    starting_serial: pack.starting_serial.clone(),
                    serial_end: pack.serial_end.clone(),
                    status: if closing.is_some() {
                        BinStatus::Scanned
                    } else {
                        BinStatus::Unscanned
                    },
                    closing_serial: closing.map(|c| c.closing_serial),
                })
            })
            .collect()
    }

    /// 进入提交中状态, 生成请求体; 之后扫描/撤销被拒绝
    pub fn begin_commit(
        &mut self,
        entry_method: EntryMethod,
        current_shift_id: Option<String>,
    ) -> Result<CloseDayRequest, CommitError> {
        match self.state {
            SessionState::Scanning => {}
            SessionState::Committing => return Err(CommitError::InProgress),
            other => return Err(CommitError::SessionClosed { state: other.as_str() }),
        }

        if !self.is_complete() {
            return Err(CommitError::NotReady {
                scanned: self.scanned_count(),
                total: self.total_count(),
            });
        }

        self.state = SessionState::Committing;
        // 宿主存储可能带有快照之外的票箱, 只提交本次可扫描的
        let closings = self
            .store
            .entries()
            .iter()
            .filter(|c| self.index.bin(&c.bin_id).is_some_and(Bin::is_scannable))
            .map(ClosingLine::from)
            .collect();
        Ok(CloseDayRequest {
            closings,
            entry_method,
            current_shift_id,
        })
    }

    /// 提交结束: 成功则清空会话, 失败则保留全部记录以便重试
    pub fn finish_commit(&mut self, succeeded: bool) {
        if self.state != SessionState::Committing {
            return;
        }
        if succeeded {
            self.store.clear();
            self.state = SessionState::Committed;
        } else {
            self.state = SessionState::Scanning;
        }
    }

    /// 放弃会话, 不提交任何数据
    pub fn cancel(&mut self) -> Result<(), CommitError> {
        if self.state == SessionState::Committing {
            return Err(CommitError::InProgress);
        }
        self.store.clear();
        self.state = SessionState::Cancelled;
        Ok(())
    }

    fn ensure_scanning(&self) -> Result<(), ScanError> {
        if self.state == SessionState::Scanning {
            Ok(())
        } else {
            Err(ScanError::SessionLocked {
                state: self.state.as_str(),
            })
        }
    }
}
