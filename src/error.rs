use thiserror::Error;

/// 扫描期错误: 均在本地恢复，不改变会话状态
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Invalid scan: expected {expected} digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("No open bin holds game {game_code} pack {pack_number}")]
    NotFound {
        game_code: String,
        pack_number: String,
    },

    #[error("Bin {bin_number} already has closing serial {closing_serial}")]
    Duplicate {
        bin_id: String,
        bin_number: u32,
        closing_serial: String,
    },

    #[error(
        "Closing serial {closing_serial} is out of range for bin {bin_number} \
         (valid: {starting_serial}-{serial_end})"
    )]
    RangeViolation {
        bin_id: String,
        bin_number: u32,
        closing_serial: String,
        starting_serial: String,
        serial_end: String,
    },

    #[error("Session is {state}, scans are not accepted")]
    SessionLocked { state: &'static str },
}

impl ScanError {
    /// 错误类别 (供前端区分提示)
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::InvalidLength { .. } => "invalid_length",
            ScanError::NotFound { .. } => "not_found",
            ScanError::Duplicate { .. } => "duplicate",
            ScanError::RangeViolation { .. } => "range_violation",
            ScanError::SessionLocked { .. } => "session_locked",
        }
    }
}

/// 日结提交错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("Cannot close day: {scanned}/{total} bins scanned")]
    NotReady { scanned: usize, total: usize },

    #[error("A day-close commit is already in progress")]
    InProgress,

    #[error("Session is {state}, nothing to commit")]
    SessionClosed { state: &'static str },

    #[error("Day close failed: {message}")]
    Failed {
        status: Option<u16>,
        message: String,
    },
}

impl CommitError {
    pub fn failed(message: impl Into<String>) -> Self {
        CommitError::Failed {
            status: None,
            message: message.into(),
        }
    }
}

/// 扫描站句柄调用错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("Scan station is not running")]
    Closed,

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

pub type ScanResult<T> = Result<T, ScanError>;
