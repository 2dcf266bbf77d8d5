use std::time::{Duration, Instant};

use super::parser::SERIAL_CODE_LEN;

/// 默认防抖窗口
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// 扫描输入缓冲 - 把键盘流切分成一次次扫描
///
/// 只保留数字; 每个被接受的字符都会重置定时器。缓冲达到 24 位立即完成,
/// 定时器到期时不足 24 位则保留在输入框中 (手工录入), 不提交。
/// 宿主负责在 `deadline()` 到期时调用 `on_timer()`。
///
/// 残留的手工输入与下一串扫描拼成一个码时, 该串扫描多出的尾部数字
/// 在同一串内丢弃, 后续扫描保持对齐。
#[derive(Debug, Clone)]
pub struct ScanIntakeBuffer {
    buffer: String,
    deadline: Option<Instant>,
    debounce: Duration,
    /// 上一个数字到达时间, 用于判断是否开始新的一串输入
    last_input: Option<Instant>,
    /// 当前这串输入开始前缓冲里已有的位数
    carried: usize,
    /// 当前这串输入中还需丢弃的位数
    discard: usize,
}

impl ScanIntakeBuffer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            buffer: String::with_capacity(SERIAL_CODE_LEN),
            deadline: None,
            debounce,
            last_input: None,
            carried: 0,
            discard: 0,
        }
    }

    /// 追加输入，返回本次输入中完成的所有扫描码
    pub fn push_str(&mut self, text: &str, now: Instant) -> Vec<String> {
        let mut completed = Vec::new();
        for ch in text.chars() {
            if let Some(code) = self.push_char(ch, now) {
                completed.push(code);
            }
        }
        completed
    }

    /// 追加单个字符; 非数字静默丢弃
    pub fn push_char(&mut self, ch: char, now: Instant) -> Option<String> {
        if !ch.is_ascii_digit() {
            return None;
        }

        let new_burst = self
            .last_input
            .map_or(true, |at| now >= at + self.debounce);
        if new_burst {
            self.carried = self.buffer.len();
            self.discard = 0;
        }
        self.last_input = Some(now);

        if self.discard > 0 {
            self.discard -= 1;
            return None;
        }

        self.buffer.push(ch);
        if self.buffer.len() >= SERIAL_CODE_LEN {
            // 拼入了上一串的残留: 本串末尾同样多的数字属于这次扫描
            self.discard = std::mem::take(&mut self.carried);
            if self.discard > 0 {
                tracing::debug!(
                    "Scan completed over {} stale digits, dropping the rest of this burst",
                    self.discard
                );
            }
            return Some(self.take());
        }

        self.deadline = Some(now + self.debounce);
        None
    }

    /// 定时器到期回调
    pub fn on_timer(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.buffer.len() == SERIAL_CODE_LEN {
                    Some(self.take())
                } else {
                    if !self.buffer.is_empty() {
                        tracing::debug!(
                            "Scan burst ended with {} digits, keeping as manual input",
                            self.buffer.len()
                        );
                    }
                    None
                }
            }
            _ => None,
        }
    }

    /// 卸载/取消: 停止定时器并清空
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.last_input = None;
        self.carried = 0;
        self.discard = 0;
        self.buffer.clear();
    }

    /// 当前可见的未完成输入
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn take(&mut self) -> String {
        self.deadline = None;
        std::mem::take(&mut self.buffer)
    }
}

impl Default for ScanIntakeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
