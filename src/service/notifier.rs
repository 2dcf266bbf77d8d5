use std::sync::{Arc, Mutex};

/// 操作员提示 (提示音/toast), 只发不等
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// 默认实现: 写日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!(target: "operator", "✔ {}", message);
    }

    fn notify_error(&self, message: &str) {
        tracing::warn!(target: "operator", "✘ {}", message);
    }
}

/// 提示类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// 记录所有提示, 供宿主轮询或测试断言
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.push(Notice::Success(message.to_string()));
    }

    fn notify_error(&self, message: &str) {
        self.push(Notice::Error(message.to_string()));
    }
}
