use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{CommitError, ScanError, StationError};
use crate::models::{Bin, ReconciliationSummary, ScannedClosing};

use super::committer::ReconciliationCommitter;
use super::intake::ScanIntakeBuffer;
use super::notifier::Notifier;
use super::parser::parse_serial;
use super::session::{BinRow, ScanAccepted, ScanSession, SessionEvent, SessionState};

/// 单次扫描结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanOutcome {
    Accepted(ScanAccepted),
    Rejected { kind: &'static str, message: String },
}

impl ScanOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScanOutcome::Accepted(_))
    }
}

/// 键盘输入回执
#[derive(Debug, Clone, Serialize)]
pub struct InputAck {
    pub outcomes: Vec<ScanOutcome>,
    /// 输入框中仍可见的未完成输入
    pub pending: String,
}

/// 会话快照 (展示用)
#[derive(Debug, Clone, Serialize)]
pub struct StationSnapshot {
    pub state: SessionState,
    pub scanned: usize,
    pub total: usize,
    pub progress: u8,
    pub can_commit: bool,
    pub pending_input: String,
    pub rows: Vec<BinRow>,
    pub last_summary: Option<ReconciliationSummary>,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Input { text: String, reply: Reply<InputAck> },
    Submit { code: Option<String>, reply: Reply<ScanOutcome> },
    Undo { bin_id: String, reply: Reply<Result<Option<ScannedClosing>, ScanError>> },
    Snapshot { reply: Reply<StationSnapshot> },
    Commit { reply: Reply<Result<ReconciliationSummary, CommitError>> },
    Cancel { reply: Reply<Result<(), CommitError>> },
    Shutdown,
}

struct InFlightCommit {
    task: JoinHandle<Result<ReconciliationSummary, CommitError>>,
    reply: Reply<Result<ReconciliationSummary, CommitError>>,
}

/// 扫描站 - 单任务事件循环, 独占会话与输入缓冲
///
/// 所有命令按顺序在同一个任务里处理, 会话无需加锁。
/// 防抖定时器和提交中的请求与命令一起在 `select!` 中等待。
pub struct ScanStation {
    session: ScanSession,
    intake: ScanIntakeBuffer,
    committer: Arc<ReconciliationCommitter>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<SessionEvent>,
    last_summary: Option<ReconciliationSummary>,
}

impl ScanStation {
    pub fn new(
        bins: &[Bin],
        committer: Arc<ReconciliationCommitter>,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            session: ScanSession::new(bins),
            intake: ScanIntakeBuffer::new(debounce),
            committer,
            notifier,
            events,
            last_summary: None,
        }
    }

    /// 启动事件循环
    pub fn spawn(self) -> StationHandle {
        let (tx, rx) = mpsc::channel(64);
        let events = self.events.clone();
        tokio::spawn(self.run(rx));
        StationHandle { tx, events }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::info!(
            "Scan station started: {} bins to scan for store {}",
            self.session.total_count(),
            self.committer.store_id()
        );
        let mut in_flight: Option<InFlightCommit> = None;

        loop {
            let deadline = self.intake.deadline();
            let sleep = tokio::time::sleep_until(
                deadline
                    .map(tokio::time::Instant::from_std)
                    .unwrap_or_else(tokio::time::Instant::now),
            );

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd, &mut in_flight),
                },
                _ = sleep, if deadline.is_some() => {
                    if let Some(code) = self.intake.on_timer(Instant::now()) {
                        self.process_code(&code);
                    }
                }
                result = join_commit(&mut in_flight), if in_flight.is_some() => {
                    if let Some(commit) = in_flight.take() {
                        self.complete_commit(result, commit.reply);
                    }
                }
            }
        }

        // 卸载: 停止定时器, 不发起提交
        self.intake.cancel();
        if let Some(commit) = in_flight.take() {
            tracing::warn!("Scan station stopped while a day-close commit was in flight");
            commit.task.abort();
        }
        tracing::info!("Scan station stopped");
    }

    fn handle(&mut self, cmd: Command, in_flight: &mut Option<InFlightCommit>) {
        match cmd {
            Command::Input { text, reply } => {
                let codes = self.intake.push_str(&text, Instant::now());
                let outcomes = codes.iter().map(|code| self.process_code(code)).collect();
                let _ = reply.send(InputAck {
                    outcomes,
                    pending: self.intake.pending().to_string(),
                });
            }
            Command::Submit { code, reply } => {
                let raw = code.unwrap_or_else(|| self.intake.pending().to_string());
                self.intake.cancel();
                let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
                let _ = reply.send(self.process_code(&digits));
            }
            Command::Undo { bin_id, reply } => {
                let result = self.session.undo(&bin_id);
                if let Ok(Some(_)) = &result {
                    self.emit(SessionEvent::Undone { bin_id });
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Commit { reply } => match self.committer.prepare(&mut self.session) {
                Ok(request) => {
                    self.emit(SessionEvent::CommitStarted {
                        closings: request.closings.len(),
                    });
                    let committer = self.committer.clone();
                    let task = tokio::spawn(async move { committer.submit(&request).await });
                    *in_flight = Some(InFlightCommit { task, reply });
                }
                Err(e) => {
                    self.notifier.notify_error(&e.to_string());
                    let _ = reply.send(Err(e));
                }
            },
            Command::Cancel { reply } => {
                let result = self.session.cancel();
                if result.is_ok() {
                    self.intake.cancel();
                    tracing::info!("Day-close scanning cancelled");
                    self.emit(SessionEvent::Cancelled);
                }
                let _ = reply.send(result);
            }
            Command::Shutdown => {}
        }
    }

    /// 解析 + 应用一次扫描; 失败只提示, 会话不变
    fn process_code(&mut self, code: &str) -> ScanOutcome {
        let result = parse_serial(code).and_then(|parsed| self.session.apply_scan(&parsed));
        match result {
            Ok(accepted) => {
                self.notifier.notify_success(&format!(
                    "Bin {} closing serial {}",
                    accepted.bin_number, accepted.closing.closing_serial
                ));
                self.emit(SessionEvent::Scanned {
                    bin_number: accepted.bin_number,
                    closing: accepted.closing.clone(),
                });
                ScanOutcome::Accepted(accepted)
            }
            Err(e) => {
                tracing::warn!("Scan rejected ({}): {}", e.kind(), e);
                let message = e.to_string();
                self.notifier.notify_error(&message);
                self.emit(SessionEvent::Rejected {
                    kind: e.kind(),
                    message: message.clone(),
                });
                ScanOutcome::Rejected {
                    kind: e.kind(),
                    message,
                }
            }
        }
    }

    fn complete_commit(
        &mut self,
        result: Result<ReconciliationSummary, CommitError>,
        reply: Reply<Result<ReconciliationSummary, CommitError>>,
    ) {
        self.session.finish_commit(result.is_ok());
        match &result {
            Ok(summary) => {
                self.intake.cancel();
                self.notifier.notify_success(&format!(
                    "Business day {} closed, lottery total {}",
                    summary.business_day, summary.lottery_total
                ));
                self.last_summary = Some(summary.clone());
                self.emit(SessionEvent::Committed {
                    summary: summary.clone(),
                });
            }
            Err(e) => {
                self.notifier.notify_error(&e.to_string());
                self.emit(SessionEvent::CommitFailed {
                    message: e.to_string(),
                });
            }
        }
        let _ = reply.send(result);
    }

    fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            state: self.session.state(),
            scanned: self.session.scanned_count(),
            total: self.session.total_count(),
            progress: self.session.progress(),
            can_commit: self.session.can_commit(),
            pending_input: self.intake.pending().to_string(),
            rows: self.session.rows(),
            last_summary: self.last_summary.clone(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // 没有订阅者时发送失败, 忽略
        let _ = self.events.send(event);
    }
}

async fn join_commit(
    in_flight: &mut Option<InFlightCommit>,
) -> Result<ReconciliationSummary, CommitError> {
    match in_flight.as_mut() {
        Some(commit) => match (&mut commit.task).await {
            Ok(result) => result,
            Err(e) => Err(CommitError::failed(format!("Commit task aborted: {}", e))),
        },
        None => std::future::pending().await,
    }
}

/// 扫描站句柄, 可克隆, 供宿主 (HTTP 层) 使用
#[derive(Clone)]
pub struct StationHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl StationHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, StationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StationError::Closed)?;
        rx.await.map_err(|_| StationError::Closed)
    }

    /// 键盘/扫描枪输入
    pub async fn input(&self, text: impl Into<String>) -> Result<InputAck, StationError> {
        let text = text.into();
        self.request(|reply| Command::Input { text, reply }).await
    }

    /// 手工提交: `None` 提交输入框当前内容
    pub async fn submit(&self, code: Option<String>) -> Result<ScanOutcome, StationError> {
        self.request(|reply| Command::Submit { code, reply }).await
    }

    pub async fn undo(&self, bin_id: impl Into<String>) -> Result<Option<ScannedClosing>, StationError> {
        let bin_id = bin_id.into();
        Ok(self.request(|reply| Command::Undo { bin_id, reply }).await??)
    }

    pub async fn snapshot(&self) -> Result<StationSnapshot, StationError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn commit(&self) -> Result<ReconciliationSummary, StationError> {
        Ok(self.request(|reply| Command::Commit { reply }).await??)
    }

    pub async fn cancel(&self) -> Result<(), StationError> {
        Ok(self.request(|reply| Command::Cancel { reply }).await??)
    }

    /// 停止事件循环 (页面卸载)
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CloseDayApi;
    use crate::models::CloseDayRequest;
    use crate::service::committer::testing::{summary_for, ScriptedApi};
    use crate::service::index::fixtures::bin;
    use crate::service::notifier::{Notice, RecordingNotifier};
    use crate::service::parser::encode_serial;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn bins() -> Vec<Bin> {
        vec![bin("b1", 1, "0001", "0000001"), bin("b2", 2, "0002", "0000002")]
    }

    fn start(api: Arc<dyn CloseDayApi>) -> (StationHandle, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let committer = Arc::new(ReconciliationCommitter::new(api, "store-1", None));
        let station = ScanStation::new(
            &bins(),
            committer,
            Arc::new(notifier.clone()),
            Duration::from_millis(50),
        );
        (station.spawn(), notifier)
    }

    #[tokio::test]
    async fn scanner_burst_is_applied() {
        let (station, notifier) = start(Arc::new(ScriptedApi::default()));
        let ack = station.input(encode_serial("0001", "0000001", "025")).await.unwrap();

        assert_eq!(ack.outcomes.len(), 1);
        assert!(ack.outcomes[0].is_accepted());
        assert_eq!(ack.pending, "");
        assert!(matches!(notifier.notices()[0], Notice::Success(_)));

        let snapshot = station.snapshot().await.unwrap();
        assert_eq!(snapshot.scanned, 1);
        assert_eq!(snapshot.progress, 50);
        assert!(!snapshot.can_commit);
    }

    #[tokio::test]
    async fn partial_input_is_not_submitted_by_timer() {
        let (station, _) = start(Arc::new(ScriptedApi::default()));
        let ack = station.input("00010000").await.unwrap();
        assert!(ack.outcomes.is_empty());

        tokio::time::sleep(Duration::from_millis(120)).await;
        let snapshot = station.snapshot().await.unwrap();
        assert_eq!(snapshot.pending_input, "00010000");
        assert_eq!(snapshot.scanned, 0);
    }

    #[tokio::test]
    async fn scans_after_stale_partial_stay_aligned() {
        let (station, _) = start(Arc::new(ScriptedApi::default()));
        station.input("123").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        // 第一次扫描与残留拼接, 被拒绝; 缓冲随之清空
        let ack = station.input(encode_serial("0001", "0000001", "010")).await.unwrap();
        assert_eq!(ack.outcomes.len(), 1);
        assert!(matches!(ack.outcomes[0], ScanOutcome::Rejected { kind: "not_found", .. }));
        assert_eq!(ack.pending, "");

        let ack = station.input(encode_serial("0002", "0000002", "020")).await.unwrap();
        assert_eq!(ack.outcomes.len(), 1);
        assert!(ack.outcomes[0].is_accepted());
        assert_eq!(ack.pending, "");

        tokio::time::sleep(Duration::from_millis(120)).await;
        let ack = station.input(encode_serial("0001", "0000001", "010")).await.unwrap();
        assert!(ack.outcomes[0].is_accepted());
        assert_eq!(station.snapshot().await.unwrap().scanned, 2);
    }

    #[tokio::test]
    async fn manual_submit_of_short_input_is_invalid_length() {
        let (station, notifier) = start(Arc::new(ScriptedApi::default()));
        station.input("1234").await.unwrap();

        let outcome = station.submit(None).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Rejected { kind: "invalid_length", .. }));
        assert_eq!(station.snapshot().await.unwrap().pending_input, "");
        assert!(matches!(notifier.notices()[0], Notice::Error(_)));
    }

    #[tokio::test]
    async fn rejected_scan_is_broadcast() {
        let (station, _) = start(Arc::new(ScriptedApi::default()));
        let mut events = station.subscribe();

        station.input(encode_serial("0009", "0000009", "001")).await.unwrap();
        match events.recv().await.unwrap() {
            SessionEvent::Rejected { kind, .. } => assert_eq!(kind, "not_found"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_then_session_is_closed() {
        let api = Arc::new(ScriptedApi::default());
        let (station, _) = start(api.clone());
        station.input(encode_serial("0001", "0000001", "010")).await.unwrap();

        let err = station.commit().await.unwrap_err();
        assert_eq!(err, StationError::Commit(CommitError::NotReady { scanned: 1, total: 2 }));

        station.input(encode_serial("0002", "0000002", "020")).await.unwrap();
        let summary = station.commit().await.unwrap();
        assert_eq!(summary.closings_created, 2);

        let snapshot = station.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Committed);
        assert!(snapshot.last_summary.is_some());
        assert_eq!(api.calls(), 1);
    }

    /// 提交前等待放行的后端
    struct GatedApi {
        gate: Notify,
    }

    #[async_trait]
    impl CloseDayApi for GatedApi {
        async fn close_day(
            &self,
            _store_id: &str,
            request: &CloseDayRequest,
        ) -> Result<ReconciliationSummary, CommitError> {
            self.gate.notified().await;
            Ok(summary_for(request))
        }
    }

    #[tokio::test]
    async fn second_commit_while_in_flight_is_refused() {
        let api = Arc::new(GatedApi { gate: Notify::new() });
        let (station, _) = start(api.clone());
        station.input(encode_serial("0001", "0000001", "010")).await.unwrap();
        station.input(encode_serial("0002", "0000002", "020")).await.unwrap();

        let first = {
            let station = station.clone();
            tokio::spawn(async move { station.commit().await })
        };
        // 等待第一次提交进入 in-flight
        while station.snapshot().await.unwrap().state != SessionState::Committing {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            station.commit().await.unwrap_err(),
            StationError::Commit(CommitError::InProgress)
        );
        let locked = station.submit(Some(encode_serial("0001", "0000001", "011"))).await.unwrap();
        assert!(matches!(locked, ScanOutcome::Rejected { kind: "session_locked", .. }));
        assert!(station.cancel().await.is_err());

        api.gate.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn shutdown_stops_station() {
        let (station, _) = start(Arc::new(ScriptedApi::default()));
        station.input("123").await.unwrap();
        station.shutdown().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(station.snapshot().await.unwrap_err(), StationError::Closed);
    }
}
