//! 诊断记录服务 - 业务能力层
//!
//! 记录每一次外部调用的尝试和结果，外部服务不受本系统控制，
//! 出问题时只能靠这里的记录排查

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::models::Stage;
use crate::utils::logging::truncate_text;

/// 日志行中响应正文的最大显示长度
const BODY_PREVIEW_CHARS: usize = 500;

/// 单次调用的结果类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// 收到 2xx 响应
    Accepted,
    /// 收到响应，但状态码表示拒绝
    Rejected,
    /// 没有收到响应
    TransportFailed,
}

/// 一条诊断记录
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub at: DateTime<Local>,
    pub stage: Stage,
    pub endpoint: String,
    /// 第几次尝试（从 1 开始）
    pub attempt: usize,
    pub result: AttemptResult,
    /// HTTP 状态码，传输失败时为 0
    pub status: u16,
    /// 完整的响应正文或错误信息
    pub detail: String,
}

impl DiagnosticEntry {
    pub fn ok(&self) -> bool {
        self.result == AttemptResult::Accepted
    }

    fn to_line(&self) -> String {
        format!(
            "{} [{}] #{} {} HTTP {} {:?} | {}\n",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.stage,
            self.attempt,
            self.endpoint,
            self.status,
            self.result,
            self.detail.replace('\n', " ")
        )
    }
}

/// 诊断记录服务
///
/// 职责：
/// - 在内存中保留最近的若干条记录
/// - 可选地追加写入日志文件
/// - 写文件失败只打警告，不影响流程
#[derive(Debug)]
pub struct DiagnosticSink {
    entries: Mutex<VecDeque<DiagnosticEntry>>,
    capacity: usize,
    log_file_path: Option<PathBuf>,
}

impl DiagnosticSink {
    /// 只保留在内存中
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            log_file_path: None,
        }
    }

    /// 同时追加写入文件
    pub fn with_log_file(capacity: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            log_file_path: Some(path.into()),
            ..Self::in_memory(capacity)
        }
    }

    /// 记录一次调用
    pub fn record(
        &self,
        stage: Stage,
        endpoint: &str,
        attempt: usize,
        status: u16,
        result: AttemptResult,
        detail: &str,
    ) {
        let entry = DiagnosticEntry {
            at: Local::now(),
            stage,
            endpoint: endpoint.to_string(),
            attempt,
            result,
            status,
            detail: detail.to_string(),
        };

        let preview = truncate_text(detail, BODY_PREVIEW_CHARS);
        match entry.result {
            AttemptResult::Accepted => info!("[{}] HTTP {} {}", stage, status, preview),
            AttemptResult::Rejected => warn!("[{}] HTTP {} {}", stage, status, preview),
            AttemptResult::TransportFailed => error!("[{}] 请求失败: {}", stage, preview),
        }

        self.append_to_file(&entry);

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// 全部记录（按时间顺序）
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.lock().iter().cloned().collect()
    }

    /// 某个阶段最近的一条记录
    pub fn last_for(&self, stage: Stage) -> Option<DiagnosticEntry> {
        self.lock().iter().rev().find(|e| e.stage == stage).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DiagnosticEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn append_to_file(&self, entry: &DiagnosticEntry) {
        let Some(path) = &self.log_file_path else {
            return;
        };

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(entry.to_line().as_bytes()));

        match written {
            Ok(()) => debug!("诊断记录已写入 {}", path.display()),
            Err(e) => warn!("写入诊断文件失败 ({}): {}", path.display(), e),
        }
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::in_memory(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_drops_oldest() {
        let sink = DiagnosticSink::in_memory(2);
        sink.record(Stage::Analyze, "a", 1, 200, AttemptResult::Accepted, "[]");
        sink.record(Stage::SendAll, "b", 1, 500, AttemptResult::Rejected, "boom");
        sink.record(Stage::SendSelected, "c", 1, 0, AttemptResult::TransportFailed, "refused");

        let stages: Vec<Stage> = sink.entries().iter().map(|e| e.stage).collect();
        assert_eq!(stages, [Stage::SendAll, Stage::SendSelected]);
        assert!(sink.last_for(Stage::Analyze).is_none());
    }

    #[test]
    fn test_last_for_returns_latest_attempt() {
        let sink = DiagnosticSink::default();
        sink.record(Stage::SendAll, "b", 1, 0, AttemptResult::TransportFailed, "timeout");
        sink.record(Stage::SendAll, "b", 2, 202, AttemptResult::Accepted, "");

        let last = sink.last_for(Stage::SendAll).unwrap();
        assert_eq!(last.attempt, 2);
        assert!(last.ok());
    }

    #[test]
    fn test_long_body_is_kept_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let sink = DiagnosticSink::with_log_file(4, &path);
        let body = format!("{}END_OF_ERROR", "x".repeat(BODY_PREVIEW_CHARS * 2));

        sink.record(Stage::SendAll, "http://x/send", 1, 500, AttemptResult::Rejected, &body);

        let entry = sink.last_for(Stage::SendAll).unwrap();
        assert_eq!(entry.detail, body);
        assert!(std::fs::read_to_string(&path).unwrap().contains("END_OF_ERROR"));
    }

    #[test]
    fn test_appends_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let sink = DiagnosticSink::with_log_file(8, &path);

        sink.record(Stage::Analyze, "http://x/analyze", 1, 200, AttemptResult::Accepted, "ok\nbody");
        sink.record(Stage::SendAll, "http://x/send", 1, 503, AttemptResult::Rejected, "busy");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[ANALYZE]") && lines[0].contains("ok body"));
        assert!(lines[1].contains("[SEND_MAIL]") && lines[1].contains("HTTP 503"));
    }
}
