//! 工作流 - 流程层
//!
//! 核心职责：把界面事件变成命令，按状态机的规则执行
//!
//! 一次提交分三步：
//! 1. 加锁：校验、拍快照、状态机放行
//! 2. 解锁：发送请求（期间允许继续切换选择）
//! 3. 加锁：回写结果；检查成功时用新提取的字段整体替换列表

use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::error::ValidationError;
use crate::models::{Stage, UploadContext};
use crate::services::selection::FieldView;
use crate::services::validation::validate_recipient;
use crate::services::{ResponseArrayExtractor, SubmissionCoordinator, Transport};
use crate::workflow::context::{SubmissionSnapshot, WorkflowContext};
use crate::workflow::machine::{ActionStatus, Completion, SendSelectedPolicy, Ticket, WorkflowState};

/// 界面发来的命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 选择新文件
    SelectFile(UploadContext),
    /// 修改标题 / 收件人 / 正文
    UpdateMetadata {
        title: String,
        recipient: String,
        body: String,
    },
    /// 设置某个字段的选择状态
    Toggle { index: usize, selected: bool },
    SelectAll,
    ClearAll,
    /// 触发某个阶段的提交
    Submit(Stage),
}

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    FileSelected,
    MetadataUpdated,
    /// `applied == false` 表示索引越界被忽略
    Toggled { applied: bool },
    SelectionChanged { selected: usize },
    /// 检查成功并检测到字段
    FieldsDetected { count: usize },
    /// 检查成功，但响应中没有可识别的字段
    NoFieldsDetected,
    /// 发送成功
    Sent { stage: Stage, status: u16 },
    /// 请求失败（传输失败时 status 为 0），操作已重新可用
    StageFailed {
        stage: Stage,
        status: u16,
        body: String,
    },
    /// 请求期间已更换文件，结果被丢弃
    Discarded { stage: Stage },
}

/// 工作流
///
/// - 持有唯一的上下文（加锁访问）
/// - 所有方法都只需要 `&self`，请求进行中仍可接受切换命令
pub struct Workflow<T> {
    ctx: Mutex<WorkflowContext>,
    coordinator: SubmissionCoordinator<T>,
    extractor: ResponseArrayExtractor,
}

impl<T: Transport> Workflow<T> {
    pub fn new(
        coordinator: SubmissionCoordinator<T>,
        extractor: ResponseArrayExtractor,
        policy: SendSelectedPolicy,
    ) -> Self {
        Self {
            ctx: Mutex::new(WorkflowContext::new(policy)),
            coordinator,
            extractor,
        }
    }

    pub fn coordinator(&self) -> &SubmissionCoordinator<T> {
        &self.coordinator
    }

    /// 执行一条命令
    ///
    /// 只有本地校验失败才返回 `Err`，网络失败体现在 `CommandOutcome::StageFailed`
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, ValidationError> {
        match command {
            Command::SelectFile(upload) => {
                info!("📄 选择文件: {} ({} 字节)", upload.file_name, upload.size());
                self.lock().replace_upload(upload);
                Ok(CommandOutcome::FileSelected)
            }
            Command::UpdateMetadata {
                title,
                recipient,
                body,
            } => {
                if self.lock().update_metadata(title, recipient, body) {
                    Ok(CommandOutcome::MetadataUpdated)
                } else {
                    Err(ValidationError::MissingFile)
                }
            }
            Command::Toggle { index, selected } => {
                let applied = self.lock().store.toggle(index, selected);
                Ok(CommandOutcome::Toggled { applied })
            }
            Command::SelectAll => Ok(self.set_all(true)),
            Command::ClearAll => Ok(self.set_all(false)),
            Command::Submit(stage) => self.submit(stage).await,
        }
    }

    /// 触发某个阶段的提交
    pub async fn submit(&self, stage: Stage) -> Result<CommandOutcome, ValidationError> {
        let (ticket, snapshot) = {
            let mut ctx = self.lock();
            let result = Self::prepare(&mut ctx, stage);
            if let Err(e) = &result {
                warn!("[{}] ⚠️ 已拒绝: {}", stage, e);
            }
            result?
        };

        let outcome = self
            .coordinator
            .submit(stage, &snapshot.upload, &snapshot.records)
            .await;

        // 先在锁外解析，避免长时间持锁
        let detected = (stage == Stage::Analyze && outcome.ok)
            .then(|| self.extractor.extract(&outcome.body));

        let mut ctx = self.lock();
        if ctx.machine.finish(ticket, outcome.ok) == Completion::Stale {
            warn!("[{}] 请求期间已更换文件，丢弃结果", stage);
            return Ok(CommandOutcome::Discarded { stage });
        }

        if !outcome.ok {
            warn!("[{}] ❌ 失败 (HTTP {})，可重试", stage, outcome.status);
            return Ok(CommandOutcome::StageFailed {
                stage,
                status: outcome.status,
                body: outcome.body,
            });
        }

        match detected {
            Some(records) => {
                let count = records.len();
                ctx.store.replace_all(records);
                if count == 0 {
                    info!("[{}] ✓ 检查完成，未检测到个人信息", stage);
                    Ok(CommandOutcome::NoFieldsDetected)
                } else {
                    info!("[{}] ✓ 检查完成，检测到 {} 个字段", stage, count);
                    Ok(CommandOutcome::FieldsDetected { count })
                }
            }
            None => {
                info!("[{}] ✓ 发送成功 (HTTP {})", stage, outcome.status);
                Ok(CommandOutcome::Sent {
                    stage,
                    status: outcome.status,
                })
            }
        }
    }

    /// 校验 + 拍快照 + 放行，全部在同一次加锁内完成
    fn prepare(
        ctx: &mut WorkflowContext,
        stage: Stage,
    ) -> Result<(Ticket, SubmissionSnapshot), ValidationError> {
        ctx.machine.check(stage)?;

        let snapshot = ctx.snapshot(stage).ok_or(ValidationError::MissingFile)?;
        match stage {
            Stage::Analyze => {}
            Stage::SendAll => validate_recipient(&snapshot.upload.recipient)?,
            Stage::SendSelected => {
                if ctx.store.selected_count() == 0 {
                    return Err(ValidationError::NoSelection);
                }
            }
        }

        let ticket = ctx.machine.begin(stage)?;
        Ok((ticket, snapshot))
    }

    fn set_all(&self, selected: bool) -> CommandOutcome {
        let mut ctx = self.lock();
        ctx.store.set_all(selected);
        CommandOutcome::SelectionChanged {
            selected: ctx.store.selected_count(),
        }
    }

    // ========== 查询 ==========

    pub fn state(&self) -> WorkflowState {
        self.lock().machine.state()
    }

    pub fn action(&self, stage: Stage) -> ActionStatus {
        self.lock().machine.action(stage)
    }

    pub fn views(&self) -> Vec<FieldView> {
        self.lock().store.views()
    }

    /// 当前上下文的副本
    pub fn context(&self) -> WorkflowContext {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowContext> {
        self.ctx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
