//! 工作流状态机 - 流程层
//!
//! 纯状态，不做任何 IO。决定三个操作当前是否可用，并在请求完成时推进状态。
//!
//! ```text
//! Idle ──analyze──▶ Analyzing ──ok──▶ Reviewing ──send-all──▶ SendingAll ──▶ Reviewing
//!  ▲                    │                 │      ──send-selected──▶ SendingSelected ──▶ Reviewing
//!  └──────fail──────────┘                 └──analyze──▶ Analyzing
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, ValidationError};
use crate::models::Stage;

/// 选中字段发送成功后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendSelectedPolicy {
    /// 标记为已完成，但仍可再次发送
    #[default]
    Repeatable,
    /// 与发送邮件一样，成功后禁用，直到重新选择文件
    Once,
}

impl FromStr for SendSelectedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repeatable" => Ok(Self::Repeatable),
            "once" => Ok(Self::Once),
            other => Err(ConfigError::InvalidValue {
                key: "send_selected_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// 工作流所处阶段（对外展示用的汇总状态）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Analyzing,
    Reviewing,
    SendingAll,
    SendingSelected,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::Analyzing => "Analyzing",
            WorkflowState::Reviewing => "Reviewing",
            WorkflowState::SendingAll => "SendingAll",
            WorkflowState::SendingSelected => "SendingSelected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Analyzing,
    Reviewing,
}

/// 操作按钮上显示的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionLabel {
    Ready,
    InProgress,
    Completed,
}

/// 单个操作的界面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionStatus {
    pub enabled: bool,
    pub label: ActionLabel,
}

/// 一次已放行的提交
///
/// 记录触发时的上传代数，完成时用于识别过期结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub stage: Stage,
    pub epoch: u64,
}

/// 提交完成后状态机的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 结果已生效
    Applied,
    /// 期间已更换文件，结果被丢弃
    Stale,
}

/// 工作流状态机
#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    phase: Phase,
    /// 检查失败时要回到的阶段
    phase_before_analyze: Phase,
    has_file: bool,
    epoch: u64,
    in_flight: [bool; 3],
    completed: [bool; 3],
    policy: SendSelectedPolicy,
}

impl WorkflowStateMachine {
    pub fn new(policy: SendSelectedPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            phase_before_analyze: Phase::Idle,
            has_file: false,
            epoch: 0,
            in_flight: [false; 3],
            completed: [false; 3],
            policy,
        }
    }

    /// 选择了新文件：回到初始状态，之前的一切结果作废
    pub fn select_file(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Idle;
        self.phase_before_analyze = Phase::Idle;
        self.has_file = true;
        self.in_flight = [false; 3];
        self.completed = [false; 3];
        info!("选择新文件，状态重置 (epoch {})", self.epoch);
    }

    /// 检查某个阶段现在能否开始（不改变状态）
    pub fn check(&self, stage: Stage) -> Result<(), ValidationError> {
        if self.in_flight[stage.slot()] {
            return Err(ValidationError::AlreadyInFlight { stage });
        }

        match stage {
            Stage::Analyze => {
                if !self.has_file {
                    return Err(ValidationError::MissingFile);
                }
                if self.send_in_flight() {
                    return Err(self.unavailable(stage));
                }
            }
            Stage::SendAll | Stage::SendSelected => {
                if self.phase != Phase::Reviewing {
                    return Err(self.unavailable(stage));
                }
                let locked = match stage {
                    Stage::SendAll => true,
                    _ => self.policy == SendSelectedPolicy::Once,
                };
                if locked && self.completed[stage.slot()] {
                    return Err(ValidationError::AlreadyCompleted { stage });
                }
            }
        }

        Ok(())
    }

    /// 放行一次提交
    pub fn begin(&mut self, stage: Stage) -> Result<Ticket, ValidationError> {
        self.check(stage)?;

        if stage == Stage::Analyze {
            self.phase_before_analyze = self.phase;
            self.phase = Phase::Analyzing;
        }
        self.in_flight[stage.slot()] = true;

        debug!("[{}] 开始 → {}", stage, self.state());
        Ok(Ticket {
            stage,
            epoch: self.epoch,
        })
    }

    /// 提交结束（成功或失败）
    pub fn finish(&mut self, ticket: Ticket, ok: bool) -> Completion {
        if ticket.epoch != self.epoch {
            debug!(
                "[{}] 结果过期 (epoch {} ≠ {})，丢弃",
                ticket.stage, ticket.epoch, self.epoch
            );
            return Completion::Stale;
        }

        let slot = ticket.stage.slot();
        self.in_flight[slot] = false;

        match ticket.stage {
            Stage::Analyze => {
                self.phase = if ok {
                    Phase::Reviewing
                } else {
                    self.phase_before_analyze
                };
            }
            Stage::SendAll => {
                if ok {
                    self.completed[slot] = true;
                }
            }
            Stage::SendSelected => {
                self.completed[slot] = ok;
            }
        }

        debug!("[{}] 结束 (ok={}) → {}", ticket.stage, ok, self.state());
        Completion::Applied
    }

    pub fn state(&self) -> WorkflowState {
        match self.phase {
            Phase::Idle => WorkflowState::Idle,
            Phase::Analyzing => WorkflowState::Analyzing,
            Phase::Reviewing if self.in_flight[Stage::SendAll.slot()] => WorkflowState::SendingAll,
            Phase::Reviewing if self.in_flight[Stage::SendSelected.slot()] => {
                WorkflowState::SendingSelected
            }
            Phase::Reviewing => WorkflowState::Reviewing,
        }
    }

    /// 某个操作的界面状态
    pub fn action(&self, stage: Stage) -> ActionStatus {
        let slot = stage.slot();
        let label = if self.in_flight[slot] {
            ActionLabel::InProgress
        } else if self.completed[slot] {
            ActionLabel::Completed
        } else {
            ActionLabel::Ready
        };
        ActionStatus {
            enabled: self.check(stage).is_ok(),
            label,
        }
    }

    fn send_in_flight(&self) -> bool {
        self.in_flight[Stage::SendAll.slot()] || self.in_flight[Stage::SendSelected.slot()]
    }

    fn unavailable(&self, action: Stage) -> ValidationError {
        ValidationError::ActionUnavailable {
            action,
            state: self.state().to_string(),
        }
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new(SendSelectedPolicy::default())
    }
}
