//! # Privacy Mail Submit
//!
//! 上传文档 → 外部服务检查个人信息 → 用户调整检测到的字段 → 发送邮件 / 只发送选中字段
//!
//! ## 架构设计
//!
//! ### ① 基础设施层
//! - `services::transport` - 只暴露"POST 一个 multipart 表单"的能力
//!
//! ### ② 业务能力层（Services）
//! - `ResponseArrayExtractor` - 从不规整的响应文本中提取字段
//! - `SelectionStore` - 字段列表 + 选择状态
//! - `SubmissionCoordinator` - 按阶段构建表单并提交
//! - `DiagnosticSink` - 记录每一次外部调用
//!
//! ### ③ 流程层（Workflow）
//! - `WorkflowStateMachine` - 决定哪些操作可用
//! - `WorkflowContext` - 当前上传的全部状态
//! - `Workflow` - 命令分发（Toggle / Submit ...）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 控制台会话
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, LoadedConfig};
pub use error::{AppError, AppResult, ValidationError};
pub use models::{FieldRecord, Position, Stage, TransmitField, UploadContext};
pub use orchestrator::App;
pub use services::{
    DiagnosticSink, ExtractStrategy, HttpTransport, ResponseArrayExtractor, SelectionStore,
    SubmissionCoordinator, SubmitOutcome, Transport,
};
pub use workflow::{
    Command, CommandOutcome, SendSelectedPolicy, Workflow, WorkflowContext, WorkflowState,
    WorkflowStateMachine,
};
