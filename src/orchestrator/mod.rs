//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有配置、传输和诊断记录，把一次会话交给工作流执行。
//! 本层不做业务判断，只做调度和统计。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (一次会话)
//!     ↓
//! workflow::Workflow (命令分发 + 状态机)
//!     ↓
//! services (能力层：extract / selection / coordinator / diagnostics)
//!     ↓
//! services::transport (基础设施：HttpTransport)
//! ```

pub mod app;

pub use app::{App, SendMode, SessionPlan, SessionStats};
