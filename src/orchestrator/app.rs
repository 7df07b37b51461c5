//! 控制台会话 - 编排层
//!
//! ## 职责
//!
//! 代替网页界面驱动一次完整流程：
//!
//! 1. **应用初始化**：日志文件、诊断记录、HTTP 传输、工作流
//! 2. **选择文件**：读取文件并填写标题 / 收件人 / 正文
//! 3. **检查**：提交检查请求并打印检测到的字段
//! 4. **调整选择**：按计划取消部分字段
//! 5. **发送**：发送邮件和/或只发送选中字段
//! 6. **统计输出**：打印每个阶段的结果和诊断记录

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{Stage, UploadContext};
use crate::services::{
    DiagnosticSink, HttpTransport, ResponseArrayExtractor, SubmissionCoordinator,
};
use crate::utils::logging::{init_log_file, log_startup, truncate_text};
use crate::workflow::{Command, CommandOutcome, Workflow};

/// 检查完成后要执行的发送
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// 只检查，不发送
    None,
    All,
    Selected,
    Both,
}

impl SendMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "all" | "mail" => Some(Self::All),
            "selected" | "choice" => Some(Self::Selected),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    fn stages(&self) -> &'static [Stage] {
        match self {
            SendMode::None => &[],
            SendMode::All => &[Stage::SendAll],
            SendMode::Selected => &[Stage::SendSelected],
            SendMode::Both => &[Stage::SendSelected, Stage::SendAll],
        }
    }
}

/// 一次会话的输入
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub file: PathBuf,
    pub title: String,
    pub recipient: String,
    pub body: String,
    /// 检查后要取消选择的字段索引
    pub deselect: Vec<usize>,
    pub send_mode: SendMode,
}

impl SessionPlan {
    /// 从命令行参数和环境变量读取
    ///
    /// 第一个参数为文件路径（也可用 `UPLOAD_FILE`），其余来自
    /// `MAIL_TITLE` / `MAIL_RECIPIENT` / `MAIL_BODY` / `DESELECT` / `SEND_MODE`
    pub fn from_args_and_env(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let file = args
            .next()
            .or_else(|| std::env::var("UPLOAD_FILE").ok())
            .context("缺少文件路径：请作为第一个参数传入或设置 UPLOAD_FILE")?;

        let env = |key: &str| std::env::var(key).unwrap_or_default();
        let send_mode_raw = env("SEND_MODE");
        let send_mode = SendMode::parse(&send_mode_raw)
            .with_context(|| format!("无法识别的 SEND_MODE: {}", send_mode_raw))?;

        Ok(Self {
            file: PathBuf::from(file),
            title: env("MAIL_TITLE"),
            recipient: env("MAIL_RECIPIENT"),
            body: env("MAIL_BODY"),
            deselect: parse_indices(&env("DESELECT")),
            send_mode,
        })
    }
}

/// 解析逗号分隔的索引列表，非法项忽略
fn parse_indices(raw: &str) -> Vec<usize> {
    raw.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.parse() {
                Ok(i) => Some(i),
                Err(_) => {
                    warn!("忽略无法解析的索引: {}", s);
                    None
                }
            }
        })
        .collect()
}

/// 会话统计
#[derive(Debug, Default)]
pub struct SessionStats {
    pub detected: usize,
    pub selected: usize,
    pub sent: Vec<Stage>,
    pub failed: Vec<Stage>,
}

/// 应用主结构
pub struct App {
    config: Config,
    workflow: Workflow<HttpTransport>,
    diagnostics: Arc<DiagnosticSink>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config.analyze_url, &config.send_url, &config.select_url);

        let diagnostics = Arc::new(DiagnosticSink::with_log_file(
            config.diagnostic_capacity,
            &config.output_log_file,
        ));

        let transport = HttpTransport::new(config.request_timeout())
            .map_err(|e| anyhow::anyhow!("创建 HTTP 客户端失败: {}", e))?;

        let coordinator =
            SubmissionCoordinator::new(transport, config.endpoints(), Arc::clone(&diagnostics))
                .with_max_retries(config.max_retries);

        let workflow = Workflow::new(
            coordinator,
            ResponseArrayExtractor::new(config.extract_strategy),
            config.send_selected_policy,
        );

        Ok(Self {
            config,
            workflow,
            diagnostics,
        })
    }

    /// 运行一次会话
    pub async fn run(&self, plan: SessionPlan) -> Result<SessionStats> {
        let mut stats = SessionStats::default();

        let upload = UploadContext::from_path(&plan.file)
            .await
            .with_context(|| format!("无法读取上传文件: {}", plan.file.display()))?
            .with_title(plan.title)
            .with_recipient(plan.recipient)
            .with_body(plan.body);

        self.workflow.dispatch(Command::SelectFile(upload)).await?;

        // ========== 检查 ==========
        match self.workflow.submit(Stage::Analyze).await? {
            CommandOutcome::FieldsDetected { count } => stats.detected = count,
            CommandOutcome::NoFieldsDetected => info!("未检测到个人信息"),
            CommandOutcome::StageFailed { status, body, .. } => {
                warn!(
                    "个人信息检查失败 (HTTP {}): {}",
                    status,
                    truncate_text(&body, 120)
                );
                stats.failed.push(Stage::Analyze);
                self.print_summary(&stats);
                return Ok(stats);
            }
            other => warn!("检查返回了意外结果: {:?}", other),
        }

        // ========== 调整选择 ==========
        for index in &plan.deselect {
            let outcome = self
                .workflow
                .dispatch(Command::Toggle {
                    index: *index,
                    selected: false,
                })
                .await?;
            if outcome == (CommandOutcome::Toggled { applied: false }) {
                warn!("索引 {} 超出范围，已忽略", index);
            }
        }
        self.print_fields();

        // ========== 发送 ==========
        for stage in plan.send_mode.stages() {
            match self.workflow.submit(*stage).await {
                Ok(CommandOutcome::Sent { .. }) => stats.sent.push(*stage),
                Ok(CommandOutcome::StageFailed { .. }) => stats.failed.push(*stage),
                Ok(other) => warn!("[{}] 意外结果: {:?}", stage, other),
                Err(e) => {
                    warn!("[{}] ⚠️ {}", stage, e);
                    stats.failed.push(*stage);
                }
            }
        }

        stats.selected = self
            .workflow
            .views()
            .iter()
            .filter(|v| v.selected)
            .count();

        self.print_summary(&stats);
        Ok(stats)
    }

    fn print_fields(&self) {
        let views = self.workflow.views();
        if views.is_empty() {
            info!("没有检测到任何项目");
            return;
        }
        for view in views {
            info!(
                "  [{}] {} {}: {}",
                if view.selected { "x" } else { " " },
                view.index,
                view.type_label,
                view.value
            );
        }
    }

    fn print_summary(&self, stats: &SessionStats) {
        info!("\n{}", "=".repeat(60));
        info!("📊 会话完成统计");
        info!("{}", "=".repeat(60));
        info!("🔍 检测字段: {} (选中 {})", stats.detected, stats.selected);
        info!("✅ 成功: {:?}", stats.sent);
        info!("❌ 失败: {:?}", stats.failed);
        for stage in Stage::ALL {
            let action = self.workflow.action(stage);
            info!("   {} → {:?} (可用: {})", stage, action.label, action.enabled);
        }
        info!("📝 诊断记录 {} 条", self.diagnostics.len());
        info!("{}", "=".repeat(60));
        info!("\n日志已保存至: {}", self.config.output_log_file);
    }
}
