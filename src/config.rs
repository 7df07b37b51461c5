use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, AppResult, ConfigError};
use crate::services::{Endpoints, ExtractStrategy};
use crate::workflow::SendSelectedPolicy;

/// 程序配置文件
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Webhook 地址 ---
    /// 个人信息检查
    pub analyze_url: String,
    /// 邮件发送
    pub send_url: String,
    /// 选中字段（标记服务）
    pub select_url: String,
    // --- 请求策略 ---
    /// 请求超时（秒），不设置表示一直等待
    pub request_timeout_secs: Option<u64>,
    /// 传输失败时的重试次数
    pub max_retries: usize,
    /// 选中字段发送成功后是否允许再次发送
    pub send_selected_policy: SendSelectedPolicy,
    /// 响应数组的提取策略
    pub extract_strategy: ExtractStrategy,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 诊断日志文件
    pub output_log_file: String,
    /// 内存中保留的诊断记录条数
    pub diagnostic_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analyze_url: "http://localhost:5678/webhook-test/analyze".to_string(),
            send_url: "http://localhost:5678/webhook/send".to_string(),
            select_url: "http://localhost:5678/webhook-test/choice".to_string(),
            request_timeout_secs: None,
            max_retries: 0,
            send_selected_policy: SendSelectedPolicy::Repeatable,
            extract_strategy: ExtractStrategy::Auto,
            verbose_logging: false,
            output_log_file: "diagnostics.log".to_string(),
            diagnostic_capacity: 64,
        }
    }
}

/// 加载结果：配置 + 加载过程中的警告
///
/// 加载发生在日志初始化之前，警告需要在 `logging::init` 之后用 `log_warnings` 输出
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("⚠️ {}", warning);
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> LoadedConfig {
        Self::default().overridden_by(|key| std::env::var(key).ok())
    }

    /// TOML 文件 + 环境变量（环境变量优先）
    pub fn from_toml_file(path: &Path) -> AppResult<LoadedConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.overridden_by(|key| std::env::var(key).ok()))
    }

    /// 用查找函数覆盖配置项（键为环境变量名）
    pub fn overridden_by(self, lookup: impl Fn(&str) -> Option<String>) -> LoadedConfig {
        let mut env = EnvOverrides {
            lookup: &lookup,
            warnings: Vec::new(),
        };
        let config = Self {
            analyze_url: env.text("ANALYZE_URL", self.analyze_url),
            send_url: env.text("SEND_URL", self.send_url),
            select_url: env.text("SELECT_URL", self.select_url),
            request_timeout_secs: env.optional("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            max_retries: env.parsed("MAX_RETRIES", self.max_retries),
            send_selected_policy: env.parsed("SEND_SELECTED_POLICY", self.send_selected_policy),
            extract_strategy: env.parsed("EXTRACT_STRATEGY", self.extract_strategy),
            verbose_logging: env.parsed("VERBOSE_LOGGING", self.verbose_logging),
            output_log_file: env.text("OUTPUT_LOG_FILE", self.output_log_file),
            diagnostic_capacity: env.parsed("DIAGNOSTIC_CAPACITY", self.diagnostic_capacity),
        };
        LoadedConfig {
            config,
            warnings: env.warnings,
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            analyze: self.analyze_url.clone(),
            send: self.send_url.clone(),
            select: self.select_url.clone(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// 按环境变量名查找覆盖值；无法解析的值记入警告，保留原值
struct EnvOverrides<'a, L> {
    lookup: &'a L,
    warnings: Vec<String>,
}

impl<L: Fn(&str) -> Option<String>> EnvOverrides<'_, L> {
    fn text(&self, key: &str, current: String) -> String {
        (self.lookup)(key).unwrap_or(current)
    }

    fn parsed<T: FromStr>(&mut self, key: &str, current: T) -> T {
        self.lookup_parsed(key).unwrap_or(current)
    }

    fn optional<T: FromStr>(&mut self, key: &str, current: Option<T>) -> Option<T> {
        self.lookup_parsed(key).or(current)
    }

    fn lookup_parsed<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let raw = (self.lookup)(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.warnings
                    .push(format!("环境变量 {} 的值 '{}' 无法解析，使用默认值", key, raw));
                None
            }
        }
    }
}
