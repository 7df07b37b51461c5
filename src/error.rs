use thiserror::Error;

use crate::models::Stage;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 本地校验失败（未发起网络请求）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 本地校验错误
///
/// 这类错误在发请求之前就被拒绝，状态机保持原状态
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 尚未选择文件
    #[error("请先选择要上传的文件")]
    MissingFile,
    /// 收件人地址不合法
    #[error("收件人地址不合法: {address}")]
    InvalidRecipient { address: String },
    /// 没有选中任何字段
    #[error("没有选中的项目")]
    NoSelection,
    /// 当前状态下该操作不可用
    #[error("当前状态 {state} 下无法执行 {action}")]
    ActionUnavailable { action: Stage, state: String },
    /// 同一阶段的请求仍在进行中
    #[error("{stage} 请求仍在进行中")]
    AlreadyInFlight { stage: Stage },
    /// 该阶段已完成，需要重新选择文件
    #[error("{stage} 已完成，请重新选择文件")]
    AlreadyCompleted { stage: Stage },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（没有收到响应）
    #[error("[{stage}] API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 收到响应，但状态码表示拒绝
    #[error("[{stage}] API返回错误响应 ({endpoint}): HTTP {status}")]
    BadResponse {
        endpoint: String,
        stage: Stage,
        status: u16,
        body: String,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值无法识别
    #[error("配置项 {key} 的值 '{value}' 无法识别")]
    InvalidValue { key: String, value: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound { path })
        } else {
            AppError::File(FileError::ReadFailed { path, source })
        }
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
