//! HTTP 传输 - 基础设施层
//!
//! 只暴露"把表单 POST 到某个地址"的能力，不认识字段、不认识阶段

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

/// 传输层错误（没有收到任何响应）
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// 表单中的单个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Arc<[u8]>,
    },
}

/// 待发送的 multipart 表单
///
/// 与 reqwest 的 `Form` 分开定义，便于在测试中检查请求内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Arc<[u8]>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    /// 按名称查找文本字段
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// 按名称查找文件字段，返回 (文件名, 内容)
    pub fn file_part(&self, name: &str) -> Option<(&str, &[u8])> {
        self.parts.iter().find_map(|p| match p {
            FormPart::File {
                name: n,
                file_name,
                bytes,
            } if n == name => Some((file_name.as_str(), &bytes[..])),
            _ => None,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .map(|p| match p {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    fn into_multipart(self) -> Form {
        self.parts.into_iter().fold(Form::new(), |form, part| match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                file_name,
                bytes,
            } => form.part(name, Part::bytes(bytes.to_vec()).file_name(file_name)),
        })
    }
}

/// 收到的 HTTP 响应（任意状态码）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 表单传输能力
///
/// 返回 `Err` 仅表示没有收到响应；收到的任何状态码都是 `Ok`
pub trait Transport: Send + Sync {
    fn post_form(
        &self,
        url: &str,
        form: FormPayload,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 创建传输对象
    ///
    /// # 参数
    /// - `timeout`: 整个请求的超时时间，`None` 表示不设超时
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        form: FormPayload,
    ) -> Result<TransportResponse, TransportError> {
        debug!("POST {} 字段: {:?}", url, form.names());

        let response = self
            .client
            .post(url)
            .multipart(form.into_multipart())
            .send()
            .await?;

        // 状态码已到达即算收到响应，正文读取失败只记警告
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("POST {} 已收到 HTTP {}，但读取响应正文失败: {}", url, status, e);
                String::new()
            }
        };

        Ok(TransportResponse { status, body })
    }
}
