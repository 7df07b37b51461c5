//! 提交协调 - 业务能力层
//!
//! 为三个阶段构建表单、发送、并把结果统一成 `SubmitOutcome`

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::models::{FieldRecord, Stage, TransmitField, UploadContext};
use crate::services::diagnostics::{AttemptResult, DiagnosticSink};
use crate::services::transport::{FormPayload, Transport};

/// 表单字段名（与外部 webhook 的约定）
pub mod fields {
    pub const FILE: &str = "file";
    pub const ACTION: &str = "action";
    pub const TITLE: &str = "title";
    pub const UPLOADED_FILENAME: &str = "uploadedFilename";
    pub const UPLOADED_BASE_NAME: &str = "uploadedBaseName";
    pub const RECIPIENT: &str = "recipient";
    pub const SUBJECT: &str = "subject";
    pub const BODY: &str = "body";
    pub const REQUIRED_FIELDS: &str = "requiredFields";
    pub const SELECTED_FIELDS: &str = "selectedFields";
    pub const FILE_NAME: &str = "fileName";
}

/// 三个阶段各自的目标地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub analyze: String,
    pub send: String,
    pub select: String,
}

impl Endpoints {
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::Analyze => &self.analyze,
            Stage::SendAll => &self.send,
            Stage::SendSelected => &self.select,
        }
    }
}

/// 一次提交的结果
///
/// 传输失败（没有响应）和业务失败（非 2xx）都表现为 `ok == false`，
/// 传输失败时 `status` 为 0，`body` 为错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub ok: bool,
    pub status: u16,
    pub body: String,
}

/// 提交协调器
///
/// 职责：
/// - 按阶段构建表单
/// - 调用传输层，按配置重试传输失败
/// - 每一次尝试都写入诊断记录
/// - 不修改任何本地状态
pub struct SubmissionCoordinator<T> {
    transport: T,
    endpoints: Endpoints,
    diagnostics: Arc<DiagnosticSink>,
    max_retries: usize,
}

impl<T: Transport> SubmissionCoordinator<T> {
    pub fn new(transport: T, endpoints: Endpoints, diagnostics: Arc<DiagnosticSink>) -> Self {
        Self {
            transport,
            endpoints,
            diagnostics,
            max_retries: 0,
        }
    }

    /// 传输失败时的最大重试次数（业务失败不重试）
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticSink> {
        &self.diagnostics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 构建某个阶段的表单
    ///
    /// # 参数
    /// - `stage`: 提交阶段
    /// - `upload`: 当前上传的文件和元数据
    /// - `selection`: 触发时刻的字段快照，只有 `selected == true` 的会被发送
    pub fn build_payload(
        &self,
        stage: Stage,
        upload: &UploadContext,
        selection: &[FieldRecord],
    ) -> serde_json::Result<FormPayload> {
        let form = FormPayload::new().file(
            fields::FILE,
            upload.file_name.clone(),
            Arc::clone(&upload.bytes),
        );

        let form = match stage {
            Stage::Analyze => form
                .text(fields::ACTION, "analyze")
                .text(fields::TITLE, upload.title.clone())
                .text(fields::UPLOADED_FILENAME, upload.file_name.clone())
                .text(fields::UPLOADED_BASE_NAME, upload.base_name()),
            Stage::SendAll => form
                .text(fields::ACTION, "submit")
                .text(fields::UPLOADED_FILENAME, upload.file_name.clone())
                .text(fields::RECIPIENT, upload.recipient.clone())
                .text(fields::SUBJECT, upload.title.clone())
                .text(fields::BODY, upload.body.clone())
                .text(fields::REQUIRED_FIELDS, selected_json(selection)?),
            Stage::SendSelected => form
                .text(fields::FILE_NAME, upload.file_name.clone())
                .text(fields::SELECTED_FIELDS, selected_json(selection)?),
        };

        Ok(form)
    }

    /// 提交某个阶段
    ///
    /// 永远返回 `SubmitOutcome`，失败细节只进入诊断记录和日志
    pub async fn submit(
        &self,
        stage: Stage,
        upload: &UploadContext,
        selection: &[FieldRecord],
    ) -> SubmitOutcome {
        let endpoint = self.endpoints.for_stage(stage);

        let payload = match self.build_payload(stage, upload, selection) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[{}] 构建表单失败: {}", stage, e);
                self.diagnostics
                    .record(stage, endpoint, 0, 0, AttemptResult::TransportFailed, &e.to_string());
                return SubmitOutcome {
                    ok: false,
                    status: 0,
                    body: e.to_string(),
                };
            }
        };

        info!(
            "[{}] 📤 提交到 {} (文件: {}, {} 字节)",
            stage,
            endpoint,
            upload.file_name,
            upload.size()
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.post_form(endpoint, payload.clone()).await {
                Ok(response) => {
                    let ok = response.is_success();
                    let result = if ok {
                        AttemptResult::Accepted
                    } else {
                        AttemptResult::Rejected
                    };
                    self.diagnostics
                        .record(stage, endpoint, attempt, response.status, result, &response.body);
                    if !ok {
                        let rejection = ApiError::BadResponse {
                            endpoint: endpoint.to_string(),
                            stage,
                            status: response.status,
                            body: response.body.clone(),
                        };
                        warn!("{}", rejection);
                    }
                    return SubmitOutcome {
                        ok,
                        status: response.status,
                        body: response.body,
                    };
                }
                Err(source) => {
                    let failure = ApiError::RequestFailed {
                        endpoint: endpoint.to_string(),
                        stage,
                        source,
                    };
                    let detail = failure.to_string();
                    self.diagnostics.record(
                        stage,
                        endpoint,
                        attempt,
                        0,
                        AttemptResult::TransportFailed,
                        &detail,
                    );

                    if attempt > self.max_retries {
                        return SubmitOutcome {
                            ok: false,
                            status: 0,
                            body: detail,
                        };
                    }
                    debug!(
                        "[{}] 传输失败，重试 ({}/{})",
                        stage, attempt, self.max_retries
                    );
                }
            }
        }
    }
}

/// 选中字段的 JSON 数组（不含本地 `selected` 标记）
fn selected_json(selection: &[FieldRecord]) -> serde_json::Result<String> {
    let fields: Vec<TransmitField> = selection
        .iter()
        .filter(|r| r.selected)
        .map(FieldRecord::to_transmit)
        .collect();
    serde_json::to_string(&fields)
}
