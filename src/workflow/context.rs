//! 工作流上下文
//!
//! 当前上传相关的全部可变状态都放在这里，由调用方持有

use crate::models::{FieldRecord, Stage, UploadContext};
use crate::services::SelectionStore;
use crate::workflow::machine::{SendSelectedPolicy, WorkflowStateMachine};

/// 工作流上下文
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub upload: Option<UploadContext>,
    pub store: SelectionStore,
    pub machine: WorkflowStateMachine,
}

/// 触发提交时拍下的快照
///
/// 进行中的请求只使用快照，之后的切换只影响下一次提交
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub stage: Stage,
    pub upload: UploadContext,
    pub records: Vec<FieldRecord>,
}

impl WorkflowContext {
    pub fn new(policy: SendSelectedPolicy) -> Self {
        Self {
            upload: None,
            store: SelectionStore::new(),
            machine: WorkflowStateMachine::new(policy),
        }
    }

    /// 更换文件：字段列表清空，状态机回到初始状态
    pub fn replace_upload(&mut self, upload: UploadContext) {
        self.upload = Some(upload);
        self.store.clear();
        self.machine.select_file();
    }

    /// 只修改标题/收件人/正文，不影响检测结果
    pub fn update_metadata(&mut self, title: String, recipient: String, body: String) -> bool {
        match self.upload.as_mut() {
            Some(upload) => {
                upload.title = title;
                upload.recipient = recipient;
                upload.body = body;
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self, stage: Stage) -> Option<SubmissionSnapshot> {
        Some(SubmissionSnapshot {
            stage,
            upload: self.upload.clone()?,
            records: self.store.records().to_vec(),
        })
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new(SendSelectedPolicy::default())
    }
}
