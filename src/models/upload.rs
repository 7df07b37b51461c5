//! 上传上下文
//!
//! 当前选择的文件 + 用户填写的邮件信息

use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// 当前上传的文件及附带的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    /// 原始文件名（如 `tests.pdf`）
    pub file_name: String,
    /// 文件内容，多次提交之间共享
    pub bytes: Arc<[u8]>,
    /// 标题（也作为邮件主题）
    pub title: String,
    /// 收件人地址
    pub recipient: String,
    /// 邮件正文
    pub body: String,
}

impl UploadContext {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: Arc::from(bytes.into()),
            title: String::new(),
            recipient: String::new(),
            body: String::new(),
        }
    }

    /// 从磁盘读取文件
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// 去掉最后一个扩展名的文件名（`report.final.pdf` → `report.final`）
    ///
    /// 没有可去掉的扩展名时原样返回（`README`、`trailing.`）
    pub fn base_name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(dot)
                if dot + 1 < self.file_name.len() && !self.file_name[dot + 1..].contains('/') =>
            {
                &self.file_name[..dot]
            }
            _ => &self.file_name,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_last_extension() {
        let upload = UploadContext::new("report.final.pdf", vec![1, 2, 3]);
        assert_eq!(upload.base_name(), "report.final");
    }

    #[test]
    fn test_base_name_without_extension_keeps_name() {
        assert_eq!(UploadContext::new("README", Vec::new()).base_name(), "README");
        assert_eq!(UploadContext::new("trailing.", Vec::new()).base_name(), "trailing.");
        assert_eq!(UploadContext::new("a/b.dir/file", Vec::new()).base_name(), "a/b.dir/file");
        assert_eq!(UploadContext::new(".hidden", Vec::new()).base_name(), "");
    }

    #[tokio::test]
    async fn test_from_path_reads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let upload = UploadContext::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "tests.pdf");
        assert_eq!(&*upload.bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = UploadContext::from_path(Path::new("/nonexistent/x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(crate::error::FileError::NotFound { .. })));
    }
}
