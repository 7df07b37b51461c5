//! 提交阶段
//!
//! 三个阶段分别对应三个互相独立的外部端点

use std::fmt;

/// 提交阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// 个人信息检查
    Analyze,
    /// 发送邮件（附带选中字段）
    SendAll,
    /// 只发送选中字段（标记服务）
    SendSelected,
}

impl Stage {
    /// 全部阶段，按流程顺序
    pub const ALL: [Stage; 3] = [Stage::Analyze, Stage::SendAll, Stage::SendSelected];

    /// 日志/诊断中使用的标签
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Analyze => "ANALYZE",
            Stage::SendAll => "SEND_MAIL",
            Stage::SendSelected => "SELECTED_INFO",
        }
    }

    pub(crate) fn slot(&self) -> usize {
        match self {
            Stage::Analyze => 0,
            Stage::SendAll => 1,
            Stage::SendSelected => 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
