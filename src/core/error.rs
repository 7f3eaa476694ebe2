//! 应用错误类型
//!
//! 后端调用失败不在这里：它们由调度器捕获并替换为助手占位消息（见 dispatch），不会越过一轮对话。

use thiserror::Error;

use crate::documents::DocumentError;

#[derive(Error, Debug)]
pub enum LabError {
    /// 启动即终止：缺少后端凭证
    #[error("missing credentials: set {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    /// 空白 prompt 不发往任何后端
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("upload rejected: {0}")]
    Document(#[from] DocumentError),
}
