//! UI 状态投影
//!
//! UI 只持有轻量的 UiState 快照（阶段、历史、后端选择、文档名、锁、错误）；
//! 完整状态由会话运行时维护，每次变化后投影一次。

use chrono::{DateTime, Utc};

use crate::core::{Session, TurnPhase};
use crate::documents::Document;
use crate::llm::BackendKind;
use crate::transcript::Message;

/// 文档栏的一项：文件名与上传时间
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentEntry {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentEntry {
    fn from(doc: &Document) -> Self {
        Self {
            name: doc.name().to_string(),
            uploaded_at: doc.uploaded_at(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub phase: TurnPhase,
    pub history: Vec<Message>,
    /// 已提交、尚未得到回复的 prompt（调度期间先行显示）
    pub pending_prompt: Option<String>,
    pub selected_backend: BackendKind,
    pub documents: Vec<DocumentEntry>,
    /// 调度中禁止提交
    pub input_locked: bool,
    pub error_message: Option<String>,
    pub total_tokens: u64,
}

impl UiState {
    pub fn project(session: &Session, phase: TurnPhase, error_message: Option<String>) -> Self {
        Self {
            phase,
            history: session.transcript().messages().to_vec(),
            pending_prompt: None,
            selected_backend: session.selected_backend(),
            documents: session.documents().map(DocumentEntry::from).collect(),
            input_locked: phase != TurnPhase::AwaitingPrompt,
            error_message,
            total_tokens: session.total_tokens(),
        }
    }

    pub fn with_pending(mut self, prompt: impl Into<String>) -> Self {
        self.pending_prompt = Some(prompt.into());
        self
    }
}
