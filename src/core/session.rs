//! 会话状态：对话记录、后端选择、上传文档、懒创建的后端句柄
//!
//! 每个连接的用户一个 Session，由该会话的运行时任务独占；没有进程级全局状态。
//! 重置会丢弃全部内容（包括已创建的后端句柄），回到初始空状态。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::documents::Document;
use crate::llm::{Backend, BackendError, BackendFactory, BackendKind};
use crate::transcript::{Message, Transcript};

/// 会话配置：选中的后端与上传的文档（按文件名去重）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub selected_backend: BackendKind,
    pub documents: BTreeMap<String, Document>,
}

impl SessionConfig {
    fn new(selected_backend: BackendKind) -> Self {
        Self {
            selected_backend,
            documents: BTreeMap::new(),
        }
    }
}

pub struct Session {
    id: Uuid,
    default_backend: BackendKind,
    transcript: Transcript,
    config: SessionConfig,
    handles: HashMap<BackendKind, Arc<dyn Backend>>,
    factory: Arc<dyn BackendFactory>,
}

impl Session {
    pub fn new(factory: Arc<dyn BackendFactory>, default_backend: BackendKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            default_backend,
            transcript: Transcript::new(),
            config: SessionConfig::new(default_backend),
            handles: HashMap::new(),
            factory,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn selected_backend(&self) -> BackendKind {
        self.config.selected_backend
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.config.documents.values()
    }

    /// 丢弃对话、配置与后端句柄；连续调用结果相同
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.config = SessionConfig::new(self.default_backend);
        self.handles.clear();
        tracing::info!(session = %self.id, "Session reset");
    }

    pub fn append(&mut self, message: Message) {
        self.transcript.push(message);
    }

    /// 只影响下一次调度，已有消息不变
    pub fn select_backend(&mut self, choice: BackendKind) {
        if self.config.selected_backend != choice {
            tracing::info!(session = %self.id, backend = %choice, "Backend selected");
        }
        self.config.selected_backend = choice;
    }

    /// 同名文档覆盖旧版本
    pub fn upload_document(&mut self, doc: Document) {
        self.config.documents.insert(doc.name().to_string(), doc);
    }

    /// 取后端句柄：首次使用时通过工厂创建并缓存，直到重置
    pub fn backend(&mut self, kind: BackendKind) -> Result<Arc<dyn Backend>, BackendError> {
        if let Some(handle) = self.handles.get(&kind) {
            return Ok(handle.clone());
        }
        let handle = self.factory.create(kind)?;
        self.handles.insert(kind, handle.clone());
        Ok(handle)
    }

    /// 本会话已创建句柄的累计 token 数
    pub fn total_tokens(&self) -> u64 {
        self.handles.values().map(|h| h.token_usage().2).sum()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transcript_len", &self.transcript.len())
            .field("selected_backend", &self.config.selected_backend)
            .field("documents", &self.config.documents.len())
            .field("handles", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}
