//! 脚本化后端（用于测试，无需 API）
//!
//! 按顺序返回预置的回复或错误，脚本用完后回显 prompt；记录每次调用的 prompt 与配置包，
//! 便于断言「调用了哪个后端、调用几次、请求体是否变化」。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::llm::{Backend, BackendError, BackendFactory, BackendKind, GenerationConfig, Reply};

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub config: GenerationConfig,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ScriptedBackend {
    kind: BackendKind,
    script: Mutex<VecDeque<Result<Reply, BackendError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Reply) {
        lock(&self.script).push_back(Ok(reply));
    }

    pub fn push_error(&self, err: BackendError) {
        lock(&self.script).push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Reply, BackendError> {
        lock(&self.calls).push(RecordedCall {
            prompt: prompt.to_string(),
            config: config.clone(),
        });
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Ok(Reply::text(format!("Echo from {}: {}", self.kind.vendor(), prompt))))
    }
}

/// 工厂：始终交出同一对脚本化后端，并统计创建次数
pub struct ScriptedFactory {
    pub fast: Arc<ScriptedBackend>,
    pub deep: Arc<ScriptedBackend>,
    created: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            fast: Arc::new(ScriptedBackend::new(BackendKind::Fast)),
            deep: Arc::new(ScriptedBackend::new(BackendKind::Deep)),
            created: AtomicUsize::new(0),
        }
    }

    /// 工厂被要求创建后端句柄的次数
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for ScriptedFactory {
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn Backend>, BackendError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let backend: Arc<dyn Backend> = match kind {
            BackendKind::Fast => self.fast.clone(),
            BackendKind::Deep => self.deep.clone(),
        };
        Ok(backend)
    }
}
