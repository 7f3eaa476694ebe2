//! 单轮调度：AwaitingPrompt → Dispatching → Rendering → AwaitingPrompt
//!
//! 每轮只调用一个后端（按会话当前选择），不并发、不回退、不重试、无超时。
//! 两个后端的失败处理一致：捕获错误，记录日志，以占位文本作为助手回复写入对话记录，
//! 会话保持可用。

use crate::core::{LabError, Session};
use crate::llm::{BackendError, BackendKind, GenerationConfig};
use crate::transcript::Message;

/// 后端调用失败时写入对话记录的助手回复
pub const FAILED_TURN_REPLY: &str = "Error occurred.";

/// 一轮对话所处阶段
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    AwaitingPrompt,
    Dispatching(BackendKind),
    Rendering,
}

/// 一轮的结果；失败时带上原始错误供界面展示
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered { backend: BackendKind },
    Failed { backend: BackendKind, error: BackendError },
}

impl TurnOutcome {
    /// 面向用户的错误提示（如 "Gemini error: transport error: ..."）
    pub fn error_message(&self) -> Option<String> {
        match self {
            TurnOutcome::Answered { .. } => None,
            TurnOutcome::Failed { backend, error } => {
                Some(format!("{} error: {}", backend.vendor(), error))
            }
        }
    }
}

#[derive(Debug)]
pub struct DispatchController {
    generation: GenerationConfig,
    phase: TurnPhase,
}

impl DispatchController {
    pub fn new(generation: GenerationConfig) -> Self {
        Self {
            generation,
            phase: TurnPhase::AwaitingPrompt,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    fn enter(&mut self, phase: TurnPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Turn phase");
        self.phase = phase;
    }

    /// 处理一轮：追加用户消息，调用选中的后端，追加助手回复（或占位错误文本）
    ///
    /// 只有空白 prompt 返回 Err，且此时对话记录不变；后端失败体现在 `TurnOutcome::Failed`。
    pub async fn dispatch(
        &mut self,
        session: &mut Session,
        prompt: &str,
    ) -> Result<TurnOutcome, LabError> {
        if prompt.trim().is_empty() {
            return Err(LabError::EmptyPrompt);
        }

        let backend = session.selected_backend();
        session.append(Message::user(prompt));
        self.enter(TurnPhase::Dispatching(backend));

        let result = match session.backend(backend) {
            Ok(handle) => handle.generate(prompt, &self.generation).await,
            Err(e) => Err(e),
        };

        self.enter(TurnPhase::Rendering);
        let outcome = match result {
            Ok(reply) => {
                tracing::debug!(
                    %backend,
                    steps = reply.fragments().len().saturating_sub(1),
                    answer_chars = reply.final_text().chars().count(),
                    "Backend replied"
                );
                session.append(reply.into_message());
                TurnOutcome::Answered { backend }
            }
            Err(error) => {
                tracing::warn!(session = %session.id(), %backend, "Backend call failed: {}", error);
                session.append(Message::assistant(FAILED_TURN_REPLY));
                TurnOutcome::Failed { backend, error }
            }
        };

        self.enter(TurnPhase::AwaitingPrompt);
        Ok(outcome)
    }
}
