//! 会话运行时：每个会话一个后台任务
//!
//! 建立 cmd/state 两通道：UI → 运行时发送 Command；运行时 → UI 推送 UiState 快照。
//! 命令逐条处理，一个 prompt 处理完（后端返回或失败）才会处理下一条命令。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::config::{AppConfig, Credentials};
use crate::core::{DispatchController, LabError, Session, TurnPhase, UiState};
use crate::documents::load_pdf;
use crate::llm::{BackendFactory, BackendKind, GenerationConfig, ProviderFactory};

/// 从 UI 发往会话运行时的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 提交研究问题，触发一轮调度
    Submit(String),
    /// 选择后端（下一轮生效）
    SelectBackend(BackendKind),
    /// 在两个后端之间切换
    ToggleBackend,
    /// 上传 PDF（只保存，不处理）
    Upload(PathBuf),
    /// 清空全部会话状态
    Reset,
    /// 结束会话
    Quit,
}

/// 用真实后端创建会话：凭证只读共享，模型与端点来自配置
pub fn create_session(
    cfg: &AppConfig,
    credentials: Arc<Credentials>,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let factory = Arc::new(ProviderFactory::new(cfg.llm.clone(), credentials));
    let generation = GenerationConfig::research(cfg.llm.deep.system_instruction.clone());
    spawn_session(factory, generation, cfg.app.default_backend)
}

/// 启动会话任务：返回命令发送端、状态接收端；命令通道关闭或收到 Quit 时任务结束
pub fn spawn_session(
    factory: Arc<dyn BackendFactory>,
    generation: GenerationConfig,
    default_backend: BackendKind,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let mut session = Session::new(factory, default_backend);
    let mut controller = DispatchController::new(generation);

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::project(
        &session,
        TurnPhase::AwaitingPrompt,
        None,
    ));

    let span = tracing::info_span!("session", id = %session.id());
    tokio::spawn(
        async move {
            tracing::info!("Session started");
            while let Some(cmd) = cmd_rx.recv().await {
                let error_message = match cmd {
                    Command::Submit(prompt) => {
                        let backend = session.selected_backend();
                        let _ = state_tx.send(
                            UiState::project(&session, TurnPhase::Dispatching(backend), None)
                                .with_pending(prompt.clone()),
                        );
                        match controller.dispatch(&mut session, &prompt).await {
                            Ok(outcome) => outcome.error_message(),
                            Err(e) => Some(e.to_string()),
                        }
                    }
                    Command::SelectBackend(kind) => {
                        session.select_backend(kind);
                        None
                    }
                    Command::ToggleBackend => {
                        session.select_backend(session.selected_backend().toggled());
                        None
                    }
                    Command::Upload(path) => match load_pdf(&path).await {
                        Ok(doc) => {
                            session.upload_document(doc);
                            None
                        }
                        Err(e) => {
                            let e = LabError::from(e);
                            tracing::warn!("{}", e);
                            Some(e.to_string())
                        }
                    },
                    Command::Reset => {
                        session.reset();
                        None
                    }
                    Command::Quit => break,
                };
                let _ = state_tx.send(UiState::project(
                    &session,
                    TurnPhase::AwaitingPrompt,
                    error_message,
                ));
            }
            tracing::info!("Session closed");
        }
        .instrument(span),
    );

    (cmd_tx, state_rx)
}
