//! 会话运行时集成测试：通过命令通道驱动，脚本化后端代替真实 API

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use hypolab::core::{spawn_session, Command, UiState, FAILED_TURN_REPLY};
use hypolab::llm::{BackendError, BackendKind, Fragment, GenerationConfig, Reply, ScriptedFactory};
use hypolab::transcript::Role;
use hypolab::ui::{segments, Segment};
use tokio::sync::{mpsc, watch};

type Harness = (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<UiState>,
    Arc<ScriptedFactory>,
);

fn start(default: BackendKind) -> Harness {
    let factory = Arc::new(ScriptedFactory::new());
    let (tx, rx) = spawn_session(
        factory.clone(),
        GenerationConfig::research("Be precise."),
        default,
    );
    (tx, rx, factory)
}

async fn wait_until<F>(rx: &mut watch::Receiver<UiState>, pred: F) -> UiState
where
    F: FnMut(&UiState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session state")
        .expect("session task ended")
        .clone()
}

fn idle_with(len: usize) -> impl FnMut(&UiState) -> bool {
    move |s| !s.input_locked && s.history.len() == len
}

#[tokio::test]
async fn test_fast_prompt_round_trip() {
    let (tx, mut rx, factory) = start(BackendKind::Fast);
    factory.fast.push_reply(Reply::text("4"));

    tx.send(Command::Submit("What is 2+2?".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(2)).await;

    assert_eq!(state.history[0].role(), Role::User);
    assert_eq!(state.history[1].content(), "4");
    assert!(state.error_message.is_none());
    assert_eq!(factory.fast.call_count(), 1);
    assert_eq!(factory.deep.call_count(), 0);
}

#[tokio::test]
async fn test_deep_prompt_renders_steps_in_order() {
    let (tx, mut rx, factory) = start(BackendKind::Deep);
    factory.deep.push_reply(Reply::new(
        vec![
            Fragment::Reasoning("Sample x over one period.".into()),
            Fragment::Code {
                code: "plt.plot(x, np.sin(x))".into(),
                language: "python".into(),
            },
        ],
        "Plotted.",
    ));

    tx.send(Command::Submit("Plot sin(x)".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(2)).await;

    let reply = &state.history[1];
    assert_eq!(reply.content(), "Plotted.");
    assert_eq!(
        segments(reply),
        vec![
            Segment::Reasoning("Sample x over one period."),
            Segment::Code {
                language: "python",
                code: "plt.plot(x, np.sin(x))",
            },
            Segment::Body("Plotted."),
        ]
    );
}

#[tokio::test]
async fn test_deep_failure_keeps_session_usable() {
    let (tx, mut rx, factory) = start(BackendKind::Deep);
    factory
        .deep
        .push_error(BackendError::Transport("dns error".into()));

    tx.send(Command::Submit("Plot sin(x)".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(2)).await;
    assert_eq!(state.history[1].content(), FAILED_TURN_REPLY);
    assert_eq!(
        state.error_message.as_deref(),
        Some("Gemini error: transport error: dns error")
    );

    tx.send(Command::Submit("Try again".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(4)).await;
    assert!(state.error_message.is_none());
    assert_eq!(state.history[3].content(), "Echo from Gemini: Try again");
}

#[tokio::test]
async fn test_switching_backend_leaves_history_untouched() {
    let (tx, mut rx, factory) = start(BackendKind::Fast);

    tx.send(Command::Submit("first".into())).unwrap();
    let before = wait_until(&mut rx, idle_with(2)).await.history;

    tx.send(Command::ToggleBackend).unwrap();
    let state = wait_until(&mut rx, |s| s.selected_backend == BackendKind::Deep).await;
    assert_eq!(state.history, before);

    tx.send(Command::Submit("second".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(4)).await;
    assert_eq!(&state.history[..2], before.as_slice());
    assert_eq!(factory.fast.call_count(), 1);
    assert_eq!(factory.deep.call_count(), 1);
    assert_eq!(state.history[3].content(), "Echo from Gemini: second");
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let (tx, mut rx, factory) = start(BackendKind::Fast);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"%PDF-1.5\n")
        .unwrap();

    tx.send(Command::Upload(path)).unwrap();
    tx.send(Command::SelectBackend(BackendKind::Deep)).unwrap();
    tx.send(Command::Submit("hello".into())).unwrap();
    let state = wait_until(&mut rx, idle_with(2)).await;
    let names: Vec<&str> = state.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["notes.pdf"]);
    assert_eq!(factory.created(), 1);

    tx.send(Command::Reset).unwrap();
    tx.send(Command::Reset).unwrap();
    let state = wait_until(&mut rx, |s| s.history.is_empty()).await;
    assert!(state.documents.is_empty());
    assert_eq!(state.selected_backend, BackendKind::Fast);

    tx.send(Command::Submit("after reset".into())).unwrap();
    wait_until(&mut rx, idle_with(2)).await;
    assert_eq!(factory.created(), 2, "handles are recreated after reset");
}

#[tokio::test]
async fn test_rejected_upload_reports_error() {
    let (tx, mut rx, _factory) = start(BackendKind::Fast);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    tx.send(Command::Upload(path)).unwrap();
    let state = wait_until(&mut rx, |s| s.error_message.is_some()).await;
    assert!(state.error_message.unwrap().contains("not a PDF"));
    assert!(state.documents.is_empty());
    assert!(state.history.is_empty());
}
