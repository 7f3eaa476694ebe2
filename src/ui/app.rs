//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将用户输入与快捷键转为 Command 发送给会话运行时，
//! 每帧用 draw 渲染 UiState 与输入缓冲。调度期间（input_locked）只响应快捷键，不接受提交。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, UiState};
use crate::llm::BackendKind;
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::{draw, InputFocus, InputState};

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    app_name: &str,
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app_name, state_rx, cmd_tx).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app_name: &str,
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    let event_handler = EventHandler::new(cmd_tx);
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut last_history_len = 0usize;
    let mut input_state = InputState::default();

    loop {
        let state = state_rx.borrow().clone();

        let shown = state.history.len() + usize::from(state.pending_prompt.is_some());
        if shown != last_history_len {
            last_history_len = shown;
            conversation_scroll = usize::MAX;
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                // 重置与切换在调度中也排队发送，运行时会在本轮结束后处理
                AppEvent::Command(cmd) => event_handler.send(cmd),
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter if !state.input_locked => {
                        if input_state.focus == InputFocus::Input {
                            let input = std::mem::take(&mut input_buffer);
                            if event_handler.send_input(&input) {
                                break;
                            }
                        }
                    }
                    KeyCode::Tab | KeyCode::BackTab => {
                        input_state.focus = match input_state.focus {
                            InputFocus::Input => InputFocus::Backend,
                            InputFocus::Backend => InputFocus::Input,
                        };
                    }
                    KeyCode::Backspace if input_state.focus == InputFocus::Input => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) if input_state.focus == InputFocus::Input => {
                        input_buffer.push(c);
                    }
                    KeyCode::Up | KeyCode::Left if input_state.focus == InputFocus::Backend => {
                        event_handler.send(Command::SelectBackend(BackendKind::Fast));
                    }
                    KeyCode::Down | KeyCode::Right if input_state.focus == InputFocus::Backend => {
                        event_handler.send(Command::SelectBackend(BackendKind::Deep));
                    }
                    KeyCode::Up => {
                        conversation_scroll = conversation_scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        conversation_scroll = conversation_scroll.saturating_add(1);
                    }
                    KeyCode::PageUp => {
                        conversation_scroll = conversation_scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        conversation_scroll = conversation_scroll.saturating_add(10);
                    }
                    KeyCode::Home => {
                        conversation_scroll = 0;
                    }
                    KeyCode::End => {
                        conversation_scroll = usize::MAX;
                    }
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(
                f,
                app_name,
                &state,
                &input_buffer,
                conversation_scroll,
                &mut scroll_info,
                &input_state,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        conversation_scroll = conversation_scroll.min(max_scroll);

        tokio::task::yield_now().await;
    }

    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
