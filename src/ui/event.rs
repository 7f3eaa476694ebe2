//! 事件处理
//!
//! 轮询 crossterm 键盘事件：Ctrl+B 切换后端、Ctrl+R 重置、Ctrl+Q 退出直接转为 Command；
//! 其余按键交给 run_app 拼 input_buffer，Enter 时 send_input 解析斜杠命令或作为 prompt 提交。

use std::path::PathBuf;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;
use crate::llm::BackendKind;

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 把输入框内容解析为命令序列
///
/// `/fast` `/deep` 后面跟文本时先切换后端再提交该文本；`/reset` `/quit` 只在单独出现时生效，
/// 后面带其他内容则整行作为 prompt；`/upload <path>` 必须带路径。空白输入返回空序列。
pub fn parse_input(input: &str) -> Vec<Command> {
    let input = input.trim();
    if input.is_empty() {
        return Vec::new();
    }
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    let select = match head.to_lowercase().as_str() {
        "/fast" => Some(BackendKind::Fast),
        "/deep" => Some(BackendKind::Deep),
        "/reset" if rest.is_empty() => return vec![Command::Reset],
        "/quit" | "/exit" if rest.is_empty() => return vec![Command::Quit],
        "/upload" if !rest.is_empty() => return vec![Command::Upload(PathBuf::from(rest))],
        _ => None,
    };
    match select {
        Some(kind) if rest.is_empty() => vec![Command::SelectBackend(kind)],
        Some(kind) => vec![Command::SelectBackend(kind), Command::Submit(rest.to_string())],
        None => vec![Command::Submit(input.to_string())],
    }
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘并返回 AppEvent
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(self.handle_key(key)));
                }
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent) -> AppEvent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('b') if ctrl => AppEvent::Command(Command::ToggleBackend),
            KeyCode::Char('r') if ctrl => AppEvent::Command(Command::Reset),
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => AppEvent::Command(Command::Quit),
            _ => AppEvent::Key(key),
        }
    }

    pub fn send(&self, cmd: Command) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// 解析并按顺序发送输入；返回 true 表示用户要求退出
    pub fn send_input(&self, input: &str) -> bool {
        for cmd in parse_input(input) {
            if cmd == Command::Quit {
                return true;
            }
            self.send(cmd);
        }
        false
    }
}
