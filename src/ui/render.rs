//! 界面渲染
//!
//! 根据 UiState 与 input_buffer 绘制：标题栏显示阶段与 token 数；主体为对话历史，
//! 助手消息先按顺序显示推理与代码片段，再显示正文；底部为后端选择器、文档列表与输入框。

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::{TurnPhase, UiState};
use crate::llm::BackendKind;
use crate::transcript::{Message, PartKind, Role};

/// 输入区焦点
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFocus {
    #[default]
    Input,
    Backend,
}

#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub focus: InputFocus,
}

/// 一条消息的显示片段，按显示顺序排列
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Reasoning(&'a str),
    Code { language: &'a str, code: &'a str },
    Body(&'a str),
}

/// 推理 / 代码片段在前（保持后端返回顺序），正文在后
pub fn segments(message: &Message) -> Vec<Segment<'_>> {
    let mut out: Vec<Segment<'_>> = message
        .parts()
        .iter()
        .map(|p| match p.kind {
            PartKind::Reasoning => Segment::Reasoning(&p.payload),
            PartKind::Code => Segment::Code {
                language: p.language.as_deref().unwrap_or("python"),
                code: &p.payload,
            },
        })
        .collect();
    out.push(Segment::Body(message.content()));
    out
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn push_wrapped(
    out: &mut Vec<Line<'static>>,
    prefix: &'static str,
    prefix_style: Style,
    text: &str,
    text_style: Style,
    width: usize,
) {
    for (i, line) in wrap_text(text, width).into_iter().enumerate() {
        let pref = if i == 0 { prefix } else { "    " };
        out.push(Line::from(vec![
            Span::styled(pref, prefix_style),
            Span::styled(line, text_style),
        ]));
    }
}

fn message_lines(out: &mut Vec<Line<'static>>, message: &Message, width: usize) {
    let (prefix, color) = match message.role() {
        Role::User => ("You ", Color::Cyan),
        Role::Assistant => ("Lab ", Color::Green),
    };
    let bold = Style::default().fg(color).add_modifier(Modifier::BOLD);
    for segment in segments(message) {
        match segment {
            Segment::Reasoning(text) => push_wrapped(
                out,
                "    ",
                bold,
                &format!("Reasoning: {text}"),
                Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC),
                width,
            ),
            Segment::Code { language, code } => {
                out.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(format!("```{language}"), Style::default().fg(Color::DarkGray)),
                ]));
                push_wrapped(out, "    ", bold, code, Style::default().fg(Color::Yellow), width);
                out.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled("```", Style::default().fg(Color::DarkGray)),
                ]));
            }
            Segment::Body(text) => push_wrapped(out, prefix, bold, text, Style::default(), width),
        }
    }
}

/// Paragraph 的滚动行号是 u16，超出时停在最大值
fn scroll_row(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn busy_label(phase: TurnPhase) -> String {
    match phase {
        TurnPhase::AwaitingPrompt => "空闲".to_string(),
        TurnPhase::Dispatching(BackendKind::Fast) => "Groq 思考中…".to_string(),
        TurnPhase::Dispatching(BackendKind::Deep) => "Gemini 检索研究中…".to_string(),
        TurnPhase::Rendering => "渲染中…".to_string(),
    }
}

/// 绘制一帧：上方对话区，中间后端选择器与文档，下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    app_name: &str,
    state: &UiState,
    input_buffer: &str,
    conversation_scroll: usize,
    out: &mut (usize, usize),
    input_state: &InputState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(5),
        ])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let title = format!(
        " {} │ {} │ tokens {} ",
        app_name,
        busy_label(state.phase),
        state.total_tokens
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, m) in state.history.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        message_lines(&mut text_lines, m, content_width.max(40));
    }
    if let Some(prompt) = &state.pending_prompt {
        if !text_lines.is_empty() {
            text_lines.push(Line::from(Span::raw("")));
        }
        message_lines(&mut text_lines, &Message::user(prompt.as_str()), content_width.max(40));
        text_lines.push(Line::from(Span::styled(
            format!("    {}", busy_label(state.phase)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_row(scroll_offset), 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, conv_area, &mut scrollbar_state);
    }

    // 后端选择器 + 文档列表
    let mut selector: Vec<Span> = vec![Span::raw(" 引擎: ")];
    for kind in BackendKind::ALL {
        let selected = kind == state.selected_backend;
        let marker = if selected { "◉ " } else { "○ " };
        let style = if selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        selector.push(Span::styled(format!("{marker}{}  ", kind.label()), style));
    }
    let docs = if state.documents.is_empty() {
        "无".to_string()
    } else {
        state
            .documents
            .iter()
            .map(|d| {
                let at = d.uploaded_at.with_timezone(&Local).format("%H:%M");
                format!("{} ({at})", d.name)
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    selector.push(Span::styled(
        format!("│ 资料: {docs}"),
        Style::default().fg(Color::Gray),
    ));
    let selector_border = if input_state.focus == InputFocus::Backend {
        Color::Green
    } else {
        Color::DarkGray
    };
    let selector_widget = Paragraph::new(Line::from(selector)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(selector_border)),
    );
    f.render_widget(selector_widget, chunks[1]);

    let input_prompt = if let Some(err) = &state.error_message {
        format!(" 错误: {} ", err.chars().take(60).collect::<String>())
    } else if state.input_locked {
        format!(" {} ", busy_label(state.phase))
    } else {
        " 研究目标 ".to_string()
    };

    let border_color = if state.error_message.is_some() {
        Color::Red
    } else if input_state.focus == InputFocus::Input {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let hint = " Enter 发送 │ Tab 焦点 │ Ctrl+B 切换引擎 │ /upload <pdf> │ Ctrl+R 重置 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });

    f.render_widget(input, chunks[2]);

    out.0 = total_lines;
    out.1 = content_height;
}
