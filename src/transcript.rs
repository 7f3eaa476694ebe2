//! 对话记录：消息、结构化片段、只追加的 Transcript
//!
//! 消息一旦追加即不可变（字段私有，仅提供只读访问）；Transcript 不去重、不设上限，
//! 只能整体清空（会话重置时）。

use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

/// 结构化片段类型：推理过程 / 可执行代码
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    Reasoning,
    Code,
}

/// 助手消息中的结构化片段，按后端返回顺序排列，渲染时先于正文
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPart {
    pub kind: PartKind,
    pub payload: String,
    /// 仅代码片段有语言标签
    pub language: Option<String>,
}

impl StructuredPart {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: PartKind::Reasoning,
            payload: text.into(),
            language: None,
        }
    }

    pub fn code(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind: PartKind::Code,
            payload: code.into(),
            language: Some(language.into()),
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    parts: Vec<StructuredPart>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            parts: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_parts(content, Vec::new())
    }

    pub fn assistant_with_parts(content: impl Into<String>, parts: Vec<StructuredPart>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            parts,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn parts(&self) -> &[StructuredPart] {
        &self.parts
    }
}

/// 有序对话记录：插入顺序即对话顺序
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut t = Transcript::new();
        t.push(Message::user("a"));
        t.push(Message::assistant("b"));
        t.push(Message::user("a"));

        let roles: Vec<Role> = t.messages().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(t.len(), 3, "重复内容也不去重");
    }

    #[test]
    fn test_code_part_carries_language() {
        let part = StructuredPart::code("print(1)", "python");
        assert_eq!(part.kind, PartKind::Code);
        assert_eq!(part.language.as_deref(), Some("python"));
        assert!(StructuredPart::reasoning("hmm").language.is_none());
    }
}
