//! 后端回复：有序片段序列
//!
//! 深度后端的异构 part 列表在适配器边界一次性解码为 Fragment，下游不再做临时解析。

use crate::transcript::{Message, StructuredPart};

/// 回复片段
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// 模型推理过程（仅在开启 include_thoughts 时出现）
    Reasoning(String),
    /// 模型在沙箱中执行的代码
    Code { code: String, language: String },
    /// 最终答案
    Final(String),
}

/// 一次调用的完整回复
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    fragments: Vec<Fragment>,
}

impl Reply {
    /// 只有最终答案的回复（快速后端）
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment::Final(answer.into())],
        }
    }

    /// 中间步骤 + 最终答案；答案总是排在最后
    pub fn new(steps: Vec<Fragment>, answer: impl Into<String>) -> Self {
        let mut fragments = steps;
        fragments.push(Fragment::Final(answer.into()));
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// 所有 Final 片段拼接后的答案文本
    pub fn final_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Final(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 转为助手消息：推理 / 代码按顺序成为结构化片段，答案成为正文
    pub fn into_message(self) -> Message {
        let mut content = String::new();
        let mut parts = Vec::new();
        for fragment in self.fragments {
            match fragment {
                Fragment::Reasoning(text) => parts.push(StructuredPart::reasoning(text)),
                Fragment::Code { code, language } => parts.push(StructuredPart::code(code, language)),
                Fragment::Final(text) => content.push_str(&text),
            }
        }
        Message::assistant_with_parts(content, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{PartKind, Role};

    #[test]
    fn test_into_message_keeps_step_order() {
        let reply = Reply::new(
            vec![
                Fragment::Reasoning("need numpy".into()),
                Fragment::Code {
                    code: "import numpy as np".into(),
                    language: "python".into(),
                },
                Fragment::Reasoning("done".into()),
            ],
            "Plotted.",
        );
        let msg = reply.into_message();

        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), "Plotted.");
        let kinds: Vec<PartKind> = msg.parts().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PartKind::Reasoning, PartKind::Code, PartKind::Reasoning]);
    }

    #[test]
    fn test_text_reply_has_no_parts() {
        let reply = Reply::text("4");
        assert_eq!(reply.final_text(), "4");
        assert!(reply.into_message().parts().is_empty());
    }
}
