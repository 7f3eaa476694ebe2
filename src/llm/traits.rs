//! 后端抽象
//!
//! 两个后端（Groq 快速 / Gemini 深度）都实现 Backend::generate(prompt, config)；
//! 编排层只面向 `Arc<dyn Backend>`，不接触具体厂商类型。

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::llm::Reply;

/// 后端选择：封闭的两种变体
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 低延迟补全（Groq）
    #[default]
    Fast,
    /// 深度检索 + 代码执行 + 推理（Gemini）
    Deep,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Fast, BackendKind::Deep];

    /// 选择器中显示的名称
    pub fn label(self) -> &'static str {
        match self {
            BackendKind::Fast => "Groq (Fast)",
            BackendKind::Deep => "Gemini (Deep Search/Code)",
        }
    }

    /// 厂商名，用于错误提示
    pub fn vendor(self) -> &'static str {
        match self {
            BackendKind::Fast => "Groq",
            BackendKind::Deep => "Gemini",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            BackendKind::Fast => BackendKind::Deep,
            BackendKind::Deep => BackendKind::Fast,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Fast => "fast",
            BackendKind::Deep => "deep",
        })
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "groq" => Ok(BackendKind::Fast),
            "deep" | "gemini" => Ok(BackendKind::Deep),
            other => Err(format!("unknown backend '{other}' (expected fast or deep)")),
        }
    }
}

/// 推理深度档位（线上协议用小写字符串）；科研配置固定用最低档
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThinkingLevel {
    #[default]
    Low,
}

impl ThinkingLevel {
    pub fn as_wire(self) -> &'static str {
        match self {
            ThinkingLevel::Low => "low",
        }
    }
}

/// 深度后端启用的能力工具
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    WebSearch,
    CodeExecution,
}

/// 每次调用携带的配置包；快速后端忽略它
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
    pub system_instruction: String,
    pub include_thoughts: bool,
    pub thinking_level: ThinkingLevel,
    pub tools: Vec<Capability>,
}

impl GenerationConfig {
    /// 固定的科研配置：显示推理、最低推理档位、联网检索 + 沙箱代码执行
    pub fn research(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            include_thoughts: true,
            thinking_level: ThinkingLevel::Low,
            tools: vec![Capability::WebSearch, Capability::CodeExecution],
        }
    }
}

/// 后端调用错误（传输 / HTTP 状态 / 响应解析 / 空响应）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid request: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("empty response: no answer returned")]
    Empty,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

/// 后端能力接口：单次请求/响应，无流式、无重试、无超时
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Reply, BackendError>;

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
