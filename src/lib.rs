//! Hypolab - 双引擎科研对话终端
//!
//! 模块划分：
//! - **config**: 应用配置（TOML + 环境变量）与启动凭证
//! - **core**: 会话状态、单轮调度、UI 状态投影、会话运行时
//! - **documents**: PDF 上传（仅保存）
//! - **llm**: 后端抽象与实现（Groq 快速 / Gemini 深度 / 测试脚本后端）
//! - **observability**: 日志
//! - **transcript**: 消息与对话记录
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod documents;
pub mod llm;
pub mod observability;
pub mod transcript;
pub mod ui;
