//! 后端层：能力接口、回复片段与两个实现（Groq 快速 / Gemini 深度），外加测试用脚本后端

pub mod factory;
pub mod fragment;
pub mod gemini;
pub mod groq;
pub mod mock;
pub mod traits;
pub mod usage;

pub use factory::{BackendFactory, ProviderFactory};
pub use fragment::{Fragment, Reply};
pub use gemini::{GeminiBackend, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL};
pub use groq::{GroqBackend, GROQ_BASE_URL, GROQ_DEFAULT_MODEL};
pub use mock::{RecordedCall, ScriptedBackend, ScriptedFactory};
pub use traits::{
    Backend, BackendError, BackendKind, Capability, GenerationConfig, ThinkingLevel,
};
pub use usage::TokenUsage;
