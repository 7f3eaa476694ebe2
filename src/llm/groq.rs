//! Groq 快速后端（OpenAI 兼容 Chat Completions）
//!
//! 通过 async_openai 调用 Groq 的兼容端点；每次只发一条 user 消息，取首个 choice 的 content。
//! 没有 choice 或 content 为空值时视为失败（BackendError::Empty），不当作空回答。
//! - Base URL: https://api.groq.com/openai/v1
//! - 模型: llama-3.3-70b-versatile

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{Backend, BackendError, BackendKind, GenerationConfig, Reply, TokenUsage};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq 客户端：持有 Client 与 model 名
pub struct GroqBackend {
    client: Client<OpenAIConfig>,
    model: String,
    usage: TokenUsage,
}

impl GroqBackend {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(base_url.unwrap_or(GROQ_BASE_URL))
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: TokenUsage::default(),
        }
    }

    /// 构造请求：{model, messages: [{role: "user", content: prompt}]}
    pub fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, BackendError> {
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user)])
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))
    }
}

#[async_trait]
impl Backend for GroqBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fast
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.snapshot()
    }

    async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<Reply, BackendError> {
        let request = self.build_request(prompt)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage.record(
                usage.prompt_tokens as u64,
                usage.completion_tokens as u64,
            );
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(BackendError::Empty)?;

        tracing::debug!(model = %self.model, chars = content.len(), "Groq reply received");
        Ok(Reply::text(content))
    }
}
