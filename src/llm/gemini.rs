//! Gemini 深度后端（generateContent REST）
//!
//! 请求携带系统指令、思考配置（include_thoughts + 推理档位）与两个工具（googleSearch、codeExecution）；
//! 响应的 part 列表在这里一次性解码为 Fragment：
//! - `thought: true` 的文本 → Reasoning
//! - `executableCode` → Code（语言小写，未指定时按 python）
//! - 其余文本拼接为最终答案；`codeExecutionResult` 只记日志
//!
//! 无超时、无重试：调用挂起则本轮挂起。

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Secret;
use crate::llm::{
    Backend, BackendError, BackendKind, Capability, Fragment, GenerationConfig, Reply, TokenUsage,
};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_CODE_LANGUAGE: &str = "python";

// ---- 请求 ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: RequestGenerationConfig,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestGenerationConfig {
    pub thinking_config: ThinkingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
    pub thinking_level: String,
}

/// 工具声明：`{"googleSearch": {}}` / `{"codeExecution": {}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    GoogleSearch {},
    CodeExecution {},
}

impl From<Capability> for Tool {
    fn from(c: Capability) -> Self {
        match c {
            Capability::WebSearch => Tool::GoogleSearch {},
            Capability::CodeExecution => Tool::CodeExecution {},
        }
    }
}

/// 只由 prompt 与配置包决定请求体（会话中的上传文档不参与）
pub fn build_request(prompt: &str, config: &GenerationConfig) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![TextPart {
                text: prompt.to_string(),
            }],
        }],
        system_instruction: Content {
            role: None,
            parts: vec![TextPart {
                text: config.system_instruction.clone(),
            }],
        },
        generation_config: RequestGenerationConfig {
            thinking_config: ThinkingConfig {
                include_thoughts: config.include_thoughts,
                thinking_level: config.thinking_level.as_wire().to_string(),
            },
        },
        tools: config.tools.iter().copied().map(Tool::from).collect(),
    }
}

// ---- 响应 ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    executable_code: Option<ExecutableCode>,
    code_execution_result: Option<CodeExecutionResult>,
}

#[derive(Debug, Deserialize)]
struct ExecutableCode {
    language: Option<String>,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct CodeExecutionResult {
    outcome: Option<String>,
    output: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

fn normalize_language(language: Option<&str>) -> String {
    match language.map(str::trim) {
        None | Some("") => DEFAULT_CODE_LANGUAGE.to_string(),
        Some(l) if l.eq_ignore_ascii_case("LANGUAGE_UNSPECIFIED") => {
            DEFAULT_CODE_LANGUAGE.to_string()
        }
        Some(l) => l.to_lowercase(),
    }
}

/// 解码成功响应体；返回 (回复, (prompt_tokens, completion_tokens))
fn decode_response(body: &str) -> Result<(Reply, (u64, u64)), BackendError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;

    let usage = response.usage_metadata.unwrap_or_default();
    let tokens = (
        usage.prompt_token_count,
        usage.candidates_token_count + usage.thoughts_token_count,
    );

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Decode(format!("prompt blocked: {reason}")));
        }
        return Err(BackendError::Empty);
    };

    if let Some(reason) = &candidate.finish_reason {
        tracing::debug!(finish_reason = %reason, "Gemini candidate finished");
    }

    let mut steps = Vec::new();
    let mut answer = String::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(exec) = part.executable_code {
            steps.push(Fragment::Code {
                code: exec.code,
                language: normalize_language(exec.language.as_deref()),
            });
        } else if let Some(result) = part.code_execution_result {
            tracing::debug!(
                outcome = result.outcome.as_deref().unwrap_or("unknown"),
                output_chars = result.output.map(|o| o.len()).unwrap_or(0),
                "Gemini code execution result"
            );
        } else if let Some(text) = part.text {
            if part.thought {
                steps.push(Fragment::Reasoning(text));
            } else {
                answer.push_str(&text);
            }
        }
    }

    Ok((Reply::new(steps, answer), tokens))
}

/// 非 2xx 响应：优先解析 Google 错误信封，否则保留原始响应体
fn decode_error(status: u16, body: &str) -> BackendError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(s) => format!("{s}: {}", env.error.message),
            None => env.error.message,
        },
        Err(_) => body.trim().to_string(),
    };
    BackendError::Status { status, message }
}

/// Gemini 客户端：持有 HTTP Client、端点、模型与 Key
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    model: String,
    api_key: Secret,
    usage: TokenUsage,
}

impl GeminiBackend {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Secret) -> Result<Self, BackendError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key,
            usage: TokenUsage::default(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Deep
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.snapshot()
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Reply, BackendError> {
        let request = build_request(prompt, config);

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(decode_error(status.as_u16(), &body));
        }

        let (reply, (prompt_tokens, completion_tokens)) = decode_response(&body)?;
        self.usage.record(prompt_tokens, completion_tokens);
        tracing::debug!(
            model = %self.model,
            fragments = reply.fragments().len(),
            "Gemini reply received"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let cfg = GenerationConfig::research("Be precise.");
        let json = serde_json::to_value(build_request("Plot sin(x)", &cfg)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Plot sin(x)");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be precise.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["thinkingConfig"]["includeThoughts"], true);
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingLevel"], "low");
        assert_eq!(
            json["tools"],
            serde_json::json!([{"googleSearch": {}}, {"codeExecution": {}}])
        );
    }

    #[test]
    fn test_decode_thought_code_and_text() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "I should plot it.", "thought": true},
                    {"executableCode": {"language": "PYTHON", "code": "plt.plot(x, np.sin(x))"}},
                    {"codeExecutionResult": {"outcome": "OUTCOME_OK", "output": ""}},
                    {"text": "Plot"},
                    {"text": "ted."}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "thoughtsTokenCount": 7}
        }"#;

        let (reply, tokens) = decode_response(body).unwrap();
        assert_eq!(
            reply.fragments(),
            &[
                Fragment::Reasoning("I should plot it.".into()),
                Fragment::Code {
                    code: "plt.plot(x, np.sin(x))".into(),
                    language: "python".into(),
                },
                Fragment::Final("Plotted.".into()),
            ]
        );
        assert_eq!(tokens, (10, 12));
    }

    #[test]
    fn test_decode_unspecified_language_defaults_to_python() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"executableCode":{"language":"LANGUAGE_UNSPECIFIED","code":"1+1"}},
            {"executableCode":{"code":"2+2"}}
        ]}}]}"#;
        let (reply, _) = decode_response(body).unwrap();
        let languages: Vec<&str> = reply
            .fragments()
            .iter()
            .filter_map(|f| match f {
                Fragment::Code { language, .. } => Some(language.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(languages, vec!["python", "python"]);
        assert_eq!(reply.final_text(), "");
    }

    #[test]
    fn test_decode_no_candidates() {
        assert_eq!(decode_response(r#"{"candidates": []}"#).unwrap_err(), BackendError::Empty);

        let blocked = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert_eq!(
            decode_response(blocked).unwrap_err(),
            BackendError::Decode("prompt blocked: SAFETY".into())
        );
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        assert!(matches!(
            decode_response("<html>502</html>"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            decode_error(429, body),
            BackendError::Status {
                status: 429,
                message: "RESOURCE_EXHAUSTED: Quota exceeded".into(),
            }
        );
        assert_eq!(
            decode_error(502, " Bad Gateway \n"),
            BackendError::Status {
                status: 502,
                message: "Bad Gateway".into(),
            }
        );
    }

    #[test]
    fn test_endpoint_includes_model() {
        let backend =
            GeminiBackend::new(Some("http://localhost:8080/v1beta/"), GEMINI_DEFAULT_MODEL, Secret::new("k"))
                .unwrap();
        assert_eq!(
            backend.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(backend.kind(), BackendKind::Deep);
    }
}
