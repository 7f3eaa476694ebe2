//! 应用配置与凭证
//!
//! 配置加载顺序：先读 config/default.toml，再读显式传入的文件，最后用环境变量 `HYPOLAB__*` 覆盖
//! （双下划线表示嵌套，如 `HYPOLAB__LLM__DEEP__MODEL=gemini-2.5-pro`）。
//!
//! 凭证不进配置文件：进程启动时从环境变量读取一次，缺任意一个即启动失败。

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::LabError;
use crate::llm::{BackendKind, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL, GROQ_BASE_URL, GROQ_DEFAULT_MODEL};

/// 快速后端 Key 的环境变量（按顺序查找）
pub const FAST_KEY_VARS: &[&str] = &["groq_api", "GROQ_API_KEY"];
/// 深度后端 Key 的环境变量（按顺序查找）
pub const DEEP_KEY_VARS: &[&str] = &["gemini_api", "GEMINI_API_KEY"];

pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a Senior Scientific Discovery Agent. Be precise and ground claims in evidence.";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
}

/// [app] 段：名称、默认后端、日志文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 新会话与重置后选中的后端
    pub default_backend: BackendKind,
    /// TUI 占用终端，日志写文件；为空时不输出日志
    pub log_file: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Hypolab".to_string(),
            default_backend: BackendKind::Fast,
            log_file: Some(PathBuf::from("hypolab.log")),
        }
    }
}

/// [llm] 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub fast: FastSection,
    pub deep: DeepSection,
}

/// [llm.fast]：Groq 模型与端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FastSection {
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for FastSection {
    fn default() -> Self {
        Self {
            model: GROQ_DEFAULT_MODEL.to_string(),
            base_url: Some(GROQ_BASE_URL.to_string()),
        }
    }
}

/// [llm.deep]：Gemini 模型、端点与系统指令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeepSection {
    pub model: String,
    pub base_url: Option<String>,
    pub system_instruction: String,
}

impl Default for DeepSection {
    fn default() -> Self {
        Self {
            model: GEMINI_DEFAULT_MODEL.to_string(),
            base_url: Some(GEMINI_BASE_URL.to_string()),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HYPOLAB__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HYPOLAB__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HYPOLAB")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 不透明的密钥字符串；Debug 输出不泄露内容
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// 两个后端的凭证：进程级、启动后不可变
#[derive(Debug, Clone)]
pub struct Credentials {
    pub fast: Secret,
    pub deep: Secret,
}

impl Credentials {
    pub fn from_env() -> Result<Self, LabError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// 按变量名查找（空白值视为缺失）；缺失项全部列出后一次性报错
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LabError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let find = |vars: &[&str]| {
            vars.iter()
                .filter_map(|v| lookup(*v))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
                .map(Secret::new)
        };

        match (find(FAST_KEY_VARS), find(DEEP_KEY_VARS)) {
            (Some(fast), Some(deep)) => Ok(Self { fast, deep }),
            (fast, deep) => {
                let mut missing = Vec::new();
                if fast.is_none() {
                    missing.push(FAST_KEY_VARS.join(" or "));
                }
                if deep.is_none() {
                    missing.push(DEEP_KEY_VARS.join(" or "));
                }
                Err(LabError::MissingCredentials(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_credentials_missing_both() {
        let err = Credentials::from_lookup(|_| None).unwrap_err();
        match err {
            LabError::MissingCredentials(missing) => {
                assert_eq!(missing.len(), 2);
                assert!(missing[0].contains("groq_api"));
                assert!(missing[1].contains("gemini_api"));
            }
            other => panic!("Expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn test_credentials_blank_counts_as_missing() {
        let err = Credentials::from_lookup(lookup_from(&[("groq_api", "gsk"), ("gemini_api", "  ")]))
            .unwrap_err();
        assert!(err.to_string().contains("gemini_api"));
        assert!(!err.to_string().contains("groq_api"));
    }

    #[test]
    fn test_credentials_fallback_vars() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk-1"),
            ("gemini_api", "gm-1"),
        ]))
        .unwrap();
        assert_eq!(creds.fast.expose(), "gsk-1");
        assert_eq!(creds.deep.expose(), "gm-1");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let creds = Credentials {
            fast: Secret::new("gsk-very-secret"),
            deep: Secret::new("gm-very-secret"),
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("very-secret"));
    }

    #[test]
    fn test_default_models_and_backend() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.default_backend, BackendKind::Fast);
        assert_eq!(cfg.llm.fast.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.llm.deep.model, "gemini-3-flash-preview");
        assert_eq!(cfg.llm.deep.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_load_config_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[app]\ndefault_backend = \"deep\"\n\n[llm.deep]\nmodel = \"gemini-test\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.default_backend, BackendKind::Deep);
        assert_eq!(cfg.llm.deep.model, "gemini-test");
        assert_eq!(cfg.llm.fast.model, GROQ_DEFAULT_MODEL);
        assert_eq!(cfg.llm.deep.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
    }
}
