//! 后端工厂：按 BackendKind 构造真实客户端
//!
//! 会话首次使用某个后端时才调用工厂（懒创建），构造出的句柄由会话缓存到重置为止。

use std::sync::Arc;

use crate::config::{Credentials, LlmSection};
use crate::llm::{Backend, BackendError, BackendKind, GeminiBackend, GroqBackend};

pub trait BackendFactory: Send + Sync {
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn Backend>, BackendError>;
}

/// 生产工厂：配置提供模型与端点，凭证只读共享
pub struct ProviderFactory {
    llm: LlmSection,
    credentials: Arc<Credentials>,
}

impl ProviderFactory {
    pub fn new(llm: LlmSection, credentials: Arc<Credentials>) -> Self {
        Self { llm, credentials }
    }
}

impl BackendFactory for ProviderFactory {
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn Backend>, BackendError> {
        match kind {
            BackendKind::Fast => {
                let fast = &self.llm.fast;
                tracing::info!("Using Groq backend ({})", fast.model);
                Ok(Arc::new(GroqBackend::new(
                    fast.base_url.as_deref(),
                    &fast.model,
                    self.credentials.fast.expose(),
                )))
            }
            BackendKind::Deep => {
                let deep = &self.llm.deep;
                tracing::info!("Using Gemini backend ({})", deep.model);
                Ok(Arc::new(GeminiBackend::new(
                    deep.base_url.as_deref(),
                    &deep.model,
                    self.credentials.deep.clone(),
                )?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[test]
    fn test_provider_factory_builds_matching_kind() {
        let creds = Arc::new(Credentials {
            fast: Secret::new("gsk-test"),
            deep: Secret::new("gm-test"),
        });
        let factory = ProviderFactory::new(LlmSection::default(), creds);

        for kind in BackendKind::ALL {
            let backend = factory.create(kind).unwrap();
            assert_eq!(backend.kind(), kind);
        }
    }
}
