//! 后端句柄的 token 计数
//!
//! 每个句柄自带一份计数，会话把已创建句柄的合计显示在标题栏；重置会话时随句柄一起丢弃。

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenUsage {
    /// 记一次调用的用量（generate 只拿到 &self）
    pub fn record(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn snapshot(&self) -> (u64, u64, u64) {
        let prompt = self.prompt.load(Ordering::Relaxed);
        let completion = self.completion.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_across_calls() {
        let usage = TokenUsage::default();
        assert_eq!(usage.snapshot(), (0, 0, 0));

        usage.record(10, 12);
        usage.record(5, 0);
        assert_eq!(usage.snapshot(), (15, 12, 27));
    }
}
