//! Hypolab - 双引擎科研对话终端
//!
//! 入口：加载配置、初始化日志、校验凭证（缺失即终止），创建会话并运行 TUI 主循环。

use std::sync::Arc;

use anyhow::Context;
use hypolab::config::{load_config, AppConfig, Credentials};
use hypolab::core::create_session;
use hypolab::observability;
use hypolab::ui::run_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, cfg_err) = match load_config(None) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(cfg.app.log_file.as_deref()).context("Failed to initialize logging")?;
    if let Some(e) = cfg_err {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    // 凭证缺失时在进入 TUI 之前终止，不会创建任何后端客户端
    let credentials = Credentials::from_env()
        .inspect_err(|e| tracing::error!("{}", e))
        .context("Startup aborted")?;

    let (cmd_tx, state_rx) = create_session(&cfg, Arc::new(credentials));

    run_app(&cfg.app.name, state_rx, cmd_tx)
        .await
        .context("App run failed")?;

    Ok(())
}
