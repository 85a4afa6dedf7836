use std::sync::Arc;

use tokio::signal;
use tracing::warn;

use crate::services::integrations::Integrations;

pub async fn listen_for_shutdown(integrations: Arc<Integrations>) {
    // 等待 Ctrl+C 信号
    signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
    warn!("Shutdown signal received, initiating graceful shutdown...");

    // 未完成的群发在下次启动时被标记为暂停
    let active = integrations.broadcasts().active_count();
    if active > 0 {
        warn!("{} broadcast(s) still sending, they will be paused on next start", active);
    }
}
