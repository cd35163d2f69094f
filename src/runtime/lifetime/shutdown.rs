use std::io;
use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info};

use crate::services::ClickAggregator;

/// 点击队列排空超时时间（秒）
const DRAIN_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C 信号
pub async fn wait_for_signal() {
    shutdown_on(signal::ctrl_c()).await
}

/// Never completes when the handler cannot be installed, so the server keeps
/// running until it is stopped some other way.
async fn shutdown_on<F>(ctrl_c: F)
where
    F: Future<Output = io::Result<()>>,
{
    match ctrl_c.await {
        Ok(()) => {
            info!("Shutdown signal received, stopping server...");
        }
        Err(e) => {
            error!(
                "Failed to listen for Ctrl+C: {}. Graceful shutdown is unavailable.",
                e
            );
            std::future::pending::<()>().await;
        }
    }
}

/// 关闭点击队列并等待剩余事件写入
pub async fn drain_clicks(clicks: &ClickAggregator) {
    match timeout(Duration::from_secs(DRAIN_TIMEOUT_SECS), clicks.shutdown()).await {
        Ok(()) => {
            info!("Click queue drained");
        }
        Err(_) => {
            error!(
                "Click queue drain timed out after {} seconds, remaining attributions are lost",
                DRAIN_TIMEOUT_SECS
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_received_completes() {
        let result = timeout(Duration::from_millis(200), shutdown_on(async { Ok(()) })).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handler_failure_never_triggers_shutdown() {
        let failed = async { Err(io::Error::other("signal handler unavailable")) };
        let result = timeout(Duration::from_millis(50), shutdown_on(failed)).await;
        assert!(result.is_err());
    }
}
