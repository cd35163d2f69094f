//! 点击归因
//!
//! Redirect handlers hand events to a bounded queue and return right away.
//! A single worker task parses the user agent and applies one atomic
//! multi-bucket increment per event. Failures are counted and logged, never
//! surfaced to the redirect path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use woothee::parser::Parser;

use crate::storage::{ClickAttribution, LinkRepository};

/// 一次待归因的重定向
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub code: String,
    pub host: String,
    pub user_agent: String,
    pub country: String,
}

/// 队列计数器
#[derive(Debug, Default)]
pub struct ClickStats {
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickStatsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl ClickStats {
    pub fn snapshot(&self) -> ClickStatsSnapshot {
        ClickStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

pub struct ClickAggregator {
    sender: RwLock<Option<mpsc::Sender<ClickEvent>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    stats: Arc<ClickStats>,
}

impl ClickAggregator {
    /// 创建队列并启动 worker（需要在 tokio runtime 内调用）
    pub fn start(links: Arc<dyn LinkRepository>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(ClickStats::default());
        let worker = tokio::spawn(run_worker(links, receiver, stats.clone()));

        debug!("ClickAggregator started with capacity {}", capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            stats,
        }
    }

    /// 入队一次点击，不等待；队列满或已关闭时丢弃
    pub fn attribute(&self, code: &str, host: &str, user_agent: &str, country: &str) {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("ClickAggregator: closed, dropping click for {}${}", code, host);
            return;
        };

        let event = ClickEvent {
            code: code.to_string(),
            host: host.to_string(),
            user_agent: user_agent.to_string(),
            country: country.trim().to_string(),
        };
        match sender.try_send(event) {
            Ok(()) => trace!("ClickAggregator: queued click for {}${}", code, host),
            Err(TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "ClickAggregator: queue full, dropping click for {}${}",
                    event.code, event.host
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> ClickStatsSnapshot {
        self.stats.snapshot()
    }

    /// 关闭队列并等待剩余事件处理完
    pub async fn shutdown(&self) {
        // 释放 sender 后 worker 会在处理完剩余事件时退出
        self.sender.write().take();

        if let Some(worker) = self.worker.lock().await.take()
            && let Err(e) = worker.await
        {
            warn!("ClickAggregator worker ended abnormally: {}", e);
        }

        let stats = self.stats();
        info!(
            "ClickAggregator drained: processed={}, failed={}, dropped={}",
            stats.processed, stats.failed, stats.dropped
        );
    }
}

async fn run_worker(
    links: Arc<dyn LinkRepository>,
    mut receiver: mpsc::Receiver<ClickEvent>,
    stats: Arc<ClickStats>,
) {
    while let Some(event) = receiver.recv().await {
        let attribution = classify(&event.user_agent, &event.country);

        match links
            .increment_clicks(&event.code, &event.host, &attribution)
            .await
        {
            Ok(true) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "ClickAggregator: no authoritative record for {}${}",
                    event.code, event.host
                );
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "ClickAggregator: failed to count click for {}${}: {}",
                    event.code, event.host, e
                );
            }
        }
    }
    debug!("ClickAggregator worker exiting");
}

/// 将 User-Agent 与国家代码归入粗粒度分桶
pub fn classify(user_agent: &str, country: &str) -> ClickAttribution {
    let parsed = Parser::new().parse(user_agent);
    let (name, os, category) = match &parsed {
        Some(result) => (result.name, result.os, result.category),
        None => ("UNKNOWN", "UNKNOWN", "UNKNOWN"),
    };

    ClickAttribution {
        country: country.to_string(),
        os: os_bucket(os),
        device: device_bucket(os, category, user_agent),
        browser: browser_bucket(name),
    }
}

fn os_bucket(os: &str) -> &'static str {
    if os.starts_with("Windows") {
        "windows"
    } else if os == "Linux" {
        "linux"
    } else if os == "Mac OSX" || os == "Mac OS" {
        "macos"
    } else if os == "Android" {
        "android"
    } else if matches!(os, "iPhone" | "iPad" | "iPod" | "iOS") {
        "ios"
    } else {
        "other"
    }
}

fn device_bucket(os: &str, category: &str, user_agent: &str) -> &'static str {
    if os == "iPad" || (os == "Android" && !user_agent.contains("Mobile")) {
        return "tablet";
    }
    match category {
        "pc" => "desktop",
        "smartphone" | "mobilephone" => "mobile",
        _ => "other",
    }
}

fn browser_bucket(name: &str) -> &'static str {
    match name {
        "Firefox" => "firefox",
        "Edge" => "edge",
        "Opera" => "opera",
        "Chrome" => "chrome",
        "Safari" => "safari",
        "Internet Explorer" => "ie",
        _ => "other",
    }
}
