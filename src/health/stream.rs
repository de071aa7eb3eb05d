//! Media stream owner
//!
//! The supervisor never looks at stream content. It only asks whether the
//! feed moved since the previous check and, when it did not, asks the owner
//! to restart it.

use crate::status::StatusLog;
use crate::transport::join_url;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use rover_shared::codec::{StreamRequest, STREAM_PATH};
use rover_shared::timing;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owner of the best-effort media feed
#[async_trait]
pub trait StreamOwner: Send + Sync {
    /// Whether new data arrived since the previous call
    async fn advanced_since_last_check(&self) -> bool;

    /// Tear the feed down and open it again
    async fn restart(&self);
}

/// Reads the MJPEG feed over HTTP and counts received bytes
pub struct HttpStreamOwner {
    client: Client,
    stream_url: String,
    status: StatusLog,
    received: Arc<AtomicU64>,
    last_checked: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl HttpStreamOwner {
    pub fn new(client: Client, base_url: &str, status: StatusLog) -> Self {
        Self {
            client,
            stream_url: join_url(base_url, STREAM_PATH),
            status,
            received: Arc::new(AtomicU64::new(0)),
            last_checked: AtomicU64::new(0),
            reader: Mutex::new(None),
        }
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Total bytes received since construction
    pub fn bytes_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Open the feed with a fresh cache-busting parameter
    pub async fn start(&self) {
        let mut reader = self.reader.lock().await;
        if let Some(previous) = reader.take() {
            previous.abort();
        }

        self.status.info("Starting video stream...");
        *reader = Some(tokio::spawn(read_stream(
            self.client.clone(),
            self.stream_url.clone(),
            self.received.clone(),
            self.status.clone(),
        )));
    }

    /// Drop the current reader, if any
    pub async fn stop(&self) {
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
            debug!("[STREAM] Reader stopped");
        }
    }
}

#[async_trait]
impl StreamOwner for HttpStreamOwner {
    async fn advanced_since_last_check(&self) -> bool {
        let now = self.received.load(Ordering::Relaxed);
        let previous = self.last_checked.swap(now, Ordering::Relaxed);
        now != previous
    }

    async fn restart(&self) {
        self.status.warning("Restarting video stream...");
        self.stop().await;
        tokio::time::sleep(Duration::from_millis(timing::STREAM_RESTART_DELAY_MS)).await;
        self.start().await;
    }
}

/// Keep the feed open, re-opening it after a pause whenever it ends
async fn read_stream(client: Client, url: String, received: Arc<AtomicU64>, status: StatusLog) {
    let retry = Duration::from_millis(timing::STREAM_ERROR_RETRY_MS);

    loop {
        match drain_stream(&client, &url, &received, &status).await {
            Ok(()) => warn!("[STREAM] Stream closed by device"),
            Err(e) => status.error(format!(
                "Video stream failed ({}) - retrying in {}s...",
                e,
                retry.as_secs()
            )),
        }

        tokio::time::sleep(retry).await;
    }
}

async fn drain_stream(
    client: &Client,
    url: &str,
    received: &AtomicU64,
    status: &StatusLog,
) -> anyhow::Result<()> {
    let response = client
        .get(url)
        .query(&StreamRequest::fresh())
        .send()
        .await?
        .error_for_status()?;

    status.success("Video stream connected");

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk: Bytes = chunk?;
        received.fetch_add(chunk.len() as u64, Ordering::Relaxed);
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::build_client;

    fn owner() -> HttpStreamOwner {
        HttpStreamOwner::new(
            build_client().expect("client"),
            "http://192.168.4.1",
            StatusLog::new(),
        )
    }

    #[test]
    fn test_stream_url() {
        assert_eq!(owner().stream_url(), "http://192.168.4.1/stream");
    }

    #[tokio::test]
    async fn test_advanced_tracks_byte_counter() {
        let owner = owner();
        assert!(!owner.advanced_since_last_check().await);

        owner.received.fetch_add(4096, Ordering::Relaxed);
        assert!(owner.advanced_since_last_check().await);

        // Nothing new since the previous query
        assert!(!owner.advanced_since_last_check().await);
        assert_eq!(owner.bytes_received(), 4096);
    }

    #[tokio::test]
    async fn test_restart_replaces_reader() {
        let status = StatusLog::new();
        let owner = HttpStreamOwner::new(
            build_client().expect("client"),
            "http://127.0.0.1:9",
            status.clone(),
        );

        owner.start().await;
        owner.restart().await;
        assert!(owner.reader.lock().await.is_some());

        let texts: Vec<String> = status.snapshot().into_iter().map(|e| e.text).collect();
        assert!(texts.contains(&"Restarting video stream...".to_string()));
        assert_eq!(
            texts
                .iter()
                .filter(|t| t.as_str() == "Starting video stream...")
                .count(),
            2
        );

        owner.stop().await;
        assert!(owner.reader.lock().await.is_none());
    }
}
