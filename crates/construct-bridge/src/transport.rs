//! Newline-delimited JSON-RPC over a byte stream.
//!
//! One request per line in, one reply per line out. Requests are handled in
//! arrival order; each is dispatched on the blocking pool since callables
//! are synchronous and may block.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use construct_json_rpc_server::Service;
use construct_kv::{InMemoryKvStore, KvStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters for one serving session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: u64,
    pub replies: u64,
}

/// Serve requests from `reader` until end of input, writing replies to
/// `writer`. Blank lines are skipped.
///
/// Lines are handed to the service as raw bytes, so a line that is not valid
/// UTF-8 gets a Parse Error reply like any other malformed request.
pub async fn serve<R, W>(service: Arc<Service>, mut reader: R, mut writer: W) -> anyhow::Result<ServeStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = ServeStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("failed to read request")?;
        if read == 0 {
            break;
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        stats.requests += 1;

        let line = std::mem::take(&mut buf);
        let service = Arc::clone(&service);
        let reply = tokio::task::spawn_blocking(move || service.handle_request(&line, &()))
            .await
            .context("request handler task failed")?;

        match reply {
            Some(reply) => {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                stats.replies += 1;
            }
            None => debug!("Notification handled, no reply"),
        }
    }

    info!(
        "Input closed after {} requests ({} replies)",
        stats.requests, stats.replies
    );
    Ok(stats)
}

/// Run eviction sweeps every `period` until `shutdown` flips to `true`.
///
/// With a `snapshot` path the store is saved after every sweep.
pub fn spawn_sweeper(
    store: Arc<InMemoryKvStore>,
    period: Duration,
    snapshot: Option<std::path::PathBuf>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("Sweeper: shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    match store.sweep() {
                        Ok(stats) => debug!("Sweep finished: {:?}", stats),
                        Err(e) => warn!("Sweep failed: {}", e),
                    }
                    if let Some(path) = &snapshot {
                        if let Err(e) = store.save(path) {
                            warn!("Failed to save snapshot to {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }
    })
}
