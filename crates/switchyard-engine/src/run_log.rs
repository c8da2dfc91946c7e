use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use switchyard_core::error::Result;
use switchyard_core::event::{EventBus, PlanEvent};

/// JSONL run logger.
///
/// Receives plan events from an [`EventBus`] and appends each one as a JSON
/// line. The file is append-only and flushed per entry, so everything written
/// before a crash stays intact.
pub struct RunLogger {
    log_path: PathBuf,
    rx: broadcast::Receiver<PlanEvent>,
}

/// A single log entry written to the JSONL file.
#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a PlanEvent,
}

impl RunLogger {
    /// Subscribe to `bus`. Entries go to `{log_dir}/{timestamp}.jsonl`.
    ///
    /// Subscribing here rather than in [`RunLogger::run`] means no event
    /// published after construction is missed.
    pub fn new(log_dir: &Path, bus: &EventBus) -> Self {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        Self {
            log_path: log_dir.join(format!("{}.jsonl", timestamp)),
            rx: bus.subscribe(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Write events until `cancel` fires or the bus closes.
    ///
    /// Events already queued when cancellation arrives are still written.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        if let Some(dir) = self.log_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        info!(path = %self.log_path.display(), "RunLogger started");

        let mut writer = tokio::io::BufWriter::new(file);

        loop {
            tokio::select! {
                biased;
                result = self.rx.recv() => {
                    match result {
                        Ok(event) => {
                            let entry = LogEntry {
                                timestamp: Utc::now().to_rfc3339(),
                                event: &event,
                            };
                            let line = format!("{}\n", serde_json::to_string(&entry)?);
                            if let Err(e) = writer.write_all(line.as_bytes()).await {
                                error!(error = %e, "Failed to write log entry");
                                break;
                            }
                            // Flush per entry
                            if let Err(e) = writer.flush().await {
                                error!(error = %e, "Failed to flush log");
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            debug!(skipped = n, "RunLogger lagged, skipped events");
                        }
                        Err(RecvError::Closed) => {
                            debug!("EventBus closed, RunLogger stopping");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("RunLogger cancelled");
                    break;
                }
            }
        }

        writer.flush().await?;
        Ok(())
    }
}
