//! Asynchronous append-only log writer.
//!
//! Every file write flows through a single worker thread via an unbounded
//! [`mpsc`] channel. The worker blocks on the channel and performs each open
//! and append itself, strictly in submission order, so two writes to the same
//! file never interleave. Failures are reported back to the main context on a
//! second channel and never stop the worker.
//!
//! ```text
//! Starting -> Running -> Draining -> Stopped
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Name of the worker thread.
const WORKER_THREAD_NAME: &str = "logging";

/// A unit of work for the logging worker.
#[derive(Debug)]
pub enum LogTask {
    /// Append `content` to `filename`.
    Write {
        /// Target file, already home-expanded.
        filename: PathBuf,
        /// Text appended verbatim.
        content: String,
    },

    /// Stop after everything queued before this task.
    Shutdown,
}

/// A write failure reported back to the main context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogReport {
    /// File that could not be written.
    pub filename: PathBuf,
    /// Human-readable reason.
    pub message: String,
}

/// Lifecycle of a [`LogWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Worker thread is being spawned. Only observable inside
    /// [`LogWriter::start`].
    Starting,
    /// Accepting writes.
    Running,
    /// Shutdown requested; worker finishing queued writes.
    Draining,
    /// Worker has exited.
    Stopped,
}

/// Errors from starting the writer.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn logging thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Failure of a single append.
#[derive(Debug, thiserror::Error)]
enum AppendError {
    #[error("unable to open file for logging: {0}")]
    Open(#[source] std::io::Error),

    #[error("unable to write log entry: {0}")]
    Write(#[source] std::io::Error),
}

/// Handle to the logging worker.
///
/// Dropping a running writer performs [`shutdown`](Self::shutdown).
pub struct LogWriter {
    tx: mpsc::UnboundedSender<LogTask>,
    handle: Option<JoinHandle<()>>,
    state: WriterState,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// Start the worker thread.
    ///
    /// Write failures are sent to `reports` for the main context to surface.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] if the thread cannot be spawned.
    pub fn start(reports: mpsc::UnboundedSender<LogReport>) -> Result<Self, WriterError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut writer = Self {
            tx,
            handle: None,
            state: WriterState::Starting,
        };

        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || run_worker(rx, &reports))
            .map_err(WriterError::Spawn)?;

        writer.handle = Some(handle);
        writer.state = WriterState::Running;
        info!("log writer started");
        Ok(writer)
    }

    /// Start the worker thread, terminating the process if that fails.
    ///
    /// Without a worker no write can be guaranteed, so there is nothing
    /// sensible to fall back to.
    pub fn init(reports: mpsc::UnboundedSender<LogReport>) -> Self {
        match Self::start(reports) {
            Ok(writer) => writer,
            Err(err) => {
                error!(error = %err, "log writer failed to start");
                eprintln!("Error spawning logging thread: {err}");
                std::process::exit(1);
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Queue `content` to be appended to `filename`.
    ///
    /// Both arguments are copied. Never blocks. Writes submitted after
    /// shutdown has begun are dropped.
    pub fn submit_write(&self, filename: &Path, content: &str) {
        if self.state != WriterState::Running {
            debug!(file = %filename.display(), state = ?self.state, "log write dropped");
            return;
        }
        let task = LogTask::Write {
            filename: filename.to_path_buf(),
            content: content.to_owned(),
        };
        if self.tx.send(task).is_err() {
            debug!(file = %filename.display(), "log worker gone, write dropped");
        }
    }

    /// Flush every previously submitted write and stop the worker.
    ///
    /// Blocks until the worker thread exits. Calling this again is a no-op.
    pub fn shutdown(&mut self) {
        if self.state != WriterState::Running {
            return;
        }
        self.state = WriterState::Draining;
        if self.tx.send(LogTask::Shutdown).is_err() {
            warn!("log worker exited before shutdown");
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("logging thread panicked");
            }
        }
        self.state = WriterState::Stopped;
        info!("log writer shut down");
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run the worker loop until a [`LogTask::Shutdown`] arrives or every
/// sender is dropped. Must run outside any async runtime.
fn run_worker(
    mut rx: mpsc::UnboundedReceiver<LogTask>,
    reports: &mpsc::UnboundedSender<LogReport>,
) {
    while let Some(task) = rx.blocking_recv() {
        match task {
            LogTask::Write { filename, content } => {
                if let Err(err) = append(&filename, &content) {
                    warn!(file = %filename.display(), error = %err, "log write failed");
                    let report = LogReport {
                        filename,
                        message: err.to_string(),
                    };
                    if reports.send(report).is_err() {
                        trace!("report receiver gone");
                    }
                }
            }
            LogTask::Shutdown => break,
        }
    }
    trace!("log worker stopped");
}

fn append(filename: &Path, content: &str) -> Result<(), AppendError> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)
        .map_err(AppendError::Open)?;
    file.write_all(content.as_bytes()).map_err(AppendError::Write)?;
    trace!(file = %filename.display(), bytes = content.len(), "log entry appended");
    Ok(())
}
