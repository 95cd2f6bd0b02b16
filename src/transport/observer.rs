use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::LoaderError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the batch was rejected).
    Error,
    /// Critical error (connection failures, remote server errors).
    Critical,
}

impl UploadSeverity {
    /// Classify a batch failure.
    pub fn for_error(e: &LoaderError) -> Self {
        match e {
            LoaderError::Http(err) if err.is_connect() || err.is_timeout() => UploadSeverity::Critical,
            LoaderError::Transport { status, .. } if *status >= 500 => UploadSeverity::Critical,
            _ => UploadSeverity::Error,
        }
    }
}

/// Which batch an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    /// Destination table.
    pub table_id: String,
    /// 0-based batch index.
    pub batch_index: usize,
    /// Total number of batches in the upload.
    pub batch_count: usize,
    /// Records in this batch.
    pub records: usize,
}

/// Counts reported for an accepted batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records the API accepted the request for but rejected individually.
    pub line_errors: usize,
}

/// Observer interface for batch upload outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait UploadObserver: Send + Sync {
    /// Called when a batch is accepted.
    fn on_success(&self, _ctx: &BatchContext, _stats: BatchStats) {}

    /// Called when a batch fails.
    fn on_failure(&self, _ctx: &BatchContext, _severity: UploadSeverity, _error: &LoaderError) {}

    /// Called when a batch failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn UploadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn UploadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl UploadObserver for CompositeObserver {
    fn on_success(&self, ctx: &BatchContext, stats: BatchStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits batch events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_success(&self, ctx: &BatchContext, stats: BatchStats) {
        if stats.line_errors > 0 {
            tracing::warn!(
                table_id = %ctx.table_id,
                batch = ctx.batch_index + 1,
                of = ctx.batch_count,
                line_errors = stats.line_errors,
                "batch accepted with rejected records"
            );
        } else {
            tracing::info!(
                table_id = %ctx.table_id,
                batch = ctx.batch_index + 1,
                of = ctx.batch_count,
                created = stats.created,
                updated = stats.updated,
                unchanged = stats.unchanged,
                "batch uploaded"
            );
        }
    }

    fn on_failure(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        tracing::warn!(
            table_id = %ctx.table_id,
            batch = ctx.batch_index + 1,
            of = ctx.batch_count,
            ?severity,
            %error,
            "batch failed"
        );
    }

    fn on_alert(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        tracing::error!(
            table_id = %ctx.table_id,
            batch = ctx.batch_index + 1,
            of = ctx.batch_count,
            ?severity,
            %error,
            "ALERT: batch failed"
        );
    }
}

/// Appends batch events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", chrono::Utc::now().to_rfc3339());
        }
    }
}

impl UploadObserver for FileObserver {
    fn on_success(&self, ctx: &BatchContext, stats: BatchStats) {
        self.append_line(&format!(
            "ok table={} batch={}/{} records={} created={} updated={} unchanged={} line_errors={}",
            ctx.table_id,
            ctx.batch_index + 1,
            ctx.batch_count,
            ctx.records,
            stats.created,
            stats.updated,
            stats.unchanged,
            stats.line_errors
        ));
    }

    fn on_failure(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        self.append_line(&format!(
            "fail severity={:?} table={} batch={}/{} records={} err={}",
            severity,
            ctx.table_id,
            ctx.batch_index + 1,
            ctx.batch_count,
            ctx.records,
            error
        ));
    }

    fn on_alert(&self, ctx: &BatchContext, severity: UploadSeverity, error: &LoaderError) {
        self.append_line(&format!(
            "ALERT severity={:?} table={} batch={}/{} records={} err={}",
            severity,
            ctx.table_id,
            ctx.batch_index + 1,
            ctx.batch_count,
            ctx.records,
            error
        ));
    }
}
