//! Batch upload driver.
//!
//! [`upload_batches`] sends prepared batches with one of two models:
//!
//! - [`UploadMode::Sequential`]: one request at a time, in order, stopping at the first failed
//!   batch. Batches after the failure are not attempted.
//! - [`UploadMode::Concurrent`]: every batch is attempted, at most `max_in_flight` at once, and
//!   every outcome is collected.
//!
//! Either way the caller gets an [`UploadReport`] with one [`BatchOutcome`] per attempted batch.
//! Batches that were accepted before a failure are not rolled back, and nothing is retried.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{LoaderError, LoaderResult};
use crate::processing::{
    assemble, batch, transform, Declarations, FieldIdMap, Record, DEFAULT_BATCH_SIZE,
};
use crate::types::DataSet;

use super::client::{RecordsClient, UpsertOptions, UpsertResponse};
use super::observer::{BatchContext, BatchStats, UploadObserver, UploadSeverity};

/// How batches are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    /// One batch at a time; stop at the first failure.
    #[default]
    Sequential,
    /// Up to `max_in_flight` concurrent requests; attempt every batch.
    Concurrent { max_in_flight: usize },
}

/// Options controlling an upload.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct UploadOptions {
    /// Maximum records per request.
    pub batch_size: usize,
    /// Sequential or concurrent sending.
    pub mode: UploadMode,
    /// Per-request upsert parameters.
    pub upsert: UpsertOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn UploadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: UploadSeverity,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("batch_size", &self.batch_size)
            .field("mode", &self.mode)
            .field("upsert", &self.upsert)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            mode: UploadMode::default(),
            upsert: UpsertOptions::default(),
            observer: None,
            alert_at_or_above: UploadSeverity::Critical,
        }
    }
}

/// Result of sending one batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// 0-based batch index.
    pub index: usize,
    /// Records in the batch.
    pub records: usize,
    pub result: LoaderResult<UpsertResponse>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-batch outcomes of an upload.
#[derive(Debug)]
pub struct UploadReport {
    pub table_id: String,
    /// Number of batches the records were split into.
    pub batch_count: usize,
    /// Outcomes of the attempted batches, by batch index.
    pub outcomes: Vec<BatchOutcome>,
}

impl UploadReport {
    /// True when every batch was attempted and accepted.
    pub fn is_success(&self) -> bool {
        self.outcomes.len() == self.batch_count && self.outcomes.iter().all(BatchOutcome::is_success)
    }

    /// Outcomes of rejected batches.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Batches never sent (sequential mode stops at the first failure).
    pub fn skipped(&self) -> usize {
        self.batch_count - self.outcomes.len()
    }

    /// Records in accepted batches.
    pub fn records_sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.records)
            .sum()
    }

    /// Created/updated/unchanged/line-error totals across accepted batches.
    pub fn totals(&self) -> BatchStats {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(stats_for)
            .fold(BatchStats::default(), |acc, s| BatchStats {
                created: acc.created + s.created,
                updated: acc.updated + s.updated,
                unchanged: acc.unchanged + s.unchanged,
                line_errors: acc.line_errors + s.line_errors,
            })
    }

    /// Turn the report into an error when any batch failed (the first failure by index).
    pub fn into_result(mut self) -> LoaderResult<Self> {
        if let Some(failed) = self.outcomes.iter_mut().find(|o| !o.is_success()) {
            if let Err(e) = std::mem::replace(&mut failed.result, Ok(UpsertResponse::default())) {
                return Err(e);
            }
        }
        Ok(self)
    }
}

fn stats_for(resp: &UpsertResponse) -> BatchStats {
    let m = &resp.metadata;
    BatchStats {
        created: m.created_record_ids.len(),
        updated: m.updated_record_ids.len(),
        unchanged: m.unchanged_record_ids.len(),
        line_errors: m.line_errors.len(),
    }
}

/// Send prepared batches to `table_id`.
pub async fn upload_batches(
    client: &RecordsClient,
    table_id: &str,
    batches: Vec<Vec<Record>>,
    options: &UploadOptions,
) -> UploadReport {
    let batch_count = batches.len();
    debug!(table_id, batch_count, mode = ?options.mode, "uploading batches");

    let outcomes = match options.mode {
        UploadMode::Sequential => send_sequential(client, table_id, batches, options).await,
        UploadMode::Concurrent { max_in_flight } => {
            send_concurrent(client, table_id, batches, max_in_flight, options).await
        }
    };

    let report = UploadReport {
        table_id: table_id.to_string(),
        batch_count,
        outcomes,
    };
    let totals = report.totals();
    info!(
        table_id,
        batches = batch_count,
        failed = report.failures().count(),
        skipped = report.skipped(),
        records_sent = report.records_sent(),
        created = totals.created,
        updated = totals.updated,
        "upload finished"
    );
    report
}

/// Transform, assemble, batch and send `dataset` in one call.
///
/// Configuration and data errors are returned before anything is sent. Transport failures are
/// reported per batch in the [`UploadReport`].
pub async fn upload(
    client: &RecordsClient,
    table_id: &str,
    dataset: &DataSet,
    declarations: &Declarations,
    field_ids: &FieldIdMap,
    options: &UploadOptions,
) -> LoaderResult<UploadReport> {
    let packed = transform(dataset, declarations)?;
    let records = assemble(&packed, field_ids)?;
    let batches = batch(records, options.batch_size)?;
    Ok(upload_batches(client, table_id, batches, options).await)
}

async fn send_sequential(
    client: &RecordsClient,
    table_id: &str,
    batches: Vec<Vec<Record>>,
    options: &UploadOptions,
) -> Vec<BatchOutcome> {
    let batch_count = batches.len();
    let mut outcomes = Vec::with_capacity(batch_count);
    for (index, records) in batches.iter().enumerate() {
        let result = client.upsert(table_id, records, &options.upsert).await;
        let outcome = BatchOutcome {
            index,
            records: records.len(),
            result,
        };
        notify(table_id, batch_count, &outcome, options);
        let failed = !outcome.is_success();
        outcomes.push(outcome);
        if failed {
            warn!(table_id, batch = index + 1, "stopping upload after failed batch");
            break;
        }
    }
    outcomes
}

async fn send_concurrent(
    client: &RecordsClient,
    table_id: &str,
    batches: Vec<Vec<Record>>,
    max_in_flight: usize,
    options: &UploadOptions,
) -> Vec<BatchOutcome> {
    let batch_count = batches.len();
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));

    let mut handles = Vec::with_capacity(batch_count);
    for records in batches {
        let semaphore = Arc::clone(&semaphore);
        let client = client.clone();
        let table_id = table_id.to_string();
        let upsert = options.upsert.clone();
        handles.push((
            records.len(),
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                client.upsert(&table_id, &records, &upsert).await
            }),
        ));
    }

    let mut outcomes = Vec::with_capacity(batch_count);
    for (index, (records, handle)) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(LoaderError::from(join_err)),
        };
        let outcome = BatchOutcome {
            index,
            records,
            result,
        };
        notify(table_id, batch_count, &outcome, options);
        outcomes.push(outcome);
    }
    outcomes
}

fn notify(table_id: &str, batch_count: usize, outcome: &BatchOutcome, options: &UploadOptions) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    let ctx = BatchContext {
        table_id: table_id.to_string(),
        batch_index: outcome.index,
        batch_count,
        records: outcome.records,
    };
    match &outcome.result {
        Ok(resp) => obs.on_success(&ctx, stats_for(resp)),
        Err(e) => {
            let sev = UploadSeverity::for_error(e);
            obs.on_failure(&ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(&ctx, sev, e);
            }
        }
    }
}
