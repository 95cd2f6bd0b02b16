use crate::error::{LoaderError, LoaderResult};

/// Maximum records per upload request.
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Split `records` into consecutive batches of at most `max_size` items, preserving order.
///
/// Every batch but the last has exactly `max_size` items. No input yields no batches.
///
/// ```rust
/// use qbase_loader::processing::batch;
///
/// let batches = batch((0..5).collect::<Vec<_>>(), 2).unwrap();
/// assert_eq!(batches, vec![vec![0, 1], vec![2, 3], vec![4]]);
/// ```
pub fn batch<T>(records: Vec<T>, max_size: usize) -> LoaderResult<Vec<Vec<T>>> {
    if max_size == 0 {
        return Err(LoaderError::InvalidBatchSize(max_size));
    }

    let mut batches = Vec::with_capacity(records.len().div_ceil(max_size));
    let mut iter = records.into_iter();
    loop {
        let chunk: Vec<T> = iter.by_ref().take(max_size).collect();
        if chunk.is_empty() {
            break;
        }
        batches.push(chunk);
    }
    Ok(batches)
}
