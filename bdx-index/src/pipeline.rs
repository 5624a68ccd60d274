//! Parallel parse → sequential commit. Workers run on a `rayon` pool instead
//! of separate OS processes (Rust's memory safety makes process isolation
//! unnecessary); a panicking or hanging parse is caught per-file and never
//! takes the run down.

use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::error::{IndexError, Result};
use crate::options::IndexerOptions;
use crate::workset::{Candidate, WorkSet};

/// No worker is expected to take anywhere near this long; it exists purely
/// so one pathological `.o` file can't stall an entire run.
const PARSE_BUDGET: Duration = Duration::from_secs(30);

/// Files per batch between write-buffer flush and cancellation checks. Small
/// enough that a cancel request or a backpressure flush doesn't wait for the
/// whole run, large enough that `rayon` still gets real parallel work per
/// batch.
const BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug)]
pub struct RunReport {
    pub files_indexed: usize,
    pub files_removed: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub failures: Vec<FileFailure>,
    pub total_symbols: usize,
    pub shard_id: Option<String>,
    pub duration: Duration,
}

enum FileOutcome {
    Parsed { path: String, mtime_ns: u64, records: Vec<bdx_schema::SymbolRecord> },
    Failed(FileFailure),
}

#[instrument(skip(store, work, opts, cancel))]
pub fn run(
    store: &bdx_store::Store,
    work: WorkSet,
    opts: &IndexerOptions,
    cancel: &bdx_store::CancelToken,
) -> Result<RunReport> {
    let start = Instant::now();
    let mut txn = store.begin_write()?;

    let files_removed = work.removed.len();
    for path in &work.removed {
        txn.remove_file(path);
    }

    let to_parse: Vec<Candidate> = work.added.into_iter().chain(work.changed).collect();
    let parse_opts = opts.elf_parse_options();

    let pool = if opts.num_processes > 0 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(opts.num_processes)
                .build()
                .map_err(|e| IndexError::PoolBuild(opts.num_processes, e))?,
        )
    } else {
        None
    };

    let mut files_indexed = 0usize;
    let mut total_symbols = 0usize;
    let mut failures = Vec::new();

    for batch in to_parse.chunks(BATCH_SIZE) {
        if cancel.is_cancelled() {
            warn!("cancellation requested, discarding in-progress run");
            txn.cancel()?;
            return Err(bdx_store::StoreError::Cancelled.into());
        }

        let outcomes: Vec<FileOutcome> = match &pool {
            Some(pool) => {
                pool.install(|| batch.par_iter().map(|c| parse_one(c, &parse_opts)).collect())
            }
            None => batch.par_iter().map(|c| parse_one(c, &parse_opts)).collect(),
        };

        for outcome in outcomes {
            match outcome {
                FileOutcome::Parsed { path, mtime_ns, records } => {
                    total_symbols += records.len();
                    txn.add_file(&path, mtime_ns, records);
                    files_indexed += 1;
                }
                FileOutcome::Failed(failure) => {
                    warn!(path = %failure.path, error = %failure.message, "file parse failed, skipping");
                    failures.push(failure);
                }
            }
        }

        txn.flush_write_buffer(opts.write_buffer_bytes)?;
    }

    if cancel.is_cancelled() {
        warn!("cancellation requested before commit, discarding run");
        txn.cancel()?;
        return Err(bdx_store::StoreError::Cancelled.into());
    }

    let shard_id = if txn.shard_record_count() > 0 { Some(txn.commit()?) } else {
        txn.commit()?;
        None
    };

    let duration = start.elapsed();
    info!(
        indexed = files_indexed,
        removed = files_removed,
        failed = failures.len(),
        symbols = total_symbols,
        duration_secs = %format!("{:.2}", duration.as_secs_f64()),
        "indexing run complete"
    );

    Ok(RunReport {
        files_indexed,
        files_removed,
        files_unchanged: work.unchanged,
        files_failed: failures.len(),
        failures,
        total_symbols,
        shard_id,
        duration,
    })
}

/// Parse one file on a dedicated thread and wait for it with a budget. A
/// panic inside the parser is caught; a parse that outruns the budget is
/// abandoned (its thread keeps running to completion in the background,
/// un-joined, but nothing else in the run waits on it).
fn parse_one(candidate: &Candidate, opts: &bdx_elf::ParseOptions) -> FileOutcome {
    let path = std::path::PathBuf::from(&candidate.path);
    let mtime_ns = candidate.mtime_ns;
    let opts = opts.clone();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| bdx_elf::parse(&path, mtime_ns, &opts)));
        let _ = tx.send(result);
    });

    match rx.recv_timeout(PARSE_BUDGET) {
        Ok(Ok(Ok(records))) => FileOutcome::Parsed { path: candidate.path.clone(), mtime_ns, records },
        Ok(Ok(Err(e))) => FileOutcome::Failed(FileFailure { path: candidate.path.clone(), message: e.to_string() }),
        Ok(Err(_panic)) => {
            FileOutcome::Failed(FileFailure { path: candidate.path.clone(), message: "parser panicked".to_string() })
        }
        Err(mpsc::RecvTimeoutError::Timeout) => FileOutcome::Failed(FileFailure {
            path: candidate.path.clone(),
            message: format!("parse exceeded {:?} budget", PARSE_BUDGET),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => FileOutcome::Failed(FileFailure {
            path: candidate.path.clone(),
            message: "parser thread vanished without a result".to_string(),
        }),
    }
}
