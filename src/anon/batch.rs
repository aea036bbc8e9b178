//! Running the anonymizer over many files.
use super::{Anonymizer, FileOutcome};
use crate::pex::DocumentCodec;
use crate::utils::counter::Counter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves the requested worker count. `0` means one worker per CPU.
#[cfg(feature = "threadpool")]
pub fn worker_count(jobs: usize) -> usize {
    if jobs == 0 {
        return num_cpus::get().max(1);
    }
    jobs
}

/// Resolves the requested worker count. Without thread pool support everything runs on
/// the calling thread.
#[cfg(not(feature = "threadpool"))]
pub fn worker_count(_jobs: usize) -> usize {
    1
}

/// Anonymizes `files` with up to `jobs` workers and counts every outcome.
///
/// Results come back in the order of `files` whatever order the workers finish in.
pub fn run<C: DocumentCodec + 'static>(
    anonymizer: Arc<Anonymizer<C>>,
    files: Vec<PathBuf>,
    jobs: usize,
    counter: &Counter,
) -> std::io::Result<Vec<(PathBuf, FileOutcome)>> {
    let workers = worker_count(jobs).min(files.len());
    let results = if workers > 1 {
        run_parallel(anonymizer, files, workers)?
    } else {
        run_sequential(&anonymizer, files)
    };
    for (_, outcome) in results.iter() {
        counter.inc(outcome);
    }
    Ok(results)
}

fn process<C: DocumentCodec>(anonymizer: &Anonymizer<C>, path: &Path) -> FileOutcome {
    log::debug!("Anonymizing {}", path.display());
    anonymizer.anonymize_file(path)
}

fn run_sequential<C: DocumentCodec>(
    anonymizer: &Anonymizer<C>,
    files: Vec<PathBuf>,
) -> Vec<(PathBuf, FileOutcome)> {
    files
        .into_iter()
        .map(|path| {
            let outcome = process(anonymizer, &path);
            (path, outcome)
        })
        .collect()
}

#[cfg(feature = "threadpool")]
fn run_parallel<C: DocumentCodec + 'static>(
    anonymizer: Arc<Anonymizer<C>>,
    files: Vec<PathBuf>,
    workers: usize,
) -> std::io::Result<Vec<(PathBuf, FileOutcome)>> {
    use crate::utils::threadpool::ThreadPool;
    log::debug!("Using {} workers", workers);
    let pool = ThreadPool::new(workers, "pex-anon-worker-")?;
    for (index, path) in files.into_iter().enumerate() {
        let anonymizer = Arc::clone(&anonymizer);
        pool.execute(move || {
            let outcome = process(&anonymizer, &path);
            (index, path, outcome)
        })
        .map_err(std::io::Error::other)?;
    }
    let mut results = pool.into_results();
    results.sort_by_key(|(index, _, _)| *index);
    Ok(results
        .into_iter()
        .map(|(_, path, outcome)| (path, outcome))
        .collect())
}

#[cfg(not(feature = "threadpool"))]
fn run_parallel<C: DocumentCodec + 'static>(
    anonymizer: Arc<Anonymizer<C>>,
    files: Vec<PathBuf>,
    _workers: usize,
) -> std::io::Result<Vec<(PathBuf, FileOutcome)>> {
    Ok(run_sequential(&anonymizer, files))
}
