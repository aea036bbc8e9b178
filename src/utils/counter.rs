//! A simple counter for tracking per-file results.
use crate::anon::FileOutcome;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;

/// A counter for tracking per-file results. Safe to share between workers.
#[derive(Debug, Default)]
pub struct Counter {
    rewritten: AtomicUsize,
    unrecognized: AtomicUsize,
    mismatch: AtomicUsize,
    error: AtomicUsize,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a file outcome.
    pub fn inc(&self, outcome: &FileOutcome) {
        let slot = match outcome {
            FileOutcome::Rewritten => &self.rewritten,
            FileOutcome::SkippedUnrecognized(_) => &self.unrecognized,
            FileOutcome::SkippedMismatch(_) => &self.mismatch,
            FileOutcome::Failed(_) => &self.error,
        };
        slot.fetch_add(1, SeqCst);
    }

    pub fn rewritten(&self) -> usize {
        self.rewritten.load(SeqCst)
    }

    /// True when any file failed or could not be validated.
    pub fn has_failures(&self) -> bool {
        self.mismatch.load(SeqCst) + self.error.load(SeqCst) > 0
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rewritten: {}, Unrecognized: {}, Mismatch: {}, Error: {}",
            self.rewritten.load(SeqCst),
            self.unrecognized.load(SeqCst),
            self.mismatch.load(SeqCst),
            self.error.load(SeqCst),
        )
    }
}

#[test]
fn test_counter_tally() {
    use crate::anon::AnonError;
    use std::path::PathBuf;
    let counter = Counter::new();
    counter.inc(&FileOutcome::Rewritten);
    counter.inc(&FileOutcome::Rewritten);
    counter.inc(&FileOutcome::Failed(AnonError::TempFileConflict {
        path: PathBuf::from("a.tmp"),
    }));
    assert!(counter.has_failures());
    assert_eq!(counter.rewritten(), 2);
    assert_eq!(
        counter.to_string(),
        "Rewritten: 2, Unrecognized: 0, Mismatch: 0, Error: 1"
    );
}
