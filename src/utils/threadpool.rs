//! Thread pool utilities
use std::sync::{
    Arc, Mutex, MutexGuard,
    mpsc::{Receiver, SyncSender, sync_channel},
};
use std::thread::{self, JoinHandle};

type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// A fixed size pool of worker threads.
///
/// - T: the return type of tasks. Results are collected in completion order.
/// - The submission channel is bounded to the pool size, so [ThreadPool::execute] blocks
///   while every worker is busy and the queue is full.
pub struct ThreadPool<T: Send + 'static> {
    sender: Option<SyncSender<Job<T>>>,
    workers: Vec<JoinHandle<()>>,
    results: Arc<Mutex<Vec<T>>>,
    size: usize,
}

#[derive(Debug)]
/// Error type for [ThreadPool::execute]
pub struct PoolClosed;

impl std::error::Error for PoolClosed {}

impl std::fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ThreadPool is closed")
    }
}

impl<T: Send + 'static> ThreadPool<T> {
    /// Get the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Create a new thread pool with `size` workers named `{name}{index}`.
    pub fn new(size: usize, name: &str) -> Result<Self, std::io::Error> {
        if size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "worker size must be > 0",
            ));
        }

        let (tx, rx) = sync_channel::<Job<T>>(size);
        let receiver: Arc<Mutex<Receiver<Job<T>>>> = Arc::new(Mutex::new(rx));
        let results = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let rx = Arc::clone(&receiver);
            let results = Arc::clone(&results);
            let handle = thread::Builder::new()
                .name(format!("{}{}", name, id))
                .spawn(move || {
                    loop {
                        // The guard is dropped before the job runs.
                        let job = lock(&rx).recv();
                        match job {
                            Ok(job) => {
                                let res = job();
                                lock(&results).push(res);
                            }
                            // Sender dropped
                            Err(_) => break,
                        }
                    }
                })?;
            workers.push(handle);
        }

        Ok(ThreadPool {
            sender: Some(tx),
            workers,
            results,
            size,
        })
    }

    /// Queue a task, blocking while the queue is full.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolClosed>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolClosed)?;
        sender.send(Box::new(job)).map_err(|_| PoolClosed)
    }

    /// Wait until all submitted tasks have completed, then return the results.
    pub fn into_results(mut self) -> Vec<T> {
        self.shutdown();
        let results = std::mem::take(&mut *lock(&self.results));
        results
    }

    fn shutdown(&mut self) {
        self.sender.take();
        while let Some(handle) = self.workers.pop() {
            if handle.join().is_err() {
                log::warn!("A worker thread panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[test]
fn test_pool_runs_everything() {
    let pool = ThreadPool::new(3, "test-worker-").unwrap();
    assert_eq!(pool.size(), 3);
    for i in 0..20usize {
        pool.execute(move || i * 2).unwrap();
    }
    let mut results = pool.into_results();
    results.sort();
    assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<_>>());
}

#[test]
fn test_zero_workers_rejected() {
    assert!(ThreadPool::<()>::new(0, "none-").is_err());
}
