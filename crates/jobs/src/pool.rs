// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool: one thread bound to each queue.

use crate::job::{Job, JobKind, JobPayload};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Worker stacks are raised well above the platform default to tolerate
/// deep I/O library call chains.
const WORKER_STACK_SIZE: usize = 4 * 1024 * 1024;

enum QueueItem {
    Run(Job),
    Stop,
}

struct Queue {
    items: Mutex<VecDeque<QueueItem>>,
    /// Signaled on submit.
    new_job: Condvar,
    /// Broadcast after each completed job, for wait_step observers.
    job_done: Condvar,
    /// Jobs submitted and not yet completed. Written under the lock, read
    /// relaxed for cheap introspection.
    pending: AtomicUsize,
}

impl Queue {
    fn new() -> Self {
        Queue {
            items: Mutex::new(VecDeque::new()),
            new_job: Condvar::new(),
            job_done: Condvar::new(),
            pending: AtomicUsize::new(0),
        }
    }
}

/// Pool of three background workers, one per [`JobKind`] queue.
///
/// Jobs in one queue run strictly in submission order; queues are
/// independent of each other. Completion is never reported back; call
/// [`BackgroundPool::wait_step`] in a loop to observe drain progress.
pub struct BackgroundPool {
    queues: [Arc<Queue>; 3],
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundPool {
    /// Spawn the three workers. Fails only if thread creation does.
    pub fn new() -> io::Result<Self> {
        let queues = [Arc::new(Queue::new()), Arc::new(Queue::new()), Arc::new(Queue::new())];
        let mut workers = Vec::with_capacity(JobKind::ALL.len());
        for kind in JobKind::ALL {
            let queue = Arc::clone(&queues[kind.id()]);
            let handle = std::thread::Builder::new()
                .name(format!("ember-bg-{}", kind.name()))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(move || worker_loop(&queue, kind))?;
            workers.push(handle);
        }
        Ok(BackgroundPool { queues, workers: Mutex::new(workers) })
    }

    /// Enqueue; returns immediately. Thread-safe.
    pub fn submit(&self, payload: JobPayload) {
        let queue = &self.queues[payload.kind().id()];
        let mut items = queue.items.lock();
        items.push_back(QueueItem::Run(Job::new(payload)));
        queue.pending.fetch_add(1, Ordering::Relaxed);
        queue.new_job.notify_one();
    }

    /// Snapshot of jobs submitted to `kind` and not yet completed.
    pub fn pending(&self, kind: JobKind) -> usize {
        self.queues[kind.id()].pending.load(Ordering::Relaxed)
    }

    /// If work is pending on `kind`, block until at least one more job
    /// completes. Returns the updated pending count.
    pub fn wait_step(&self, kind: JobKind) -> usize {
        let queue = &self.queues[kind.id()];
        let mut items = queue.items.lock();
        if queue.pending.load(Ordering::Relaxed) > 0 {
            queue.job_done.wait(&mut items);
        }
        queue.pending.load(Ordering::Relaxed)
    }

    /// Stop all workers, jumping the queues rather than draining them.
    /// Jobs not yet started are dropped, which releases whatever they own.
    pub fn shutdown(&self) {
        for queue in &self.queues {
            let mut items = queue.items.lock();
            items.push_front(QueueItem::Stop);
            queue.new_job.notify_one();
        }
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("background worker exited abnormally");
            }
        }
    }
}

impl Drop for BackgroundPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(queue: &Queue, kind: JobKind) {
    mask_watchdog_signal(kind);
    tracing::debug!(queue = kind.name(), "background worker started");
    loop {
        let item = {
            let mut items = queue.items.lock();
            loop {
                match items.pop_front() {
                    Some(item) => break item,
                    None => queue.new_job.wait(&mut items),
                }
            }
        };
        let job = match item {
            QueueItem::Stop => break,
            QueueItem::Run(job) => job,
        };
        run_job(job, kind);
        let _items = queue.items.lock();
        queue.pending.fetch_sub(1, Ordering::Relaxed);
        queue.job_done.notify_all();
    }
    tracing::debug!(queue = kind.name(), "background worker stopped");
}

fn run_job(job: Job, kind: JobKind) {
    let queued_for = job.queued_at.elapsed();
    match job.payload {
        JobPayload::CloseFile(fd) => drop(fd),
        JobPayload::Fsync(file) => {
            // sync_data maps to the platform's cheaper data-only sync
            // (fdatasync on Linux) and falls back to a full fsync.
            if let Err(err) = file.sync_data() {
                tracing::warn!(error = %err, "background fsync failed");
            }
        }
        JobPayload::LazyFree(value) => drop(value),
    }
    tracing::trace!(queue = kind.name(), queued_for_ms = queued_for.as_millis() as u64, "job done");
}

/// The process watchdog timer must interrupt only the reactor thread.
fn mask_watchdog_signal(kind: JobKind) {
    use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};

    let mut set = SigSet::empty();
    set.add(Signal::SIGALRM);
    if let Err(err) = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), None) {
        tracing::warn!(queue = kind.name(), error = %err, "failed to mask SIGALRM");
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
