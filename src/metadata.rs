use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::queue::{Job, JobQueue};
use crate::source::{PhotoMeta, PhotoSource};

/// Completion events from the metadata workers.
#[derive(Debug)]
pub enum MetaEvent {
    Loaded {
        generation: u64,
        path: String,
        meta: PhotoMeta,
    },
    Failed {
        generation: u64,
        path: String,
        error: String,
    },
}

impl MetaEvent {
    pub fn generation(&self) -> u64 {
        match self {
            MetaEvent::Loaded { generation, .. } | MetaEvent::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

/// Session-scoped metadata cache. Entries are never invalidated within a
/// session; failed paths stay absent and are not retried.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, PhotoMeta>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&PhotoMeta> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether a fetch for this path would do new work.
    pub fn wants(&self, path: &str) -> bool {
        !self.entries.contains_key(path)
            && !self.in_flight.contains(path)
            && !self.failed.contains(path)
    }

    pub fn mark_in_flight(&mut self, path: &str) {
        self.in_flight.insert(path.to_string());
    }

    /// Set-if-absent merge; a racing duplicate never overwrites.
    pub fn complete_loaded(&mut self, path: &str, meta: PhotoMeta) -> bool {
        self.in_flight.remove(path);
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.to_string(), meta);
        true
    }

    pub fn complete_failed(&mut self, path: &str) {
        self.in_flight.remove(path);
        self.failed.insert(path.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bounded pool of metadata-fetch workers. One failed path never blocks the
/// rest of its batch; each job completes independently.
pub struct MetadataLoader {
    queue: JobQueue,
    event_rx: Receiver<MetaEvent>,
}

impl MetadataLoader {
    pub fn new(source: Arc<dyn PhotoSource>, workers: usize) -> Self {
        let queue = JobQueue::new();
        let (event_tx, event_rx) = unbounded::<MetaEvent>();
        for worker_idx in 0..workers.max(1) {
            let queue = queue.clone();
            let source = Arc::clone(&source);
            let event_tx = event_tx.clone();
            let _ = thread::Builder::new()
                .name(format!("meta-worker-{worker_idx}"))
                .spawn(move || run_worker(queue, source, event_tx));
        }
        Self { queue, event_rx }
    }

    /// Fire-and-forget: queues fetches for every path the cache still wants,
    /// marking them in flight.
    pub fn ensure_loaded<'a, I>(&self, cache: &mut MetadataCache, generation: u64, paths: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut jobs = Vec::new();
        for path in paths {
            if cache.wants(path) {
                cache.mark_in_flight(path);
                jobs.push(Job {
                    generation,
                    path: path.to_string(),
                });
            }
        }
        if !jobs.is_empty() {
            log::debug!("queueing {} metadata fetches", jobs.len());
            self.queue.enqueue_batch(jobs);
        }
    }

    pub fn try_recv(&self) -> Result<MetaEvent, TryRecvError> {
        self.event_rx.try_recv()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_pending(&self) {
        self.queue.clear();
    }

    pub fn close(&self) {
        self.queue.close();
    }
}

fn run_worker(queue: JobQueue, source: Arc<dyn PhotoSource>, event_tx: Sender<MetaEvent>) {
    while let Some(job) = queue.pop() {
        let event = match source.fetch_metadata(&job.path) {
            Ok(meta) => MetaEvent::Loaded {
                generation: job.generation,
                path: job.path,
                meta,
            },
            Err(err) => MetaEvent::Failed {
                generation: job.generation,
                path: job.path,
                error: format!("{err:#}"),
            },
        };
        if let MetaEvent::Failed { path, error, .. } = &event {
            log::debug!("metadata fetch failed for {path}: {error}");
        }
        if event_tx.send(event).is_err() {
            break;
        }
    }
}
