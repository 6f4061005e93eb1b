use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::queue::{Job, JobQueue};
use crate::source::PhotoSource;

/// Known width/height ratios, keyed by item path. Absent entries render at
/// the default ratio until a probe resolves. First resolution wins.
#[derive(Debug, Default)]
pub struct RatioStore {
    ratios: HashMap<String, f32>,
}

impl RatioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<f32> {
        self.ratios.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.ratios.contains_key(path)
    }

    /// Set-if-absent. Returns whether the entry was newly inserted; duplicate
    /// resolutions for the same path are no-ops.
    pub fn resolve(&mut self, path: &str, ratio: f32) -> bool {
        if !ratio.is_finite() || ratio <= 0.0 {
            return false;
        }
        if self.ratios.contains_key(path) {
            return false;
        }
        self.ratios.insert(path.to_string(), ratio);
        true
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

/// Completion events from the probe workers.
#[derive(Debug)]
pub enum RatioEvent {
    Resolved {
        generation: u64,
        path: String,
        ratio: f32,
    },
    Failed {
        generation: u64,
        path: String,
        error: String,
    },
}

impl RatioEvent {
    pub fn generation(&self) -> u64 {
        match self {
            RatioEvent::Resolved { generation, .. } | RatioEvent::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

/// Bounded pool of dimension-probe workers feeding from a FIFO queue.
pub struct RatioLoader {
    queue: JobQueue,
    event_rx: Receiver<RatioEvent>,
}

impl RatioLoader {
    pub fn new(source: Arc<dyn PhotoSource>, workers: usize) -> Self {
        let queue = JobQueue::new();
        let (event_tx, event_rx) = unbounded::<RatioEvent>();
        for worker_idx in 0..workers.max(1) {
            let queue = queue.clone();
            let source = Arc::clone(&source);
            let event_tx = event_tx.clone();
            let _ = thread::Builder::new()
                .name(format!("ratio-worker-{worker_idx}"))
                .spawn(move || run_worker(queue, source, event_tx));
        }
        Self { queue, event_rx }
    }

    pub fn request<I>(&self, jobs: I)
    where
        I: IntoIterator<Item = Job>,
    {
        self.queue.enqueue_batch(jobs);
    }

    /// Attempts to retrieve the next event from the workers without blocking.
    pub fn try_recv(&self) -> Result<RatioEvent, TryRecvError> {
        self.event_rx.try_recv()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_pending(&self) {
        self.queue.clear();
    }

    pub fn reprioritize<F>(&self, priority: F)
    where
        F: FnMut(&str) -> f32,
    {
        self.queue.reprioritize(priority);
    }

    pub fn close(&self) {
        self.queue.close();
    }
}

fn run_worker(queue: JobQueue, source: Arc<dyn PhotoSource>, event_tx: Sender<RatioEvent>) {
    while let Some(job) = queue.pop() {
        let event = match source.probe_dimensions(&job.path) {
            Ok((width, height)) if width > 0 && height > 0 => RatioEvent::Resolved {
                generation: job.generation,
                path: job.path,
                ratio: width as f32 / height as f32,
            },
            Ok((width, height)) => RatioEvent::Failed {
                generation: job.generation,
                path: job.path,
                error: format!("degenerate dimensions {width}x{height}"),
            },
            Err(err) => RatioEvent::Failed {
                generation: job.generation,
                path: job.path,
                error: format!("{err:#}"),
            },
        };
        if let RatioEvent::Failed { path, error, .. } = &event {
            log::debug!("ratio probe failed for {path}: {error}");
        }
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Duration;

    struct StubSource;

    impl PhotoSource for StubSource {
        fn probe_dimensions(&self, path: &str) -> anyhow::Result<(u32, u32)> {
            match path {
                "wide.jpg" => Ok((1600, 900)),
                "zero.jpg" => Ok((0, 100)),
                _ => Err(anyhow!("no such image")),
            }
        }

        fn fetch_metadata(&self, _path: &str) -> anyhow::Result<crate::source::PhotoMeta> {
            Ok(crate::source::PhotoMeta::default())
        }
    }

    fn recv_blocking(loader: &RatioLoader) -> RatioEvent {
        for _ in 0..200 {
            match loader.try_recv() {
                Ok(event) => return event,
                Err(TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Disconnected) => panic!("workers gone"),
            }
        }
        panic!("no event arrived");
    }

    #[test]
    fn store_first_resolution_wins() {
        let mut store = RatioStore::new();
        assert!(store.resolve("a", 1.5));
        assert!(!store.resolve("a", 2.0));
        assert_eq!(store.get("a"), Some(1.5));
    }

    #[test]
    fn store_rejects_degenerate_ratios() {
        let mut store = RatioStore::new();
        assert!(!store.resolve("a", 0.0));
        assert!(!store.resolve("a", f32::NAN));
        assert!(store.is_empty());
    }

    #[test]
    fn workers_probe_and_report() {
        let loader = RatioLoader::new(Arc::new(StubSource), 2);
        loader.request([Job {
            generation: 3,
            path: "wide.jpg".to_string(),
        }]);
        match recv_blocking(&loader) {
            RatioEvent::Resolved {
                generation,
                path,
                ratio,
            } => {
                assert_eq!(generation, 3);
                assert_eq!(path, "wide.jpg");
                assert!((ratio - 16.0 / 9.0).abs() < 1e-6);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
        loader.close();
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let _ = env_logger::builder().is_test(true).try_init();
        let loader = RatioLoader::new(Arc::new(StubSource), 1);
        loader.request([
            Job {
                generation: 1,
                path: "missing.jpg".to_string(),
            },
            Job {
                generation: 1,
                path: "zero.jpg".to_string(),
            },
            Job {
                generation: 1,
                path: "wide.jpg".to_string(),
            },
        ]);
        let mut resolved = 0;
        let mut failed = 0;
        for _ in 0..3 {
            match recv_blocking(&loader) {
                RatioEvent::Resolved { .. } => resolved += 1,
                RatioEvent::Failed { .. } => failed += 1,
            }
        }
        assert_eq!(resolved, 1);
        assert_eq!(failed, 2);
        loader.close();
    }
}
