use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

/// A unit of background work: probe or fetch one path on behalf of one
/// item-list generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub generation: u64,
    pub path: String,
}

/// FIFO work queue shared between the session and a pool of worker threads.
///
/// Paths are deduplicated while queued; `pop` blocks until work arrives or
/// the queue is closed.
#[derive(Clone, Debug)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug)]
struct QueueInner {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

#[derive(Debug, Default)]
struct QueueState {
    order: VecDeque<Job>,
    members: HashSet<String>,
    closed: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn enqueue(&self, job: Job) {
        self.enqueue_batch(std::iter::once(job));
    }

    pub fn enqueue_batch<I>(&self, jobs: I)
    where
        I: IntoIterator<Item = Job>,
    {
        let mut state = self.inner.state.lock().unwrap();
        if state.closed {
            return;
        }
        let mut inserted = false;
        for job in jobs {
            if state.members.insert(job.path.clone()) {
                state.order.push_back(job);
                inserted = true;
            }
        }
        if inserted {
            self.inner.condvar.notify_all();
        }
    }

    pub fn pop(&self) -> Option<Job> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(job) = state.order.pop_front() {
                state.members.remove(&job.path);
                return Some(job);
            }
            if state.closed {
                return None;
            }
            state = self.inner.condvar.wait(state).unwrap();
        }
    }

    /// Drops every queued job. In-flight jobs are unaffected; their results
    /// are filtered by generation on arrival.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.order.clear();
        state.members.clear();
    }

    /// Reorders queued jobs so that lower priority values pop first.
    pub fn reprioritize<F>(&self, mut priority: F)
    where
        F: FnMut(&str) -> f32,
    {
        let mut state = self.inner.state.lock().unwrap();
        if state.order.len() <= 1 {
            return;
        }
        let mut scored: Vec<(Job, f32)> = state
            .order
            .drain(..)
            .map(|job| {
                let score = priority(&job.path);
                (job, score)
            })
            .collect();
        scored.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for (job, _) in scored {
            state.order.push_back(job);
        }
    }

    pub fn close(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.closed = true;
        self.inner.condvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
