//! Generic multithreaded producer/consumer pipeline.
//!
//! A fixed pool of OS threads drains one shared FIFO guarded by a mutex
//! and condition variable. Each thread owns a private, long-lived worker
//! built from a factory, so worker scratch state is never shared. The
//! queue is unbounded: `enqueue` never blocks the producer.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Caller-defined unit count of a queue item, accumulated into the
/// processed/enqueued totals (e.g. number of queries in a batch).
pub trait Workload {
    fn weight(&self) -> usize {
        1
    }
}

/// A processing object owned by exactly one pool thread.
pub trait Worker {
    type Item: Workload + Send + 'static;

    fn process(&mut self, item: Self::Item);
}

pub type OnProcessedCallback = Box<dyn Fn(usize, usize) + Send>;

const DONE_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct State<I> {
    queue: VecDeque<I>,
    stop: bool,
    working: usize,
    total_enqueued: usize,
    total_processed: usize,
    callbacks: Vec<OnProcessedCallback>,
}

struct Shared<I> {
    state: Mutex<State<I>>,
    available: Condvar,
}

impl<I> Shared<I> {
    fn lock(&self) -> MutexGuard<'_, State<I>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct WorkerQueue<I> {
    shared: Arc<Shared<I>>,
    threads: Vec<JoinHandle<()>>,
}

impl<I: Workload + Send + 'static> WorkerQueue<I> {
    /// Spawn `num_workers` threads (0 means hardware concurrency), each
    /// constructing its own worker from the factory.
    pub fn new<W, F>(num_workers: usize, make_worker: F) -> Self
    where
        W: Worker<Item = I> + 'static,
        F: Fn() -> W + Send + Sync + 'static,
    {
        let num_workers = if num_workers == 0 {
            num_cpus::get()
        } else {
            num_workers
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                stop: false,
                working: 0,
                total_enqueued: 0,
                total_processed: 0,
                callbacks: Vec::new(),
            }),
            available: Condvar::new(),
        });

        let make_worker = Arc::new(make_worker);
        let threads = (0..num_workers)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let make_worker = Arc::clone(&make_worker);
                thread::spawn(move || worker_loop(&shared, make_worker()))
            })
            .collect();

        Self { shared, threads }
    }

    /// Push an item and wake one waiting worker. Never blocks.
    pub fn enqueue(&self, item: I) {
        {
            let mut state = self.shared.lock();
            state.total_enqueued += item.weight();
            state.queue.push_back(item);
        }
        self.shared.available.notify_one();
    }

    /// Queue empty and no worker mid-item.
    pub fn done(&self) -> bool {
        let state = self.shared.lock();
        state.working == 0 && state.queue.is_empty()
    }

    pub fn wait_till_done(&self) {
        while !self.done() {
            thread::sleep(DONE_POLL_INTERVAL);
        }
    }

    /// Register a `(processed_total, enqueued_total)` observer, fired
    /// under the queue lock after every processed item.
    pub fn on_processed(&self, callback: impl Fn(usize, usize) + Send + 'static) {
        self.shared.lock().callbacks.push(Box::new(callback));
    }
}

impl<I> Drop for WorkerQueue<I> {
    /// Signal stop and join. In-flight items finish; items still queued
    /// are dropped.
    fn drop(&mut self) {
        self.shared.lock().stop = true;
        self.shared.available.notify_all();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<I, W>(shared: &Shared<I>, mut worker: W)
where
    I: Workload + Send + 'static,
    W: Worker<Item = I>,
{
    loop {
        let item = {
            let mut state = shared.lock();
            while !state.stop && state.queue.is_empty() {
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            if state.stop {
                return;
            }
            let Some(item) = state.queue.pop_front() else {
                continue;
            };
            state.working += 1;
            item
        };

        let weight = item.weight();
        worker.process(item);

        let mut state = shared.lock();
        state.total_processed += weight;
        state.working -= 1;
        for callback in &state.callbacks {
            callback(state.total_processed, state.total_enqueued);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Batch(Vec<u32>);

    impl Workload for Batch {
        fn weight(&self) -> usize {
            self.0.len()
        }
    }

    struct Summer {
        sum: Arc<AtomicUsize>,
    }

    impl Worker for Summer {
        type Item = Batch;

        fn process(&mut self, item: Batch) {
            let total: u32 = item.0.iter().sum();
            self.sum.fetch_add(total as usize, Ordering::SeqCst);
        }
    }

    #[test]
    fn processes_every_item_with_weight_accounting() {
        let sum = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(AtomicUsize::new(0));

        let worker_sum = Arc::clone(&sum);
        let queue = WorkerQueue::new(4, move || Summer {
            sum: Arc::clone(&worker_sum),
        });

        let observer = Arc::clone(&observed);
        queue.on_processed(move |processed, enqueued| {
            assert!(processed <= enqueued);
            observer.store(processed, Ordering::SeqCst);
        });

        let mut expected_weight = 0;
        for batch in 0..16u32 {
            let items: Vec<u32> = (0..=batch).collect();
            expected_weight += items.len();
            queue.enqueue(Batch(items));
        }
        queue.wait_till_done();

        // every callback fired before done() went true
        assert_eq!(observed.load(Ordering::SeqCst), expected_weight);
        let expected_sum: u32 = (0..16u32).map(|b| (0..=b).sum::<u32>()).sum();
        assert_eq!(sum.load(Ordering::SeqCst), expected_sum as usize);
    }

    #[test]
    fn each_thread_owns_a_private_worker() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Counting;
        impl Worker for Counting {
            type Item = Batch;
            fn process(&mut self, _item: Batch) {}
        }

        let queue = WorkerQueue::new(3, || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counting
        });
        queue.enqueue(Batch(vec![1]));
        queue.wait_till_done();
        drop(queue);
        assert_eq!(BUILT.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn drop_joins_after_in_flight_items_finish() {
        let sum = Arc::new(AtomicUsize::new(0));
        let worker_sum = Arc::clone(&sum);
        let queue = WorkerQueue::new(2, move || Summer {
            sum: Arc::clone(&worker_sum),
        });
        queue.enqueue(Batch(vec![5, 5]));
        queue.wait_till_done();
        drop(queue);
        assert_eq!(sum.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn done_is_true_for_an_idle_queue() {
        let sum = Arc::new(AtomicUsize::new(0));
        let worker_sum = Arc::clone(&sum);
        let queue = WorkerQueue::new(1, move || Summer {
            sum: Arc::clone(&worker_sum),
        });
        assert!(queue.done());
    }
}
