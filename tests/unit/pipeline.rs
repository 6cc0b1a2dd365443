//! Worker-queue driven search feeding a writer, the way the CLI wires it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rusearch::alphabet::Dna;
use rusearch::index::Database;
use rusearch::queue::{Worker, WorkerQueue, Workload};
use rusearch::report::{HitSink, TabularWriter};
use rusearch::search::{GlobalSearch, QueryHits, SearchParams};
use rusearch::sequence::Sequence;

struct QueryBatch(Vec<Sequence>);

impl Workload for QueryBatch {
    fn weight(&self) -> usize {
        self.0.len()
    }
}

struct SearchWorker {
    search: GlobalSearch<Dna>,
    results: Arc<Mutex<Vec<QueryHits>>>,
}

impl Worker for SearchWorker {
    type Item = QueryBatch;

    fn process(&mut self, batch: QueryBatch) {
        for query in batch.0 {
            let hits = self.search.query(&query).unwrap();
            self.results
                .lock()
                .unwrap()
                .push(QueryHits { query, hits });
        }
    }
}

fn reference_set() -> Vec<Sequence> {
    [
        ("r1", "ACGTAGCTAGCTACGATCGATCGA"),
        ("r2", "TTGGCCAATTGGCCAATTGGCCAA"),
        ("r3", "GACTGACTGACTGACTGACTGACT"),
    ]
    .iter()
    .map(|&(id, residues)| Sequence::new(id, residues.as_bytes().to_vec(), None).unwrap())
    .collect()
}

#[test]
fn parallel_search_answers_every_query() {
    let mut db = Database::<Dna>::new(8).unwrap();
    db.initialize(reference_set());
    let db = Arc::new(db);

    let results = Arc::new(Mutex::new(Vec::new()));
    let worker_results = Arc::clone(&results);
    let worker_db = Arc::clone(&db);
    let queue = WorkerQueue::new(4, move || SearchWorker {
        search: GlobalSearch::new(Arc::clone(&worker_db), SearchParams::default()),
        results: Arc::clone(&worker_results),
    });

    let processed = Arc::new(AtomicUsize::new(0));
    let observer = Arc::clone(&processed);
    queue.on_processed(move |processed_total, enqueued_total| {
        assert!(processed_total <= enqueued_total);
        observer.store(processed_total, Ordering::SeqCst);
    });

    // every reference queried against the database twice, batched by 2
    let queries: Vec<Sequence> = reference_set()
        .into_iter()
        .chain(reference_set())
        .collect();
    let num_queries = queries.len();
    for pair in queries.chunks(2) {
        queue.enqueue(QueryBatch(pair.to_vec()));
    }
    queue.wait_till_done();
    drop(queue);

    assert_eq!(processed.load(Ordering::SeqCst), num_queries);
    let results = results.lock().unwrap();
    assert_eq!(results.len(), num_queries);
    // each query is its own reference: everyone finds exactly itself
    for result in results.iter() {
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].target.id(), result.query.id());
    }
}

#[test]
fn tabular_sink_consumes_query_hit_pairs() {
    let mut db = Database::<Dna>::new(8).unwrap();
    db.initialize(reference_set());

    let mut search = GlobalSearch::new(Arc::new(db), SearchParams::default());
    let query = Sequence::new("q1", b"ACGTAGCTAGCTACGATCGATCGA".to_vec(), None).unwrap();
    let hits = search.query(&query).unwrap();

    let mut out = Vec::new();
    let mut sink = TabularWriter::new(&mut out);
    sink.write_hits(&query, &hits).unwrap();
    sink.flush().unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("q1\tr1\t100.0\t24\t24\t0\t0\t+\t24="));
}
