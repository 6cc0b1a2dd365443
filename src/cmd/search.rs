//! The `search` subcommand: build the index, then run the query set
//! through a worker-queue pipeline into a hit writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use crate::align::{BandedAlignParams, ExtendAlignParams};
use crate::alphabet::{Alphabet, Dna, Protein, Strand};
use crate::index::{Database, ProgressStage};
use crate::io::read_sequences;
use crate::queue::{Worker, WorkerQueue, Workload};
use crate::report::{AlnoutWriter, HitSink, TabularWriter};
use crate::search::{GlobalSearch, QueryHits, SearchParams, SearchTuning};
use crate::sequence::Sequence;

/// Queries handed to one search worker at a time.
const QUERY_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrandOpt {
    Plus,
    Minus,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable pairwise alignments
    Alnout,
    /// One tab-separated row per hit
    Tabular,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query sequences (FASTA, or FASTQ by extension)
    #[arg(long)]
    pub query: PathBuf,

    /// Reference database (FASTA, or FASTQ by extension)
    #[arg(long)]
    pub db: PathBuf,

    /// Output file; stdout if omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "alnout")]
    pub format: OutputFormat,

    /// Treat sequences as protein instead of nucleotide
    #[arg(long)]
    pub protein: bool,

    /// K-mer length; defaults to 8 (nucleotide) or 4 (protein)
    #[arg(long)]
    pub word_size: Option<usize>,

    /// Stop after this many accepted candidates per query
    #[arg(long, default_value_t = 1)]
    pub max_accepts: usize,

    /// Stop after this many rejected candidates per query
    #[arg(long, default_value_t = 16)]
    pub max_rejects: usize,

    /// Minimum fraction of matching columns (0-1)
    #[arg(long, default_value_t = 0.75)]
    pub min_identity: f64,

    /// Strand(s) to search (nucleotide only)
    #[arg(long, value_enum, default_value = "plus")]
    pub strand: StrandOpt,

    /// X-drop termination threshold for greedy extension
    #[arg(long, default_value_t = 32)]
    pub x_drop: i32,

    /// Interior gap open score
    #[arg(long, default_value_t = -20, allow_negative_numbers = true)]
    pub gap_open: i32,

    /// Interior gap extend score
    #[arg(long, default_value_t = -2, allow_negative_numbers = true)]
    pub gap_extend: i32,

    /// Terminal gap open score
    #[arg(long, default_value_t = -2, allow_negative_numbers = true)]
    pub terminal_gap_open: i32,

    /// Terminal gap extend score
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub terminal_gap_extend: i32,

    /// Half-width of the banded alignment
    #[arg(long, default_value_t = 16)]
    pub bandwidth: usize,

    /// Minimum HSP length (clamped to half the query length)
    #[arg(long, default_value_t = 16)]
    pub min_hsp_length: usize,

    /// Maximum distance between chained HSPs
    #[arg(long, default_value_t = 16)]
    pub join_distance: usize,

    /// Worker threads; 0 means one per hardware thread
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    #[arg(long)]
    pub verbose: bool,
}

struct QueryBatch(Vec<Sequence>);

impl Workload for QueryBatch {
    fn weight(&self) -> usize {
        self.0.len()
    }
}

struct ResultBatch(Vec<QueryHits>);

impl Workload for ResultBatch {
    fn weight(&self) -> usize {
        self.0.len()
    }
}

/// One search thread: a private `GlobalSearch` feeding the shared writer
/// queue.
struct SearchWorker<A: Alphabet> {
    search: GlobalSearch<A>,
    writer_queue: Arc<WorkerQueue<ResultBatch>>,
}

impl<A: Alphabet> Worker for SearchWorker<A> {
    type Item = QueryBatch;

    fn process(&mut self, batch: QueryBatch) {
        let mut results = Vec::with_capacity(batch.0.len());
        for query in batch.0 {
            match self.search.query(&query) {
                Ok(hits) => results.push(QueryHits { query, hits }),
                Err(err) => eprintln!("[WARN] search failed for '{}': {err}", query.id()),
            }
        }
        self.writer_queue.enqueue(ResultBatch(results));
    }
}

struct WriteWorker {
    sink: Arc<Mutex<Box<dyn HitSink>>>,
}

impl Worker for WriteWorker {
    type Item = ResultBatch;

    fn process(&mut self, batch: ResultBatch) {
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for result in batch.0 {
            if let Err(err) = sink.write_hits(&result.query, &result.hits) {
                eprintln!("[WARN] failed to write hits for '{}': {err}", result.query.id());
            }
        }
    }
}

pub fn run(args: SearchArgs) -> Result<()> {
    let word_size = args.word_size.unwrap_or(if args.protein { 4 } else { 8 });
    if args.protein {
        run_typed::<Protein>(&args, word_size)
    } else {
        run_typed::<Dna>(&args, word_size)
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:>9} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap(),
    );
    bar
}

fn run_typed<A: Alphabet>(args: &SearchArgs, word_size: usize) -> Result<()> {
    let references = read_sequences(&args.db)?;
    if args.verbose {
        eprintln!("[INFO] {} database sequences", references.len());
    }

    let mut database = Database::<A>::new(word_size)?;
    let bar = progress_bar(references.len() as u64 * 2);
    let progress = bar.clone();
    database.set_progress_callback(Box::new(move |stage, processed, total| {
        let (label, offset) = match stage {
            ProgressStage::StatsCollection => ("counting", 0),
            ProgressStage::Indexing => ("indexing", total),
        };
        progress.set_message(label);
        progress.set_position((offset + processed) as u64);
    }));
    database.initialize(references);
    bar.finish_and_clear();
    let database = Arc::new(database);

    let queries = read_sequences(&args.query)?;
    let num_queries = queries.len();
    if args.verbose {
        eprintln!("[INFO] {num_queries} queries");
    }

    let params = SearchParams {
        max_accepts: args.max_accepts,
        max_rejects: args.max_rejects,
        min_identity: args.min_identity,
        strand: match args.strand {
            StrandOpt::Plus => Strand::Plus,
            StrandOpt::Minus => Strand::Minus,
            StrandOpt::Both => Strand::Both,
        },
    }
    .validated()?;

    let tuning = SearchTuning {
        extend: ExtendAlignParams {
            x_drop: args.x_drop,
            gap_open: args.gap_open,
            gap_extend: args.gap_extend,
        },
        banded: BandedAlignParams {
            bandwidth: args.bandwidth,
            interior_gap_open: args.gap_open,
            interior_gap_extend: args.gap_extend,
            terminal_gap_open: args.terminal_gap_open,
            terminal_gap_extend: args.terminal_gap_extend,
        },
        min_hsp_length: args.min_hsp_length,
        max_join_distance: args.join_distance,
    };

    let out: Box<dyn Write + Send> = match &args.out {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let sink: Box<dyn HitSink> = match args.format {
        OutputFormat::Alnout => Box::new(AlnoutWriter::<A, _>::new(out)),
        OutputFormat::Tabular => Box::new(TabularWriter::new(out)),
    };
    let sink = Arc::new(Mutex::new(sink));

    // One writer thread draining search results, so workers never
    // contend on the output stream.
    let writer_sink = Arc::clone(&sink);
    let writer_queue = Arc::new(WorkerQueue::new(1, move || WriteWorker {
        sink: Arc::clone(&writer_sink),
    }));

    let search_db = Arc::clone(&database);
    let search_writer = Arc::clone(&writer_queue);
    let search_queue = WorkerQueue::new(args.threads, move || SearchWorker {
        search: GlobalSearch::with_tuning(Arc::clone(&search_db), params, tuning),
        writer_queue: Arc::clone(&search_writer),
    });

    let bar = progress_bar(num_queries as u64);
    bar.set_message("searching");
    let progress = bar.clone();
    search_queue.on_processed(move |processed, _enqueued| {
        progress.set_position(processed as u64);
    });

    let mut batch = Vec::with_capacity(QUERY_BATCH_SIZE);
    for query in queries {
        batch.push(query);
        if batch.len() == QUERY_BATCH_SIZE {
            search_queue.enqueue(QueryBatch(std::mem::take(&mut batch)));
        }
    }
    if !batch.is_empty() {
        search_queue.enqueue(QueryBatch(batch));
    }

    search_queue.wait_till_done();
    // joining the searchers releases their writer-queue handles
    drop(search_queue);
    writer_queue.wait_till_done();
    drop(writer_queue);

    sink.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .flush()?;
    bar.finish_and_clear();

    if args.verbose {
        eprintln!("[INFO] searched {num_queries} queries against the database");
    }
    Ok(())
}
