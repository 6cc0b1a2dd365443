//! End-to-end searches through the public API.

use std::sync::Arc;

use rusearch::alphabet::{Dna, Protein, Strand};
use rusearch::index::{Database, AMBIGUOUS_KMER};
use rusearch::search::{GlobalSearch, SearchParams};
use rusearch::sequence::Sequence;

fn dna_database(records: &[(&str, &str)], word_size: usize) -> Arc<Database<Dna>> {
    let mut db = Database::<Dna>::new(word_size).unwrap();
    db.initialize(
        records
            .iter()
            .map(|&(id, residues)| Sequence::new(id, residues.as_bytes().to_vec(), None).unwrap())
            .collect(),
    );
    Arc::new(db)
}

#[test]
fn one_mismatch_query_yields_one_hit() {
    let db = dna_database(&[("ref", "ACGTACGTACGTACGTACGT")], 8);
    let params = SearchParams {
        min_identity: 0.9,
        ..SearchParams::default()
    };
    let mut search = GlobalSearch::new(db, params);

    let query = Sequence::new("q", b"ACGTACGTACGTACGTACGG".to_vec(), None).unwrap();
    let hits = search.query(&query).unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target.id(), "ref");
    assert!(hits[0].cigar.identity() >= 0.9);
    // leading match run, then a single mismatch run at the end
    assert_eq!(hits[0].cigar.to_string(), "19=1X");
}

#[test]
fn candidates_are_ranked_by_shared_kmer_count() {
    // near is identical to the query, far shares no k-mer with it
    let db = dna_database(
        &[
            ("far", "TTTTTTTTTTTTTTTTTTTT"),
            ("near", "ACGAACGTAGCTTACGATCG"),
        ],
        8,
    );
    let params = SearchParams {
        min_identity: 0.9,
        max_accepts: 1,
        ..SearchParams::default()
    };
    let mut search = GlobalSearch::new(db, params);

    let query = Sequence::new("q", b"ACGAACGTAGCTTACGATCG".to_vec(), None).unwrap();
    let hits = search.query(&query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target.id(), "near");
}

#[test]
fn deleted_region_is_bridged_by_chaining() {
    // the query lacks 4 residues present in the reference; the two exact
    // runs chain and the banded fill emits the deletion
    let reference = "ACGATCGATTACGCGCAATCGCTAGCTTACGATCAT";
    let query: String = {
        let mut q = reference.to_string();
        q.replace_range(16..20, "");
        q
    };
    let db = dna_database(&[("ref", reference)], 8);
    let params = SearchParams {
        min_identity: 0.8,
        ..SearchParams::default()
    };
    let mut search = GlobalSearch::new(db, params);

    let hits = search
        .query(&Sequence::new("q", query.into_bytes(), None).unwrap())
        .unwrap();
    assert_eq!(hits.len(), 1);
    let rendered = hits[0].cigar.to_string();
    assert!(rendered.contains("4D"), "expected a 4-column deletion, got {rendered}");
    assert!(hits[0].cigar.identity() >= 0.8);
}

#[test]
fn strand_both_reports_minus_hits() {
    let reference = "AAACCCTTTGGGAAACCCTTTGGGAAAC";
    let db = dna_database(&[("ref", reference)], 8);
    let params = SearchParams {
        strand: Strand::Both,
        ..SearchParams::default()
    };
    let mut search = GlobalSearch::new(db, params);

    let query = Sequence::new("q", reference.as_bytes().to_vec(), None)
        .unwrap()
        .reverse_complemented::<Dna>();
    let hits = search.query(&query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].strand, Strand::Minus);
}

#[test]
fn database_round_trips_every_indexed_kmer() {
    let db = dna_database(
        &[
            ("r1", "ACGTACGTAGCTAGCATCGA"),
            ("r2", "TTACGCGCGCATATATTGCA"),
            ("r3", "ACGTACGTAGNNNNCATCGA"),
        ],
        8,
    );
    for seq_id in 0..db.num_sequences() as u32 {
        for &kmer in db.kmers_for(seq_id).unwrap() {
            if kmer == AMBIGUOUS_KMER {
                continue;
            }
            assert!(db.sequence_ids_for(kmer).unwrap().contains(&seq_id));
        }
    }
}

#[test]
fn protein_search_finds_identical_sequence() {
    let mut db = Database::<Protein>::new(4).unwrap();
    let residues = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ".to_vec();
    db.initialize(vec![Sequence::new("prot", residues.clone(), None).unwrap()]);

    let mut search = GlobalSearch::new(Arc::new(db), SearchParams::default());
    let hits = search
        .query(&Sequence::new("q", residues, None).unwrap())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].strand, Strand::Plus);
    assert!((hits[0].cigar.identity() - 1.0).abs() < f64::EPSILON);
}
