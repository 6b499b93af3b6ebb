//! End-to-end calling through the public library API.

use strain_caller::alignment::read::{parse_cigar, AlignedRead};
use strain_caller::alignment::source::InMemorySource;
use strain_caller::core::reference::Scaffold;
use strain_caller::output::store::StoredCalls;
use strain_caller::{Allele, CallerConfig, Reference, VariantCaller};

fn reference() -> Reference {
    Reference::from_scaffolds(vec![
        Scaffold::new("chr1", vec![b'A'; 1000]),
        Scaffold::new("chr2", vec![b'C'; 500]),
    ])
    .unwrap()
}

fn read(name: &str, scaffold: &str, start: usize, base: u8, len: usize, qual: u8) -> AlignedRead {
    AlignedRead::new(
        name,
        scaffold,
        start,
        parse_cigar(&format!("{len}M")).unwrap(),
        vec![base; len],
        vec![qual; len],
    )
}

/// chr1 carries a clean SNP block, chr2 a mixed population
fn source() -> InMemorySource {
    InMemorySource::sorted(
        vec!["chr1".to_string(), "chr2".to_string()],
        vec![
            read("a1", "chr1", 100, b'T', 100, 40),
            read("a2", "chr1", 100, b'T', 100, 40),
            read("b1", "chr2", 0, b'C', 50, 30),
            read("b2", "chr2", 0, b'C', 50, 30),
            read("b3", "chr2", 0, b'G', 50, 30),
            read("b4", "chr2", 0, b'G', 50, 30),
        ],
    )
}

#[test]
fn test_calls_snp_block_and_mixed_population() {
    let caller = VariantCaller::new(CallerConfig::default()).unwrap();
    let call_data = caller.process(&reference(), &mut source()).unwrap();

    assert_eq!(call_data.uniquely_mapped_reads, 6);
    assert_eq!(call_data.reference_length, 1500);

    let chr1 = call_data.scaffold("chr1").unwrap();
    assert!((100..200).all(|pos| chr1.strong[pos] == Allele::T));
    assert!(chr1.strong[99].is_empty());
    assert!(chr1.strong[200].is_empty());
    assert_eq!(chr1.coverage[150], 2);

    let chr2 = call_data.scaffold("chr2").unwrap();
    assert!((0..50).all(|pos| chr2.strong[pos] == (Allele::C | Allele::G)));

    let summaries: Vec<_> = call_data.summarize().collect();
    assert_eq!(summaries.len(), 3);

    let s1 = &summaries[0];
    assert_eq!(s1.name, "chr1");
    assert_eq!(s1.callable, 100);
    assert_eq!(s1.snps, 100);
    assert_eq!(s1.pure_snps, 100);
    assert_eq!(s1.confirmed, 0);
    assert_eq!(s1.multi, 0);
    assert_eq!(s1.gap_count, 0);
    assert!((s1.abundance - 2.0 / 6.0).abs() < 1e-9);

    let s2 = &summaries[1];
    assert_eq!(s2.callable, 50);
    assert_eq!(s2.confirmed, 50);
    assert_eq!(s2.snps, 50);
    assert_eq!(s2.multi, 50);
    assert_eq!(s2.pure_snps, 0);

    let total = &summaries[2];
    assert!(total.is_total());
    assert_eq!(total.length, 1500);
    assert_eq!(total.callable, 150);
    assert_eq!(total.snps, 150);
    assert_eq!(total.unique_reads, 6);
    assert!((total.callable_pct - 10.0).abs() < 1e-9);
}

#[test]
fn test_rejected_reads_are_not_called() {
    let config = CallerConfig {
        max_mismatches: 5,
        ..CallerConfig::default()
    };
    let caller = VariantCaller::new(config).unwrap();

    let mut source = InMemorySource::new(
        vec!["chr1".to_string(), "chr2".to_string()],
        vec![
            read("a1", "chr1", 100, b'T', 100, 40).with_mismatches(100),
            read("a2", "chr1", 100, b'T', 100, 40).with_mismatches(100),
        ],
    );
    let call_data = caller.process(&reference(), &mut source).unwrap();

    let chr1 = call_data.scaffold("chr1").unwrap();
    assert!(chr1.strong.iter().all(|a| a.is_empty()));
    assert!(chr1.bad[150] > 0);
}

#[test]
fn test_stored_calls_survive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.calls");

    let config = CallerConfig::default();
    let caller = VariantCaller::new(config.clone()).unwrap();
    let call_data = caller.process(&reference(), &mut source()).unwrap();
    let before: Vec<_> = call_data.summarize().collect();

    StoredCalls::new(config, call_data).save(&path).unwrap();
    let loaded = StoredCalls::load(&path).unwrap();

    // The name index is rebuilt on load
    assert!(loaded.call_data.scaffold("chr2").is_some());

    let after: Vec<_> = loaded.call_data.summarize().collect();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.name, a.name);
        assert_eq!(b.callable, a.callable);
        assert_eq!(b.snps, a.snps);
        assert_eq!(b.gap_count, a.gap_count);
    }
}
