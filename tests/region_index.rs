use h2collect::error::CollectError;
use h2collect::region::CoordinateIndex;
use h2collect::types::{GeneKey, Region};

fn regions() -> Vec<Region> {
    vec![
        Region::new("GENEA", "1", 1000, 2000),
        Region::new("BRCA1", "chr17", 43_044_295, 43_125_483),
        Region::new("GENEC", "2", 100, 301),
    ]
}

#[test]
fn keys_follow_reference_order_with_floored_midpoints() {
    let index = CoordinateIndex::from_regions(&regions()).expect("index");
    let keys: Vec<(&str, &str, u64)> = index
        .keys()
        .iter()
        .map(|k| (k.gene_id.as_str(), k.chromosome.as_str(), k.midpoint))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("GENEA", "1", 1500),
            ("BRCA1", "17", 43_084_889),
            ("GENEC", "2", 200),
        ]
    );
}

#[test]
fn both_lookups_reach_the_same_key() {
    let index = CoordinateIndex::from_regions(&regions()).expect("index");
    let by_name = index.lookup_gene("BRCA1").expect("by name");
    let by_interval = index
        .lookup_interval("17", 43_044_295, 43_125_483)
        .expect("by interval");
    assert_eq!(by_name, by_interval);
    assert_eq!(
        index.lookup_interval("chr17", 43_044_295, 43_125_483),
        Some(by_name)
    );
    assert_eq!(index.position(by_name).expect("position"), 1);
}

#[test]
fn absent_keys_are_missing_regions() {
    let index = CoordinateIndex::from_regions(&regions()).expect("index");
    assert!(index.lookup_gene("TP53").is_none());
    assert!(matches!(
        index.resolve_gene("TP53"),
        Err(CollectError::MissingRegion(_))
    ));
    assert!(matches!(
        index.resolve_interval("1", 1000, 2001),
        Err(CollectError::MissingRegion(_))
    ));
    let stray = GeneKey {
        gene_id: "GENEA".to_string(),
        chromosome: "1".to_string(),
        midpoint: 1501,
    };
    assert!(matches!(
        index.position(&stray),
        Err(CollectError::MissingRegion(_))
    ));
}

#[test]
fn identical_canonical_keys_are_rejected() {
    let mut rows = regions();
    rows.push(Region::new("GENEA", "chr1", 1001, 1999));
    match CoordinateIndex::from_regions(&rows) {
        Err(CollectError::DuplicateKey { origin, key }) => {
            assert_eq!(origin, "region table");
            assert!(key.contains("GENEA"));
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[test]
fn repeated_symbol_resolves_to_first_region() {
    let mut rows = regions();
    rows.push(Region::new("GENEA", "5", 10, 20));
    let index = CoordinateIndex::from_regions(&rows).expect("index");
    assert_eq!(index.len(), 4);
    assert_eq!(index.lookup_gene("GENEA").expect("gene").chromosome, "1");
    assert_eq!(
        index.lookup_interval("5", 10, 20).expect("interval").midpoint,
        15
    );
}
