use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use h2collect::collect::AlignPolicy;
use h2collect::error::CollectError;
use h2collect::io::HeaderStyle;
use h2collect::pipeline::{CollectConfig, run};
use h2collect::types::{Method, Statistic};

const T2D_COEF: f64 = 0.551_907_298;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        let results = root.join("results");
        fs::create_dir_all(results.join("T2D.gbat")).expect("mkdir");
        fs::create_dir_all(results.join("HGT.gbat")).expect("mkdir");

        write(
            &root.join("regions.kggsee"),
            "1 1000 2000 GENEA\n1 5000 7000 GENEB\n17 43044295 43125483 BRCA1\n2 100 301 GENEC\n",
        );
        write(
            &root.join("phenotype.tsv"),
            "Abbr\tName\tPrevalence\nT2D\tType 2 diabetes\t0.01\nHGT\tHeight\tNA\n",
        );

        write(
            &results.join("T2D.ehe.gene.pvalue.txt"),
            "Gene\tHerit\tHeritSE\nGENEA\t0.10\t0.02\nGENEB\tNA\tNA\nUNKNOWN\t0.5\t0.1\n",
        );
        write(
            &results.join("T2D.hess.step2.txt"),
            "chr\tstart\tend\tlocal_h2g\tse\nchr1\t1000\t2000\t0.2\t0.01\nchr2\t100\t301\t0.05\t0.02\n",
        );
        write(
            &results.join("T2D.gbat").join("remls.all"),
            "Gene_Name Heritability SD\n1_GENEA 0.3 0.05\n2_GENEB 0.4 NA\n3_GENEC 0.2 0.04\n",
        );
        write(
            &results.join("T2D.gbat").join("calc_genes_reml.log"),
            "Start\nWarning, Gene/Chunk 3_GENEC is excluded\nFinished\n",
        );

        write(
            &results.join("HGT.ehe.gene.pvalue.txt"),
            "Gene\tHerit\tHeritSE\nGENEB\t0.07\t0.01\n",
        );
        write(
            &results.join("HGT.hess.step2.txt"),
            "chr\tstart\tend\tlocal_h2g\tse\nchr17\t43044295\t43125483\t0.01\t0.005\n",
        );
        write(
            &results.join("HGT.gbat").join("remls.all"),
            "Gene_Name Heritability SD\n4_GENEC 0.12 0.03\n",
        );
        write(&results.join("HGT.gbat").join("calc_genes_reml.log"), "Finished\n");

        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> CollectConfig {
        let mut config = CollectConfig::new(
            self.path("results"),
            vec!["T2D".to_string(), "HGT".to_string()],
            self.path("out").join("combined.tsv"),
        );
        fs::create_dir_all(self.path("out")).expect("mkdir");
        config.phenotype_table = self.path("phenotype.tsv");
        config.region_table = self.path("regions.kggsee");
        config
    }
}

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fixture");
}

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|v| (v - expected).abs() < 1e-6)
}

#[test]
fn collects_all_methods_onto_the_reference() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let table = run(&config).expect("run");

    assert_eq!(table.height(), 4);
    assert_eq!(table.width(), 12);
    let mids: Vec<u64> = table.rows().iter().map(|k| k.midpoint).collect();
    assert_eq!(mids, vec![1500, 6000, 43_084_889, 200]);

    assert!(close(
        table.value("GENEA", "T2D", Method::Ehe, Statistic::H2),
        0.10 * T2D_COEF
    ));
    assert!(close(
        table.value("GENEA", "T2D", Method::Hess, Statistic::H2),
        0.2 * T2D_COEF
    ));
    assert!(close(
        table.value("GENEC", "T2D", Method::Hess, Statistic::Se),
        0.02 * T2D_COEF
    ));
    assert!(close(
        table.value("GENEA", "T2D", Method::Gbat, Statistic::Se),
        0.05 * T2D_COEF
    ));
    // missing SD and the exclusion log both blank GBAT rows
    assert_eq!(table.value("GENEB", "T2D", Method::Gbat, Statistic::H2), None);
    assert_eq!(table.value("GENEC", "T2D", Method::Gbat, Statistic::H2), None);
    assert_eq!(table.value("GENEB", "T2D", Method::Ehe, Statistic::H2), None);

    // no prevalence means no conversion
    assert_eq!(
        table.value("GENEB", "HGT", Method::Ehe, Statistic::H2),
        Some(0.07)
    );
    assert_eq!(
        table.value("BRCA1", "HGT", Method::Hess, Statistic::Se),
        Some(0.005)
    );
    assert_eq!(
        table.value("GENEC", "HGT", Method::Gbat, Statistic::H2),
        Some(0.12)
    );
    assert_eq!(table.value("BRCA1", "T2D", Method::Ehe, Statistic::H2), None);

    let written = fs::read_to_string(&config.out).expect("output");
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 8);
    assert!(lines[0].starts_with("\t\t\tT2D\tT2D"));
    assert!(lines[1].starts_with("\t\t\tEHE\tEHE\tHESS"));
    assert!(lines[2].starts_with("\t\t\th2\tse\th2"));
    assert!(lines[3].starts_with("HGNC_ID\tCHR\tMID_BP"));
    assert!(lines[6].starts_with("BRCA1\t17\t43084889\tNA\tNA"));
    assert_eq!(lines[6].split('\t').count(), 15);

    let log = fs::read_to_string(fixture.path("out").join("combined.tsv.log")).expect("log");
    assert!(log.contains("Done."));
}

#[test]
fn flat_header_names_each_column() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.header = HeaderStyle::Flat;
    config.cores = Some(1);
    run(&config).expect("run");

    let written = fs::read_to_string(&config.out).expect("output");
    let header = written.lines().next().expect("header");
    assert!(header.starts_with("HGNC_ID\tCHR\tMID_BP\tT2D.EHE.h2\tT2D.EHE.se\tT2D.HESS.h2"));
    assert!(header.ends_with("HGT.GBAT.se"));
    assert_eq!(written.lines().count(), 5);
}

#[test]
fn missing_result_file_fails_before_writing() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.path("results").join("HGT.hess.step2.txt")).expect("remove");
    let config = fixture.config();
    let err = run(&config).expect_err("missing file");
    assert!(err.to_string().contains("HGT.hess.step2.txt"));
    assert!(!config.out.exists());
}

#[test]
fn strict_policy_rejects_unknown_genes() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.policy = AlignPolicy::Strict;
    let err = run(&config).expect_err("strict");
    match err.downcast_ref::<CollectError>() {
        Some(CollectError::MissingRegion(key)) => assert!(key.contains("UNKNOWN")),
        other => panic!("expected MissingRegion, got {other:?}"),
    }
    assert!(!config.out.exists());
}

#[test]
fn unknown_phenotype_is_rejected() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.phenotypes = vec!["T2D".to_string(), "BMI".to_string()];
    assert!(run(&config).is_err());
    assert!(!config.out.exists());
}

#[cfg(unix)]
#[test]
fn output_is_readable_by_others() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new();
    let config = fixture.config();
    run(&config).expect("run");
    let mode = fs::metadata(&config.out).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}
