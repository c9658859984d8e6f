use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use h2collect::format::{FormatRegionConfig, FormatSumstatConfig, format_region, format_sumstat};

fn read_gz(path: &Path) -> String {
    let mut text = String::new();
    MultiGzDecoder::new(File::open(path).expect("open"))
        .read_to_string(&mut text)
        .expect("decompress");
    text
}

#[test]
fn region_file_is_split_per_chromosome() {
    let dir = TempDir::new().expect("tempdir");
    let region = dir.path().join("genes.kggsee");
    fs::write(
        &region,
        "1 1000 2000 GENEA\nchr1 5000 7000 GENEB\n2 100 301 GENEC\nX 10 20 GENEX\n",
    )
    .expect("write");

    let outputs = format_region(&FormatRegionConfig {
        region,
        out_prefix: None,
    })
    .expect("format region");

    assert_eq!(outputs.ldak, dir.path().join("genes.ldak"));
    let ldak = fs::read_to_string(&outputs.ldak).expect("ldak");
    assert_eq!(
        ldak.lines().collect::<Vec<_>>(),
        vec![
            "GENEA\t1\t1000\t2000",
            "GENEB\t1\t5000\t7000",
            "GENEC\t2\t100\t301",
            "GENEX\tX\t10\t20",
        ]
    );

    assert_eq!(outputs.hess.len(), 22);
    let chr1 = fs::read_to_string(dir.path().join("genes.hess.1")).expect("chr1");
    assert_eq!(chr1, "chr\tstart\tstop\nchr1\t1000\t2000\nchr1\t5000\t7000\n");
    let chr22 = fs::read_to_string(dir.path().join("genes.hess.22")).expect("chr22");
    assert_eq!(chr22, "chr\tstart\tstop\n");
}

#[test]
fn neale_results_are_matched_to_sites() {
    let dir = TempDir::new().expect("tempdir");
    let vcf = dir.path().join("sites.vcf");
    fs::write(
        &vcf,
        "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\n\
1\t100\trs1\tA\tG\n\
1\t200\trs2\tC\tT\n\
2\t300\trs3\tG\tA\n",
    )
    .expect("write vcf");

    let neale = dir.path().join("neale.tsv.gz");
    let mut gz = GzEncoder::new(File::create(&neale).expect("create"), Compression::default());
    write!(
        gz,
        "variant\tminor_allele\tn_complete_samples\tbeta\ttstat\tpval\n\
1:100:A:G\tG\t1000\t0.1\t2.5\t0.012\n\
1:100:A:C\tC\t999\t0.2\t1.1\t0.27\n\
2:300:G:A\tA\t1000\t-0.1\t-3.0\t0.0027\n\
X:100:A:G\tG\t1000\t0.1\t9.9\t1e-20\n"
    )
    .expect("write neale");
    gz.finish().expect("finish gz");

    let prefix = dir.path().join("T2D");
    let outputs = format_sumstat(&FormatSumstatConfig {
        from_neale: neale,
        vcf,
        out_prefix: prefix,
    })
    .expect("format sumstat");

    assert_eq!(outputs.written, 2);
    assert_eq!(outputs.unmatched, 1);

    assert_eq!(
        read_gz(&outputs.kggsee),
        "CHR\tBP\tP\tN\n1\t100\t0.012\t1000\n2\t300\t0.0027\t1000\n"
    );
    assert_eq!(
        read_gz(&outputs.hess),
        "CHR\tBP\tSNP\tA1\tA2\tZ\tN\n1\t100\trs1\tG\tA\t2.5\t1000\n2\t300\trs3\tA\tG\t-3.0\t1000\n"
    );
    let ldak = fs::read_to_string(&outputs.ldak).expect("ldak");
    assert_eq!(
        ldak,
        "Predictor\tA1\tA2\tn\tZ\nrs1\tG\tA\t1000\t2.5\nrs3\tA\tG\t1000\t-3.0\n"
    );
}

#[test]
fn missing_inputs_are_reported() {
    let dir = TempDir::new().expect("tempdir");
    let err = format_region(&FormatRegionConfig {
        region: dir.path().join("absent.kggsee"),
        out_prefix: None,
    })
    .expect_err("missing region");
    assert!(err.to_string().contains("absent.kggsee"));
}
