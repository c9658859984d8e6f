use std::path::PathBuf;

use clap::{Parser, Subcommand};

use h2collect::collect::AlignPolicy;
use h2collect::format::{
    DEFAULT_SITE_VCF, FormatRegionConfig, FormatSumstatConfig, format_region, format_sumstat,
};
use h2collect::io::HeaderStyle;
use h2collect::logging::init_tracing;
use h2collect::pipeline::{CollectConfig, DEFAULT_PHENOTYPE_TABLE, DEFAULT_REGION_TABLE, run};

#[derive(Parser)]
#[command(name = "h2collect")]
#[command(
    about = "Collect all heritability estimates into one file and convert the estimates of dichotomous phenotypes onto the liability scale",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge EHE, HESS and GBAT estimates of several phenotypes.
    Collect {
        /// Directory holding the per-method result files
        #[arg(long, required = true)]
        result_dir: PathBuf,
        /// Comma separated phenotype abbreviations, in output column order
        #[arg(long, required = true)]
        phenotypes: String,
        /// Output file name
        #[arg(long, required = true)]
        out: PathBuf,
        #[arg(long, default_value = DEFAULT_PHENOTYPE_TABLE)]
        phenotype_table: PathBuf,
        #[arg(long, default_value = DEFAULT_REGION_TABLE)]
        region_table: PathBuf,
        /// Write one `phenotype.method.stat` header row instead of stacked rows
        #[arg(long)]
        flat_header: bool,
        /// Fail when a result row names a gene or region missing from the region table
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        cores: Option<usize>,
    },
    /// Write LDAK and per-chromosome HESS region files from a KGGSEE region file.
    FormatRegion {
        #[arg(long, required = true)]
        region: PathBuf,
        #[arg(long)]
        out_prefix: Option<PathBuf>,
    },
    /// Convert Neale-lab GWAS results into KGGSEE, HESS and LDAK inputs.
    FormatSumstat {
        #[arg(long, required = true)]
        from_neale: PathBuf,
        #[arg(long, required = true)]
        out_prefix: PathBuf,
        #[arg(long, default_value = DEFAULT_SITE_VCF)]
        vcf: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Collect {
            result_dir,
            phenotypes,
            out,
            phenotype_table,
            region_table,
            flat_header,
            strict,
            cores,
        } => {
            let mut config = CollectConfig::new(result_dir, split_string_list(phenotypes), out);
            config.phenotype_table = phenotype_table;
            config.region_table = region_table;
            config.header = if flat_header {
                HeaderStyle::Flat
            } else {
                HeaderStyle::Stacked
            };
            config.policy = if strict {
                AlignPolicy::Strict
            } else {
                AlignPolicy::Warn
            };
            config.cores = cores;
            run(&config)?;
        }
        Command::FormatRegion { region, out_prefix } => {
            format_region(&FormatRegionConfig { region, out_prefix })?;
        }
        Command::FormatSumstat {
            from_neale,
            out_prefix,
            vcf,
        } => {
            format_sumstat(&FormatSumstatConfig {
                from_neale,
                vcf,
                out_prefix,
            })?;
        }
    }

    Ok(())
}

fn split_string_list(input: String) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
