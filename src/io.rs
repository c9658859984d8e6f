use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::error::CollectError;
use crate::merge::CombinedTable;

/// Index column names of the combined table.
pub const INDEX_COLUMNS: [&str; 3] = ["HGNC_ID", "CHR", "MID_BP"];

pub const MISSING: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStyle {
    /// One header row per column level (phenotype, method, statistic)
    /// followed by a row naming the index columns.
    #[default]
    Stacked,
    /// A single header row with `phenotype.method.statistic` columns.
    Flat,
}

pub fn read_table(path: &Path) -> Result<DataFrame> {
    read_table_with(path, true)
}

/// Reads a table without a header row; columns are named `column_1`,
/// `column_2`, ... and are best addressed by position.
pub fn read_headerless_table(path: &Path) -> Result<DataFrame> {
    read_table_with(path, false)
}

fn read_table_with(path: &Path, has_header: bool) -> Result<DataFrame> {
    let ext = extension(path);
    if matches!(ext.as_str(), "gz" | "bgz" | "bz2") {
        let tmp = decompress_to_temp(path)?;
        return read_table_plain(tmp.path(), has_header);
    }
    read_table_plain(path, has_header)
}

/// Every column is read as text; typing happens in [`f64_values`] and
/// [`u64_values`] so a late non-integer cell cannot be nulled by schema
/// inference.
fn read_table_plain(path: &Path, has_header: bool) -> Result<DataFrame> {
    let delimiter = sniff_delimiter(path)?;
    if delimiter == b' ' {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        return read_table_whitespace(file, has_header)
            .with_context(|| format!("read {}", path.display()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(delimiter)
                .with_null_values(Some(NullValues::AllColumns(
                    MISSING_TOKENS.iter().map(|t| (*t).into()).collect(),
                )))
                .with_missing_is_null(true),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))?;
    trim_strings(df)
}

/// Space-separated tables (GBAT `remls.all`) have no quoting.
fn read_table_whitespace<R: Read>(reader: R, has_header: bool) -> Result<DataFrame> {
    let mut lines = BufReader::new(reader)
        .lines()
        .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()));
    let Some(first) = lines.next().transpose()? else {
        anyhow::bail!("empty file");
    };
    let first: Vec<String> = first.split_whitespace().map(str::to_string).collect();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); first.len()];
    let names: Vec<String> = if has_header {
        first
    } else {
        push_fields(&mut columns, first.iter().map(String::as_str));
        (1..=columns.len()).map(|i| format!("column_{i}")).collect()
    };
    for line in lines {
        let line = line?;
        push_fields(&mut columns, line.split_whitespace());
    }

    let height = columns.first().map_or(0, Vec::len);
    let cols: Vec<Column> = names
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    Ok(DataFrame::new(height, cols)?)
}

/// Appends one row; short rows are padded with nulls, extra fields dropped.
fn push_fields<'a>(columns: &mut [Vec<Option<String>>], fields: impl Iterator<Item = &'a str>) {
    let mut fields = fields;
    for column in columns.iter_mut() {
        column.push(fields.next().filter(|f| !is_missing_token(f)).map(str::to_string));
    }
}

const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "."];

fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}

/// Tab wins over comma; anything else is whitespace-separated.
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let mut first = String::new();
    BufReader::new(File::open(path).with_context(|| format!("open {}", path.display()))?)
        .read_line(&mut first)?;
    Ok([b'\t', b',']
        .into_iter()
        .find(|d| first.contains(char::from(*d)))
        .unwrap_or(b' '))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Opens a text file, decompressing `.gz`/`.bgz` (multi-member) and `.bz2`.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let decoder: Box<dyn Read> = match extension(path).as_str() {
        "gz" | "bgz" => Box::new(MultiGzDecoder::new(file)),
        "bz2" => Box::new(BzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(decoder)))
}

fn decompress_to_temp(path: &Path) -> Result<NamedTempFile> {
    let mut decoder = open_text(path)?;
    let mut tmp = NamedTempFile::new()?;
    std::io::copy(&mut decoder, &mut tmp)
        .with_context(|| format!("decompress {}", path.display()))?;
    Ok(tmp)
}

fn trim_strings(df: DataFrame) -> Result<DataFrame> {
    let height = df.height();
    let cols = df
        .columns()
        .iter()
        .map(|column| -> Result<Column> {
            if column.dtype() != &DataType::String {
                return Ok(column.clone());
            }
            let trimmed: StringChunked = column.str()?.into_iter().map(|v| v.map(str::trim)).collect();
            Ok(trimmed.with_name(column.name().clone()).into_series().into())
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(height, cols)?)
}

pub fn ensure_column(df: &DataFrame, name: &str) -> crate::error::Result<()> {
    if df.column(name).is_err() {
        return Err(CollectError::MissingColumn(name.to_string()));
    }
    Ok(())
}

/// Column values as strings; missing cells and empty strings are `None`.
pub fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect())
}

/// Column values as floats; unparsable cells and NaN are `None`.
pub fn f64_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Column values as non-negative integers; negative values are rejected.
pub fn u64_values(column: &Column) -> Result<Vec<Option<u64>>> {
    let name = column.name().to_string();
    let series = column
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    series
        .i64()?
        .into_iter()
        .map(|v| match v {
            Some(x) => u64::try_from(x)
                .map(Some)
                .map_err(|_| anyhow::anyhow!("negative coordinate {x} in column {name}")),
            None => Ok(None),
        })
        .collect()
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => MISSING.to_string(),
    }
}

/// Writes the combined table; the file only appears once it is complete.
pub fn write_combined_table(table: &CombinedTable, path: &Path, style: HeaderStyle) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).with_context(|| format!("create temp file in {}", dir.display()))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write_header(&mut out, table, style)?;
        for (row, key) in table.rows().iter().enumerate() {
            write!(out, "{}\t{}\t{}", key.gene_id, key.chromosome, key.midpoint)?;
            for value in table.row_values(row) {
                write!(out, "\t{}", format_value(*value))?;
            }
            writeln!(out)?;
        }
        out.flush()?;
    }
    // Temp files are created 0600; the table is meant to be shared.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .with_context(|| format!("set permissions of {}", path.display()))?;
    }
    tmp.persist(path)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn write_header<W: Write>(out: &mut W, table: &CombinedTable, style: HeaderStyle) -> Result<()> {
    match style {
        HeaderStyle::Flat => {
            write!(out, "{}", INDEX_COLUMNS.join("\t"))?;
            for col in table.columns() {
                write!(
                    out,
                    "\t{}.{}.{}",
                    col.phenotype,
                    col.method,
                    col.statistic.label()
                )?;
            }
            writeln!(out)?;
        }
        HeaderStyle::Stacked => {
            let lead = "\t".repeat(INDEX_COLUMNS.len() - 1);
            let levels: [Vec<String>; 3] = [
                table.columns().iter().map(|c| c.phenotype.clone()).collect(),
                table.columns().iter().map(|c| c.method.to_string()).collect(),
                table
                    .columns()
                    .iter()
                    .map(|c| c.statistic.label().to_string())
                    .collect(),
            ];
            for level in &levels {
                write!(out, "{lead}")?;
                for label in level {
                    write!(out, "\t{label}")?;
                }
                writeln!(out)?;
            }
            write!(out, "{}", INDEX_COLUMNS.join("\t"))?;
            write!(out, "{}", "\t".repeat(table.width()))?;
            writeln!(out)?;
        }
    }
    Ok(())
}
