use anyhow::Context;
use chrono::NaiveDate;
use soundercore::processing::{AggregateReport, CountRow, CurveRow, InspectionTable, LatitudeBucket};
use std::fs;
use std::path::{Path, PathBuf};

/// Files written for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFiles {
    pub curves: Option<PathBuf>,
    pub counts: Option<PathBuf>,
    pub inspection: Option<PathBuf>,
    pub inspection_values: Option<PathBuf>,
}

/// Run-level tables merged from every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedFiles {
    pub curves: PathBuf,
    pub counts: PathBuf,
}

/// Decimal places kept in the combined tables.
const COMBINED_DECIMALS: i32 = 3;

pub fn write_report(directory: &Path, batch_start: NaiveDate, report: &AggregateReport) -> anyhow::Result<BatchFiles> {
    let stamp = batch_start.format("%Y-%m-%d");
    let mut files = BatchFiles::default();
    match &report.inspection {
        Some(table) => {
            let path = directory.join(format!("inspection_{stamp}.csv"));
            write_inspection(&path, table)?;
            files.inspection = Some(path);
            let path = directory.join(format!("inspection_values_{stamp}.csv"));
            write_inspection_values(&path, table)?;
            files.inspection_values = Some(path);
        }
        None => {
            let path = directory.join(format!("radiance_curves_{stamp}.csv"));
            write_curves(&path, &report.curves)?;
            files.curves = Some(path);
            let path = directory.join("stats").join(format!("radiance_counts_{stamp}.csv"));
            write_counts(&path, &report.counts)?;
            files.counts = Some(path);
        }
    }
    Ok(files)
}

fn writer_for(path: &Path) -> anyhow::Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))
}

pub fn write_curves(path: &Path, rows: &[CurveRow]) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    let mut header = vec!["period".to_string(), "channel".to_string()];
    header.extend(LatitudeBucket::all().map(LatitudeBucket::label));
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.period.to_string(), row.channel.to_string()];
        record.extend(
            row.means
                .iter()
                .map(|mean| mean.map(|m| m.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))
}

pub fn write_counts(path: &Path, rows: &[CountRow]) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    let mut header = vec!["period".to_string(), "channel".to_string()];
    for bucket in LatitudeBucket::all() {
        header.push(format!("{bucket}_sum"));
        header.push(format!("{bucket}_count"));
    }
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.period.to_string(), row.channel.to_string()];
        for (sum, count) in row.sums.iter().zip(row.counts.iter()) {
            record.push(sum.to_string());
            record.push(count.to_string());
        }
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))
}

pub fn write_inspection(path: &Path, table: &InspectionTable) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    for record in &table.records {
        writer.serialize(record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))
}

pub fn write_inspection_values(path: &Path, table: &InspectionTable) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    writer.write_record(["bucket", "value"])?;
    for (bucket, values) in LatitudeBucket::all().zip(table.values.iter()) {
        for value in values {
            writer.write_record([bucket.label(), value.to_string()])?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))
}

/// Concatenates the per-batch curve and count tables into one pair of
/// run-level tables sorted by period then channel, values rounded.
///
/// Returns `None` when no batch wrote curve tables.
pub fn combine_batches(directory: &Path, batches: &[BatchFiles]) -> anyhow::Result<Option<CombinedFiles>> {
    let curves: Vec<&PathBuf> = batches.iter().filter_map(|b| b.curves.as_ref()).collect();
    let counts: Vec<&PathBuf> = batches.iter().filter_map(|b| b.counts.as_ref()).collect();
    if curves.is_empty() || counts.is_empty() {
        return Ok(None);
    }
    let combined = CombinedFiles {
        curves: directory.join("radiance_curves_concatenated.csv"),
        counts: directory.join("radiance_curves_stats.csv"),
    };
    concatenate(&curves, &combined.curves)?;
    concatenate(&counts, &combined.counts)?;
    Ok(Some(combined))
}

fn concatenate(inputs: &[&PathBuf], output: &Path) -> anyhow::Result<()> {
    let mut header: Option<csv::StringRecord> = None;
    let mut rows: Vec<((i32, u32, u64), csv::StringRecord)> = Vec::new();
    for input in inputs {
        let mut reader =
            csv::Reader::from_path(input).with_context(|| format!("opening {}", input.display()))?;
        let columns = reader.headers()?.clone();
        match &header {
            Some(expected) => anyhow::ensure!(
                expected == &columns,
                "{} has different columns than the other batches",
                input.display()
            ),
            None => header = Some(columns),
        }
        for record in reader.records() {
            let record = record.with_context(|| format!("reading {}", input.display()))?;
            rows.push((row_key(&record).with_context(|| format!("in {}", input.display()))?, record));
        }
    }
    rows.sort_by_key(|(key, _)| *key);

    let mut writer = writer_for(output)?;
    if let Some(header) = &header {
        writer.write_record(header)?;
    }
    for (_, record) in &rows {
        let mut cells = record.iter();
        let mut out: Vec<String> = cells.by_ref().take(2).map(str::to_string).collect();
        out.extend(cells.map(round_cell));
        writer.write_record(&out)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", output.display()))
}

/// `(year, month, channel)` of a table row whose period renders as `MM-YYYY`.
fn row_key(record: &csv::StringRecord) -> anyhow::Result<(i32, u32, u64)> {
    let period = record.get(0).context("row has no period")?;
    let (month, year) = period
        .split_once('-')
        .with_context(|| format!("malformed period {period:?}"))?;
    let channel = record.get(1).context("row has no channel")?;
    Ok((
        year.parse().with_context(|| format!("malformed period {period:?}"))?,
        month.parse().with_context(|| format!("malformed period {period:?}"))?,
        channel.parse().with_context(|| format!("malformed channel {channel:?}"))?,
    ))
}

fn round_cell(cell: &str) -> String {
    match cell.parse::<f64>() {
        Ok(value) => {
            let scale = 10f64.powi(COMBINED_DECIMALS);
            ((value * scale).round() / scale).to_string()
        }
        Err(_) => cell.to_string(),
    }
}
