//! CSV export for the balancer's rolling log.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::balance::AllocationResult;
use crate::error::Result;
use crate::sources::SourceKind;

/// Column header for allocation history export.
const HEADER: &str = "timestamp,strategy,demand_w,grid_w,battery_w,solar_w,wind_w,deficit_w";

/// Exports allocation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per result, oldest first.
///
/// # Errors
///
/// Returns an `Io` or `Csv` error if file creation or writing fails.
pub fn export_csv<'a>(
    results: impl IntoIterator<Item = &'a AllocationResult>,
    path: &Path,
) -> Result<()> {
    let file = File::create(path)?;
    write_csv(results, io::BufWriter::new(file))
}

/// Writes allocation results as CSV to any writer.
///
/// Sources absent from a result are written as `0.00`.
///
/// # Errors
///
/// Returns a `Csv` error if writing fails.
pub fn write_csv<'a>(
    results: impl IntoIterator<Item = &'a AllocationResult>,
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for r in results {
        wtr.write_record(&[
            r.timestamp.to_rfc3339(),
            r.strategy.to_string(),
            format!("{:.2}", r.demand_w),
            format!("{:.2}", r.allocated_w(SourceKind::Grid)),
            format!("{:.2}", r.allocated_w(SourceKind::Battery)),
            format!("{:.2}", r.allocated_w(SourceKind::Solar)),
            format!("{:.2}", r.allocated_w(SourceKind::Wind)),
            format!("{:.2}", r.deficit_w),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
