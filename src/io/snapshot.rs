//! Dashboard snapshot file written for an external poller.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::balance::DashboardSnapshot;
use crate::error::Result;

/// Writes `snapshot` as pretty JSON to `path`.
///
/// The document is written to a sibling temp file and renamed into place so
/// a poller never reads a half-written snapshot.
///
/// # Errors
///
/// Returns an `Io` or `Json` error if serialization or writing fails.
pub fn write_snapshot(snapshot: &DashboardSnapshot, path: &Path) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = io::BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
