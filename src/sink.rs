//! CSV output for extracted slices.
//!
//! [`save_slices`] publishes `first.csv` and `second.csv` together: both are
//! staged as temporary files and renamed into place only once both are fully
//! written. If any step fails, neither file from the run is left behind.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::entity::{FirstRow, SecondRow, Slices};
use crate::error::Result;
use crate::io::atomic::{temp_path, write_synced};

pub const FIRST_CSV: &str = "first.csv";
pub const SECOND_CSV: &str = "second.csv";

/// A row that can be written as a CSV record.
pub trait CsvRow {
    /// Column names, in field order
    const HEADER: &'static [&'static str];

    fn fields(&self) -> Vec<Cow<'_, str>>;
}

impl CsvRow for FirstRow {
    const HEADER: &'static [&'static str] = &["id", "level"];

    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.id.as_str()), Cow::Owned(self.level.to_string())]
    }
}

impl CsvRow for SecondRow {
    const HEADER: &'static [&'static str] = &["id", "object_name"];

    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.id.as_str()), Cow::Borrowed(self.object_name.as_str())]
    }
}

/// Write a header line followed by one record per row.
pub fn write_csv<'a, T, W, I>(out: &mut W, rows: I) -> io::Result<usize>
where
    T: CsvRow + 'a,
    W: Write,
    I: IntoIterator<Item = &'a T>,
{
    write_record(out, T::HEADER.iter().copied())?;
    let mut written = 0;
    for row in rows {
        let fields = row.fields();
        write_record(out, fields.iter().map(|field| field.as_ref()))?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

fn write_record<'f, W: Write>(out: &mut W, fields: impl Iterator<Item = &'f str>) -> io::Result<()> {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(escape(field).as_bytes())?;
    }
    out.write_all(b"\r\n")
}

/// Write `first.csv` and `second.csv` into `dir`, both or neither.
pub async fn save_slices(dir: &Path, slices: &Slices) -> Result<()> {
    let mut first = Vec::new();
    let first_rows = write_csv(&mut first, slices.first.rows())?;
    let mut second = Vec::new();
    let second_rows = write_csv(&mut second, slices.second.rows())?;

    let outputs = [(dir.join(FIRST_CSV), first), (dir.join(SECOND_CSV), second)];

    // Stage
    let mut staged: Vec<PathBuf> = Vec::with_capacity(outputs.len());
    for (path, bytes) in &outputs {
        let tmp = temp_path(path)?;
        if let Err(err) = write_synced(&tmp, bytes).await {
            remove_all(&staged).await;
            return Err(err.into());
        }
        staged.push(tmp);
    }

    // Publish; a failed rename takes back the files already in place
    let mut published: Vec<PathBuf> = Vec::with_capacity(outputs.len());
    for ((path, _), tmp) in outputs.iter().zip(&staged) {
        if let Err(err) = fs::rename(tmp, path).await {
            remove_all(&staged).await;
            remove_all(&published).await;
            return Err(err.into());
        }
        published.push(path.clone());
    }

    info!(dir = %dir.display(), reports = first_rows, objects = second_rows, "slices saved");
    Ok(())
}

async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path).await;
    }
}

/// Quote a field only when it holds a separator, a quote or a line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
