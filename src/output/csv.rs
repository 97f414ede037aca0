//! CSV export of job outcomes

use crate::state::UrlOutcome;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Column header of the export
pub const CSV_HEADER: [&str; 4] = ["source_url", "http_status", "error", "matched_links"];

/// Writes `results` as CSV with a header row
///
/// Matches are joined with `delimiter` into the last column. Fields are
/// quoted when they contain a comma, a quote or a line break.
pub fn write_csv<W: Write>(results: &[UrlOutcome], writer: &mut W, delimiter: &str) -> io::Result<()> {
    write_row(writer, &CSV_HEADER)?;

    for outcome in results {
        let status = outcome.http_status.to_string();
        let matches = outcome.matches.join(delimiter);
        write_row(
            writer,
            &[outcome.url.as_str(), &status, &outcome.error, &matches],
        )?;
    }

    writer.flush()
}

/// Writes `results` to a CSV file at `path`, replacing any existing file
pub fn export_csv(path: &Path, results: &[UrlOutcome], delimiter: &str) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(results, &mut writer, delimiter)?;
    tracing::info!("Wrote {} rows to {}", results.len(), path.display());
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, fields: &[&str]) -> io::Result<()> {
    let row: Vec<String> = fields.iter().map(|field| quote(field)).collect();
    writer.write_all(row.join(",").as_bytes())?;
    writer.write_all(b"\r\n")
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
