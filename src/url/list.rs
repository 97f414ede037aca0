use crate::url::validate_url;

/// Extracts URLs from pasted text or an uploaded CSV
///
/// Accepts one URL per line as well as comma-separated cells on a line (the
/// spreadsheet-export shape). Cells are trimmed and stripped of surrounding
/// double quotes; blank cells are ignored and cells that are not absolute
/// http(s) URLs are skipped with a warning. Order is preserved and
/// duplicates are kept; the engine deduplicates when a job is created.
///
/// # Examples
///
/// ```
/// use regex_sweep::url::parse_url_list;
///
/// let urls = parse_url_list("\"https://a.com\",https://b.com\nnot-a-url\n");
/// assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
/// ```
pub fn parse_url_list(text: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for line in text.lines() {
        for cell in line.split(',') {
            let cell = cell.trim().trim_matches('"').trim();
            if cell.is_empty() {
                continue;
            }

            match validate_url(cell) {
                Ok(_) => urls.push(cell.to_string()),
                Err(e) => tracing::warn!("Skipping input entry '{}': {}", cell, e),
            }
        }
    }

    urls
}
