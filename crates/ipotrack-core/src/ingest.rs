use std::sync::Arc;
use tracing::debug;

use crate::models::{fields, Record, RecordCollection, Schema};
use crate::{Error, Result};

/// Turn raw CSV text into an ordered record collection
///
/// The first line names the fields. Header names are trimmed of surrounding
/// whitespace (and a leading BOM), so `" Name "` is looked up as `"Name"`.
/// Short rows are padded with empty cells, long rows are cut to the header
/// width, and rows without a `Name` are skipped. Only a feed with nothing
/// usable in its header is an error.
pub fn parse_feed(raw: &str) -> Result<RecordCollection> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    // An unpublished sheet answers with a sign-in page instead of CSV
    if text.trim_start().starts_with('<') {
        return Err(Error::FeedParse {
            line: Some(1),
            reason: "feed looks like HTML, not CSV".into(),
        });
    }

    // The csv reader skips blank lines, which would promote a data row to header
    if !text.is_empty() && text.lines().next().is_some_and(|l| l.trim().is_empty()) {
        return Err(Error::FeedParse {
            line: Some(1),
            reason: "header row is empty".into(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = reader.records();

    let header = match rows.next() {
        Some(row) => row?,
        None => return Err(Error::parse("feed is empty")),
    };

    let names: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
    if names.iter().all(|n| n.is_empty()) {
        return Err(Error::FeedParse {
            line: Some(1),
            reason: "header row is empty".into(),
        });
    }

    let schema = Arc::new(Schema::new(names));
    let name_col = schema.index_of(fields::NAME);
    if name_col.is_none() {
        debug!("Feed header has no {} column; every row will be skipped", fields::NAME);
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        let row = row?;

        let has_name = name_col
            .and_then(|i| row.get(i))
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            skipped += 1;
            continue;
        }

        let values = (0..schema.len())
            .map(|i| row.get(i).unwrap_or_default().to_string())
            .collect();
        records.push(Record::new(Arc::clone(&schema), values));
    }

    debug!(
        "Parsed feed: {} columns, {} records, {} rows skipped",
        schema.len(),
        records.len(),
        skipped
    );

    Ok(RecordCollection::new(schema, records))
}
