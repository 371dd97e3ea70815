// Plain-text tables for the terminal
use ipotrack_core::models::fields;
use ipotrack_core::{GmpTrend, Record, RecordCollection};

const MAX_CELL: usize = 32;

/// Columns printed when the user doesn't pick any
pub const DEFAULT_COLUMNS: [&str; 7] = [
    fields::NAME,
    fields::STATUS,
    fields::GMP,
    fields::PRICE,
    fields::OPEN,
    fields::CLOSE,
    fields::LISTING,
];

/// Requested columns the feed actually has, falling back to the defaults
pub fn pick_columns<'a>(records: &'a RecordCollection, wanted: &'a [String]) -> Vec<&'a str> {
    let chosen: Vec<&str> = if wanted.is_empty() {
        DEFAULT_COLUMNS.to_vec()
    } else {
        wanted.iter().map(String::as_str).collect()
    };

    chosen
        .into_iter()
        .filter(|c| records.schema().contains(c))
        .collect()
}

pub fn render(records: &RecordCollection, columns: &[&str]) -> String {
    if columns.is_empty() {
        return "(no matching columns in feed)\n".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| columns.iter().map(|c| cell(r, c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, columns.iter().copied(), &widths);
    push_row(
        &mut out,
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().iter().map(String::as_str),
        &widths,
    );
    for row in &rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn cell(record: &Record, column: &str) -> String {
    let value = record.field_or_empty(column).trim();
    let value = if column == fields::GMP {
        match record.gmp_trend() {
            Some(GmpTrend::Gain) => format!("▲ {}", value),
            Some(GmpTrend::Loss) => format!("▼ {}", value),
            None => value.to_string(),
        }
    } else {
        value.to_string()
    };
    truncate(&value.replace(['\r', '\n'], " "), MAX_CELL)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipotrack_core::parse_feed;

    #[test]
    fn test_pick_columns_skips_missing() {
        let c = parse_feed("Name,Status,Price\nA,Open,10\n").unwrap();
        assert_eq!(pick_columns(&c, &[]), vec!["Name", "Status", "Price"]);

        let wanted = vec!["Price".to_string(), "Lot".to_string()];
        assert_eq!(pick_columns(&c, &wanted), vec!["Price"]);
    }

    #[test]
    fn test_render_aligns_columns() {
        let c = parse_feed("Name,Status\nAlpha,Open\nB,Listed\n").unwrap();
        let out = render(&c, &["Name", "Status"]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Name   Status");
        assert_eq!(lines[1], "-----  ------");
        assert_eq!(lines[2], "Alpha  Open");
        assert_eq!(lines[3], "B      Listed");
    }

    #[test]
    fn test_gmp_gets_a_trend_marker() {
        let c = parse_feed("Name,GMP\nA,+40\nB,-3\nC,\n").unwrap();
        let out = render(&c, &["GMP"]);
        assert!(out.contains("▲ +40"));
        assert!(out.contains("▼ -3"));
    }

    #[test]
    fn test_truncate_long_values() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
