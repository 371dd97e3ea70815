use crate::buckets::BucketRules;
use crate::models::{fields, GmpTrend, RecordCollection};
use crate::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim_start_matches('.')).ok_or_else(|| {
            Error::ExportError(format!("Unknown export format '{}'. Use json, csv or md", s))
        })
    }
}

/// Columns shown in the markdown tables, when the feed has them
const MARKDOWN_COLUMNS: [&str; 8] = [
    fields::NAME,
    fields::STATUS,
    fields::GMP,
    fields::PRICE,
    fields::SUBSCRIPTION,
    fields::OPEN,
    fields::CLOSE,
    fields::LISTING,
];

/// Exporter for feed records
pub struct Exporter;

impl Exporter {
    /// Export records to a file, picking the format from the extension
    pub fn export_to_file<P: AsRef<Path>>(records: &RecordCollection, path: P) -> Result<()> {
        let path = path.as_ref();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                Error::ExportError(
                    "Could not determine export format from extension. Use .json, .csv, or .md"
                        .to_string(),
                )
            })?;

        Self::export_to_file_with_format(records, path, format)
    }

    pub fn export_to_file_with_format<P: AsRef<Path>>(
        records: &RecordCollection,
        path: P,
        format: ExportFormat,
    ) -> Result<()> {
        let content = match format {
            ExportFormat::Json => Self::to_json(records)?,
            ExportFormat::Csv => Self::to_csv(records)?,
            ExportFormat::Markdown => Self::to_markdown(records, &BucketRules::default()),
        };

        let mut file = File::create(path)
            .map_err(|e| Error::ExportError(format!("Failed to create file: {}", e)))?;

        file.write_all(content.as_bytes())
            .map_err(|e| Error::ExportError(format!("Failed to write file: {}", e)))?;

        Ok(())
    }

    /// Array of objects, keys in header order
    pub fn to_json(records: &RecordCollection) -> Result<String> {
        Ok(serde_json::to_string_pretty(records.records())?)
    }

    /// Header row followed by one row per record, quoted where needed
    pub fn to_csv(records: &RecordCollection) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(records.schema().names())
            .map_err(|e| Error::ExportError(format!("Failed to write CSV header: {}", e)))?;

        for record in records {
            writer
                .write_record(record.fields().map(|(_, value)| value))
                .map_err(|e| Error::ExportError(format!("Failed to write CSV row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::ExportError(format!("Failed to flush CSV: {}", e)))?;

        String::from_utf8(bytes).map_err(|e| Error::ExportError(e.to_string()))
    }

    /// One table per dashboard section, then a short summary
    pub fn to_markdown(records: &RecordCollection, rules: &BucketRules) -> String {
        let mut output = String::new();

        output.push_str("# IPO Dashboard\n\n");
        output.push_str(&format!("Total IPOs: {}\n\n", records.len()));

        let columns: Vec<&str> = {
            let known: Vec<&str> = MARKDOWN_COLUMNS
                .iter()
                .copied()
                .filter(|c| records.schema().contains(c))
                .collect();
            if known.is_empty() {
                records.schema().names().iter().map(String::as_str).collect()
            } else {
                known
            }
        };

        let buckets = records.categorize_with(rules);

        for (bucket, section) in buckets.iter() {
            output.push_str(&format!("## {} ({})\n\n", bucket.label(), section.len()));

            if section.is_empty() {
                output.push_str("_Nothing here right now._\n\n");
                continue;
            }

            output.push_str(&format!("| {} |\n", columns.join(" | ")));
            output.push_str(&format!(
                "|{}\n",
                columns.iter().map(|_| "---|").collect::<String>()
            ));

            for record in section {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| Self::escape_markdown(record.field_or_empty(c)))
                    .collect();
                output.push_str(&format!("| {} |\n", cells.join(" | ")));
            }
            output.push('\n');
        }

        let gainers = records
            .iter()
            .filter(|r| r.gmp_trend() == Some(GmpTrend::Gain))
            .count();
        let losers = records
            .iter()
            .filter(|r| r.gmp_trend() == Some(GmpTrend::Loss))
            .count();

        output.push_str("---\n\n");
        output.push_str("## Summary\n\n");
        output.push_str("| Section | Count |\n");
        output.push_str("|---------|-------|\n");
        for (bucket, section) in buckets.iter() {
            output.push_str(&format!("| {} | {} |\n", bucket.label(), section.len()));
        }
        output.push_str(&format!(
            "| Uncategorized | {} |\n",
            records.len() - buckets.total()
        ));
        output.push_str(&format!("| GMP positive | {} |\n", gainers));
        output.push_str(&format!("| GMP negative | {} |\n", losers));

        output
    }

    fn escape_markdown(value: &str) -> String {
        value.replace('|', "\\|").replace(['\r', '\n'], " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_feed;

    fn sample() -> RecordCollection {
        parse_feed(
            "Name,Status,GMP,Price,Description\n\
             Alpha,Open,+45,\"₹ 100\",\"Pipes, valves | pumps\"\n\
             Beta,Listed,-5,50,\n\
             Gamma,N/A,,,\n",
        )
        .unwrap()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_extension("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_extension("markdown"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::from_extension("xlsx"), None);
        assert_eq!(".csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_keeps_header_order() {
        let json = Exporter::to_json(&sample()).unwrap();
        let name_at = json.find("\"Name\"").unwrap();
        let status_at = json.find("\"Status\"").unwrap();
        let gmp_at = json.find("\"GMP\"").unwrap();
        assert!(name_at < status_at && status_at < gmp_at);

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 3);
        assert_eq!(parsed[0]["Price"], "₹ 100");
    }

    #[test]
    fn test_csv_quotes_and_reparses() {
        let records = sample();
        let csv = Exporter::to_csv(&records).unwrap();
        assert!(csv.starts_with("Name,Status,GMP,Price,Description"));
        assert!(csv.contains("\"Pipes, valves | pumps\""));

        let again = parse_feed(&csv).unwrap();
        assert_eq!(again, records);
    }

    #[test]
    fn test_markdown_sections_and_summary() {
        let md = Exporter::to_markdown(&sample(), &BucketRules::default());

        assert!(md.contains("Total IPOs: 3"));
        assert!(md.contains("## Current (1)"));
        assert!(md.contains("## Upcoming (0)"));
        assert!(md.contains("## Listed / Closed (1)"));
        assert!(md.contains("| Name | Status | GMP | Price |"));
        assert!(md.contains("| Alpha | Open | +45 | ₹ 100 |"));
        assert!(md.contains("| Uncategorized | 1 |"));
        assert!(md.contains("| GMP positive | 1 |"));
        assert!(md.contains("| GMP negative | 1 |"));
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let records = parse_feed("Name,Status\n\"A|B\",Open\n").unwrap();
        let md = Exporter::to_markdown(&records, &BucketRules::default());
        assert!(md.contains("| A\\|B | Open |"));
    }

    #[test]
    fn test_export_to_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("ipos.csv");
        Exporter::export_to_file(&sample(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Name,Status"));

        let bad = dir.path().join("ipos.xlsx");
        assert!(matches!(
            Exporter::export_to_file(&sample(), &bad),
            Err(Error::ExportError(_))
        ));
    }
}
