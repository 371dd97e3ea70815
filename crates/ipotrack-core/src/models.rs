use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

use crate::values;

/// Header names the dashboard knows about. Anything else in the sheet is
/// still kept, just looked up by its raw header string.
pub mod fields {
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const STATUS: &str = "Status";
    pub const GMP: &str = "GMP";
    pub const SUBSCRIPTION: &str = "Subscription";
    pub const PRICE: &str = "Price";
    pub const EST_LISTING: &str = "Est Listing";
    pub const IPO_SIZE: &str = "IPO Size";
    pub const LOT: &str = "Lot";
    pub const OPEN: &str = "Open";
    pub const CLOSE: &str = "Close";
    pub const BOA_DT: &str = "BoA Dt";
    pub const LISTING: &str = "Listing";
    pub const DESCRIPTION: &str = "Description";
    pub const IMAGE_URL: &str = "ImageURL";
    pub const IMAGE: &str = "Image";
    pub const APPLY_URL: &str = "ApplyURL";
    pub const ALLOTMENT_LINKS: [&str; 4] = [
        "AllotmentLink1",
        "AllotmentLink2",
        "AllotmentLink3",
        "Allotment Link",
    ];
}

/// Ordered field names taken from the header row of one feed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of the first column with this exact name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// Sign of the grey market premium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GmpTrend {
    Gain,
    Loss,
}

/// One row of the feed, keyed by header name
///
/// Records are immutable and cheap to clone: the schema and the cell values
/// are shared, so filtering and sorting only shuffle reference counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Arc<[String]>,
}

impl Record {
    /// `values` must line up with `schema`; ingestion pads and truncates rows
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<String>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self {
            schema,
            values: values.into(),
        }
    }

    /// Raw cell value, or `None` when the feed has no such column
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.schema
            .index_of(name)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Cell value with a missing column read as empty
    pub fn field_or_empty(&self, name: &str) -> &str {
        self.get_field(name).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.field_or_empty(fields::NAME)
    }

    pub fn status(&self) -> &str {
        self.field_or_empty(fields::STATUS)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// (header, value) pairs in header order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Field value read as a number, see [`values::parse_number`]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get_field(name).and_then(values::parse_number)
    }

    /// Field value read as a calendar date, see [`values::parse_date`]
    pub fn date(&self, name: &str, today: NaiveDate) -> Option<NaiveDate> {
        self.get_field(name).and_then(|v| values::parse_date(v, today))
    }

    pub fn gmp_trend(&self) -> Option<GmpTrend> {
        self.numeric(fields::GMP).map(|gmp| {
            if gmp >= 0.0 {
                GmpTrend::Gain
            } else {
                GmpTrend::Loss
            }
        })
    }

    /// Non-empty allotment-check links in column order
    pub fn allotment_links(&self) -> Vec<&str> {
        fields::ALLOTMENT_LINKS
            .iter()
            .filter_map(|name| self.get_field(name))
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .collect()
    }

    pub fn apply_url(&self) -> Option<&str> {
        non_blank(self.get_field(fields::APPLY_URL))
    }

    pub fn image_url(&self) -> Option<&str> {
        non_blank(self.get_field(fields::IMAGE_URL))
            .or_else(|| non_blank(self.get_field(fields::IMAGE)))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Ordered sequence of records sharing one schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordCollection {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl RecordCollection {
    pub(crate) fn new(schema: Arc<Schema>, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    /// Same schema, different selection or order of records
    pub(crate) fn derive(&self, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            records,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Names in collection order, mostly for tests and quick listings
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(Record::name).collect()
    }

    /// First record whose name matches, ignoring case and surrounding space
    pub fn find_by_name(&self, name: &str) -> Option<&Record> {
        let wanted = name.trim().to_lowercase();
        self.records
            .iter()
            .find(|r| r.name().trim().to_lowercase() == wanted)
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
