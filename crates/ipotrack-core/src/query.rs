// Read-only queries over a record collection: search, sort, status filter
//
// Every query returns a new collection and leaves its input alone, so any
// number of them can run against the same snapshot.
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::{fields, Record, RecordCollection};
use crate::values::{natural_cmp, parse_date, parse_number, FieldKind};

/// Fields a plain search looks at
pub const DEFAULT_SEARCH_FIELDS: [&str; 6] = [
    fields::NAME,
    fields::STATUS,
    fields::TYPE,
    fields::GMP,
    fields::PRICE,
    fields::DESCRIPTION,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status dropdown on the card view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Upcoming,
    Listed,
    Allotted,
}

impl StatusFilter {
    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Open => "Open",
            StatusFilter::Upcoming => "Upcoming",
            StatusFilter::Listed => "Listed",
            StatusFilter::Allotted => "Allotted",
        }
    }

    pub fn all() -> [StatusFilter; 5] {
        [
            StatusFilter::All,
            StatusFilter::Open,
            StatusFilter::Upcoming,
            StatusFilter::Listed,
            StatusFilter::Allotted,
        ]
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            StatusFilter::All => true,
            other => record
                .status()
                .to_lowercase()
                .contains(&other.label().to_lowercase()),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StatusFilter::all()
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown status filter: {}", wanted))
    }
}

/// Which column a table is sorted by, and which way
///
/// Mirrors clicking column headers: the same header again flips the
/// direction, a different header starts over ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    key: Option<String>,
    direction: SortDirection,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.toggled();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Ascending;
        }
    }

    /// Sort a collection by the current key; no key leaves it as is
    pub fn apply(&self, collection: &RecordCollection) -> RecordCollection {
        self.apply_on(collection, today())
    }

    pub fn apply_on(&self, collection: &RecordCollection, today: NaiveDate) -> RecordCollection {
        match &self.key {
            Some(key) => collection.sort_by_on(key, self.direction, today),
            None => collection.clone(),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Missing values go last whichever way the sort runs
fn compare_nullable<T>(
    a: &Option<T>,
    b: &Option<T>,
    direction: SortDirection,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => direction.apply(cmp(x, y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of records by a precomputed key
fn sort_keyed<K>(
    records: &[Record],
    key_of: impl Fn(&Record) -> K,
    cmp: impl Fn(&K, &K) -> Ordering,
) -> Vec<Record> {
    let mut keyed: Vec<(K, &Record)> = records.iter().map(|r| (key_of(r), r)).collect();
    keyed.sort_by(|(a, _), (b, _)| cmp(a, b));
    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

impl RecordCollection {
    /// Case-insensitive substring search over [`DEFAULT_SEARCH_FIELDS`]
    pub fn search(&self, term: &str) -> RecordCollection {
        self.search_in(term, &DEFAULT_SEARCH_FIELDS)
    }

    /// Keep records where any of `fields` contains `term`, ignoring case
    ///
    /// An empty term keeps everything; an empty field list keeps nothing.
    pub fn search_in<S: AsRef<str>>(&self, term: &str, fields: &[S]) -> RecordCollection {
        if term.is_empty() {
            return self.clone();
        }

        let needle = term.to_lowercase();
        let kept = self
            .iter()
            .filter(|record| {
                fields.iter().any(|field| {
                    record
                        .field_or_empty(field.as_ref())
                        .to_lowercase()
                        .contains(&needle)
                })
            })
            .cloned()
            .collect();
        self.derive(kept)
    }

    pub fn filter_status(&self, filter: StatusFilter) -> RecordCollection {
        if filter == StatusFilter::All {
            return self.clone();
        }
        self.derive(self.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    /// Sort by one column, picking the comparison from the column name
    ///
    /// Numeric and date columns push unreadable values to the end in both
    /// directions. A key the feed doesn't have leaves the order untouched.
    pub fn sort_by(&self, key: &str, direction: SortDirection) -> RecordCollection {
        self.sort_by_on(key, direction, today())
    }

    /// [`sort_by`](Self::sort_by) with an explicit "today" for day-month dates
    pub fn sort_by_on(
        &self,
        key: &str,
        direction: SortDirection,
        today: NaiveDate,
    ) -> RecordCollection {
        if !self.schema().contains(key) {
            return self.clone();
        }

        let records = self.records();
        let sorted = match FieldKind::for_key(key) {
            FieldKind::Numeric => sort_keyed(
                records,
                |r| parse_number(r.field_or_empty(key)),
                |a, b| compare_nullable(a, b, direction, |x, y| x.total_cmp(y)),
            ),
            FieldKind::Date => sort_keyed(
                records,
                |r| parse_date(r.field_or_empty(key), today),
                |a, b| compare_nullable(a, b, direction, |x, y| x.cmp(y)),
            ),
            FieldKind::Text => sort_keyed(
                records,
                |r| r.field_or_empty(key).to_string(),
                |a, b| direction.apply(natural_cmp(a, b)),
            ),
        };

        self.derive(sorted)
    }
}
