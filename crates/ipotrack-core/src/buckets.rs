use serde::{Deserialize, Serialize};

use crate::models::{Record, RecordCollection};

/// The three sections of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Current,
    Upcoming,
    Listed,
}

impl Bucket {
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Current => "Current",
            Bucket::Upcoming => "Upcoming",
            Bucket::Listed => "Listed / Closed",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status keywords that route a record into each bucket
///
/// Checked case-insensitively as substrings, upcoming first, then current,
/// then listed. The first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRules {
    #[serde(default = "default_upcoming")]
    pub upcoming: Vec<String>,

    #[serde(default = "default_current")]
    pub current: Vec<String>,

    #[serde(default = "default_listed")]
    pub listed: Vec<String>,
}

fn default_upcoming() -> Vec<String> {
    vec!["upcoming".into(), "pre-open".into()]
}

fn default_current() -> Vec<String> {
    vec![
        "apply".into(),
        "open".into(),
        "pending".into(),
        "allotment".into(),
        "allotted".into(),
    ]
}

fn default_listed() -> Vec<String> {
    vec!["listed".into(), "closed".into()]
}

impl Default for BucketRules {
    fn default() -> Self {
        Self {
            upcoming: default_upcoming(),
            current: default_current(),
            listed: default_listed(),
        }
    }
}

impl BucketRules {
    /// Which bucket a status belongs to, if any
    pub fn classify(&self, status: &str) -> Option<Bucket> {
        let status = status.to_lowercase();

        if any_keyword(&status, &self.upcoming) {
            Some(Bucket::Upcoming)
        } else if any_keyword(&status, &self.current) {
            Some(Bucket::Current)
        } else if any_keyword(&status, &self.listed) {
            Some(Bucket::Listed)
        } else {
            None
        }
    }

    pub fn bucket_of(&self, record: &Record) -> Option<Bucket> {
        self.classify(record.status())
    }
}

fn any_keyword(status: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && status.contains(&k.to_lowercase()))
}

/// A collection split by status; records matching no rule are left out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Buckets {
    pub current: RecordCollection,
    pub upcoming: RecordCollection,
    pub listed: RecordCollection,
}

impl Buckets {
    pub fn get(&self, bucket: Bucket) -> &RecordCollection {
        match bucket {
            Bucket::Current => &self.current,
            Bucket::Upcoming => &self.upcoming,
            Bucket::Listed => &self.listed,
        }
    }

    /// Sections in dashboard order
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &RecordCollection)> {
        [Bucket::Current, Bucket::Upcoming, Bucket::Listed]
            .into_iter()
            .map(move |b| (b, self.get(b)))
    }

    pub fn total(&self) -> usize {
        self.current.len() + self.upcoming.len() + self.listed.len()
    }
}

impl RecordCollection {
    /// Split into current / upcoming / listed with the default keywords
    pub fn categorize(&self) -> Buckets {
        self.categorize_with(&BucketRules::default())
    }

    /// Split by `rules`, keeping the input order inside each bucket
    pub fn categorize_with(&self, rules: &BucketRules) -> Buckets {
        let mut current = Vec::new();
        let mut upcoming = Vec::new();
        let mut listed = Vec::new();

        for record in self.iter() {
            match rules.bucket_of(record) {
                Some(Bucket::Current) => current.push(record.clone()),
                Some(Bucket::Upcoming) => upcoming.push(record.clone()),
                Some(Bucket::Listed) => listed.push(record.clone()),
                None => {}
            }
        }

        Buckets {
            current: self.derive(current),
            upcoming: self.derive(upcoming),
            listed: self.derive(listed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_feed;

    #[test]
    fn test_classify_precedence() {
        let rules = BucketRules::default();
        assert_eq!(rules.classify("Upcoming"), Some(Bucket::Upcoming));
        // "Pre-Open" also contains "open"; upcoming is checked first
        assert_eq!(rules.classify("Pre-Open"), Some(Bucket::Upcoming));
        assert_eq!(rules.classify("Open - Apply Now"), Some(Bucket::Current));
        assert_eq!(rules.classify("Allotment Pending"), Some(Bucket::Current));
        assert_eq!(rules.classify("Allotted"), Some(Bucket::Current));
        assert_eq!(rules.classify("LISTED"), Some(Bucket::Listed));
        assert_eq!(rules.classify("Closed"), Some(Bucket::Listed));
        assert_eq!(rules.classify("N/A"), None);
        assert_eq!(rules.classify(""), None);
    }

    #[test]
    fn test_categorize_drops_unmatched_and_keeps_order() {
        let c = parse_feed(
            "Name,Status\n\
             A,Open\n\
             B,Listed\n\
             C,N/A\n\
             D,Upcoming\n\
             E,Apply now\n\
             F,Closed\n",
        )
        .unwrap();

        let b = c.categorize();
        assert_eq!(b.current.names(), vec!["A", "E"]);
        assert_eq!(b.upcoming.names(), vec!["D"]);
        assert_eq!(b.listed.names(), vec!["B", "F"]);
        assert_eq!(b.total(), 5);
    }

    #[test]
    fn test_custom_rules() {
        let c = parse_feed("Name,Status\nA,Allotted\nB,Open\n").unwrap();
        let rules = BucketRules {
            current: vec!["open".into()],
            listed: vec!["listed".into(), "allotted".into()],
            ..BucketRules::default()
        };

        let b = c.categorize_with(&rules);
        assert_eq!(b.current.names(), vec!["B"]);
        assert_eq!(b.listed.names(), vec!["A"]);
    }

    #[test]
    fn test_missing_status_column_lands_nowhere() {
        let c = parse_feed("Name,Price\nA,10\n").unwrap();
        assert_eq!(c.categorize().total(), 0);
    }

    #[test]
    fn test_iter_is_dashboard_order() {
        let b = Buckets::default();
        let order: Vec<Bucket> = b.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec![Bucket::Current, Bucket::Upcoming, Bucket::Listed]);
    }
}
