use chrono::NaiveDate;
use ipotrack_core::providers::FileSource;
use ipotrack_core::{
    parse_feed, Exporter, FeedOrigin, FeedService, RecordCollection, RecordStore, SortDirection,
};
use std::io::Write;

const DASHBOARD_FEED: &str = "Name,Status,Price,Open\n\
Alpha,Open - Apply Now,100,10 Jan\n\
,Upcoming,50,01 Feb\n\
Beta,Listed,75,05 Dec\n";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn column<'a>(c: &'a RecordCollection, key: &str) -> Vec<&'a str> {
    c.iter().map(|r| r.field_or_empty(key)).collect()
}

#[test]
fn test_blank_names_are_dropped() {
    let c = parse_feed("Name,Status\nA,Open\n   ,Open\n,Listed\nB,Listed\n").unwrap();
    assert_eq!(c.len(), 2);
    assert!(c.iter().all(|r| !r.name().trim().is_empty()));
}

#[test]
fn test_ingest_keeps_row_order() {
    let c = parse_feed("Name,Status\nZeta,Open\n,x\nAlpha,Open\nMu,Listed\n").unwrap();
    assert_eq!(c.names(), vec!["Zeta", "Alpha", "Mu"]);
}

#[test]
fn test_search_returns_subsequence() {
    let c = parse_feed(
        "Name,Status\n\
         Alpha Solar,Open\n\
         Beta,Listed\n\
         Gamma Solar,Upcoming\n\
         Delta,Open\n",
    )
    .unwrap();

    let found = c.search("solar");
    assert_eq!(found.names(), vec!["Alpha Solar", "Gamma Solar"]);
    assert_eq!(c.search(""), c);
}

#[test]
fn test_numeric_sort_puts_unparseable_last() {
    let c = parse_feed("Name,Price\nA,100\nB,20\nC,abc\nD,5\n").unwrap();

    let asc = c.sort_by("Price", SortDirection::Ascending);
    assert_eq!(column(&asc, "Price"), vec!["5", "20", "100", "abc"]);

    let desc = c.sort_by("Price", SortDirection::Descending);
    assert_eq!(column(&desc, "Price"), vec!["100", "20", "5", "abc"]);
}

#[test]
fn test_date_sort_resolves_day_month_against_today() {
    let c = parse_feed("Name,Open\nA,21 June 2024\nB,05 Jan\nC,N/A\n").unwrap();
    let today = date(2026, 10, 18);

    let asc = c.sort_by_on("Open", SortDirection::Ascending, today);
    // 05 Jan has passed this year, so it reads as January next year
    assert_eq!(column(&asc, "Open"), vec!["21 June 2024", "05 Jan", "N/A"]);

    let desc = c.sort_by_on("Open", SortDirection::Descending, today);
    assert_eq!(column(&desc, "Open"), vec!["05 Jan", "21 June 2024", "N/A"]);
}

#[test]
fn test_categorize_partitions_by_status() {
    let c = parse_feed(
        "Name,Status\n\
         A,Listed\n\
         B,listed at premium\n\
         C,N/A\n\
         D,Open\n",
    )
    .unwrap();

    let b = c.categorize();
    assert_eq!(b.listed.names(), vec!["A", "B"]);
    assert!(b.current.find_by_name("A").is_none());
    assert!(b.upcoming.find_by_name("A").is_none());
    for (_, section) in b.iter() {
        assert!(section.find_by_name("C").is_none());
    }
}

#[test]
fn test_reingest_is_idempotent() {
    let store = RecordStore::new();
    let first = store.ingest(DASHBOARD_FEED).unwrap();
    let second = store.ingest(DASHBOARD_FEED).unwrap();

    assert_eq!(*first, *second);
    assert!(!std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn test_dashboard_end_to_end() {
    let store = RecordStore::new();
    let c = store.ingest(DASHBOARD_FEED).unwrap();
    assert_eq!(c.names(), vec!["Alpha", "Beta"]);

    let b = c.categorize();
    assert_eq!(b.current.names(), vec!["Alpha"]);
    assert_eq!(b.listed.names(), vec!["Beta"]);
    assert!(b.upcoming.is_empty());

    let by_price = c.sort_by("Price", SortDirection::Ascending);
    assert_eq!(by_price.names(), vec!["Beta", "Alpha"]);
}

#[tokio::test]
async fn test_file_feed_through_service_and_export() {
    let mut feed = tempfile::NamedTempFile::new().unwrap();
    feed.write_all(DASHBOARD_FEED.as_bytes()).unwrap();

    let service = FeedService::new(Box::new(FileSource::new(feed.path())));
    assert_eq!(service.refresh().await.unwrap(), FeedOrigin::Live);

    let snapshot = service.snapshot();
    assert_eq!(snapshot.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ipos.json");
    Exporter::export_to_file(&snapshot, &out).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json[0]["Name"], "Alpha");
    assert_eq!(json[1]["Status"], "Listed");
}
