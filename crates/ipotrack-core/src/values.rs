// Typed readings of raw sheet cells: numbers, dates and natural text order
use chrono::{DateTime, Datelike, NaiveDate};
use std::cmp::Ordering;

/// How values of a column compare when sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Date,
    Text,
}

impl FieldKind {
    /// Classify a column by its header name
    ///
    /// Matching ignores case and surrounding whitespace. The `... dt` names
    /// are what the table layout of the sheet calls its date columns.
    pub fn for_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "gmp" | "price" | "ipo size" | "lot" => FieldKind::Numeric,
            "open" | "close" | "boa dt" | "listing" | "open dt" | "close dt" | "listing dt" => {
                FieldKind::Date
            }
            _ => FieldKind::Text,
        }
    }
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Full-date layouts seen in the sheet, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %B %Y",
    "%d %b %Y",
    "%d %B, %Y",
    "%d %b, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%a, %d %b %Y",
];

/// Read a cell as a number
///
/// Everything except digits, `.` and `-` is thrown away first, so `₹1,250`
/// and `1,250 Cr` both read as 1250. The longest numeric prefix of what
/// remains wins; nothing numeric at all gives `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    parse_float_prefix(&cleaned)
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - end - 1;
        if digits > 0 || frac_digits > 0 {
            digits += frac_digits;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    s[..end].parse::<f64>().ok()
}

/// Read a cell as a calendar date
///
/// Full dates ("21 June 2024", "2024-06-21", ...) are parsed as written.
/// Otherwise a bare "day month" such as "05 Jan" is placed in `today`'s year,
/// or the following year when that would already be in the past.
pub fn parse_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_full_date(s).or_else(|| parse_day_month(s, today))
}

fn parse_full_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(widen_short_year)
}

/// `%Y` also takes two digits, so "25" comes back as year 25, not 2025
fn widen_short_year(date: NaiveDate) -> Option<NaiveDate> {
    if (0..100).contains(&date.year()) {
        date.with_year(2000 + date.year())
    } else {
        Some(date)
    }
}

fn parse_day_month(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut parts = s
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|p| !p.is_empty());

    let day = parse_day(parts.next()?)?;
    let month = month_number(parts.next()?)?;

    let year = today.year();
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) if date >= today => Some(date),
        // Already behind us (or 29 Feb in a short year): it must mean next year
        _ => NaiveDate::from_ymd_opt(year + 1, month, day),
    }
}

fn parse_day(token: &str) -> Option<u32> {
    let digits = token
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == ',' || c == '.');
    digits.parse().ok()
}

/// 1-based month from a name; only the first three letters matter
fn month_number(token: &str) -> Option<u32> {
    let letters: String = token
        .chars()
        .filter(|c| c.is_alphabetic())
        .take(3)
        .flat_map(char::to_lowercase)
        .collect();
    MONTHS
        .iter()
        .position(|m| *m == letters)
        .map(|i| i as u32 + 1)
}

/// Case-insensitive text order that compares digit runs by value,
/// so "IPO 2" comes before "IPO 10"
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let xs = take_digits(&mut left);
                let ys = take_digits(&mut right);
                let ord = cmp_digit_runs(&xs, &ys);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let ord = fold_case(x).cmp(&fold_case(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
