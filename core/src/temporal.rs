//! Date parsing and date-derived fields (age, tenure, period).
//!
//! Unparsable dates never raise: they coerce to null and every field
//! derived from them is null as well.

use crate::{
    error::EnrichResult,
    table::{Table, Value},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

const DAY_FIRST: &str = "%d/%m/%Y";

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", DAY_FIRST, "%Y/%m/%d"];

const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: f64 = 30.0;

enum Parsed {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

fn parse_any(raw: &str) -> Option<Parsed> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Parsed::Aware(dt));
    }
    if let Some(dt) = AWARE_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
    {
        return Some(Parsed::Aware(dt));
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(Parsed::Naive(dt));
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .map(|d| Parsed::Naive(d.and_time(NaiveTime::MIN)))
}

/// Strict `dd/mm/YYYY`.
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FIRST)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Flexible parse; any offset is dropped, keeping the wall-clock time.
pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    parse_any(raw).map(|p| match p {
        Parsed::Aware(dt) => dt.naive_local(),
        Parsed::Naive(dt) => dt,
    })
}

/// Flexible parse normalized to UTC. Naive input is taken as UTC.
pub fn parse_utc(raw: &str) -> Option<NaiveDateTime> {
    parse_any(raw).map(|p| match p {
        Parsed::Aware(dt) => dt.naive_utc(),
        Parsed::Naive(dt) => dt,
    })
}

/// `YYYY-MM` period key.
pub fn period_of(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

/// Whole days from `from` to `to`, floored.
pub fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_seconds().div_euclid(86_400)
}

/// Months of tenure: days / 30, rounded half to even.
pub fn tenure_months(days: i64) -> i64 {
    (days as f64 / DAYS_PER_MONTH).round_ties_even() as i64
}

/// Parse every cell of `column` with `parser`, replacing the column by the
/// parsed timestamps (null where parsing failed). Already-parsed cells are
/// kept, so re-running is harmless. Returns the parsed values, or `None`
/// when the column is absent.
pub fn coerce_dates(
    table: &mut Table,
    column: &str,
    parser: fn(&str) -> Option<NaiveDateTime>,
) -> EnrichResult<Option<Vec<Option<NaiveDateTime>>>> {
    let Some(values) = table.column(column) else {
        return Ok(None);
    };
    let parsed: Vec<Option<NaiveDateTime>> = values
        .iter()
        .map(|value| match value {
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parser(s),
            _ => None,
        })
        .collect();
    let invalid = parsed
        .iter()
        .zip(values)
        .filter(|(p, v)| p.is_none() && !v.is_null())
        .count();
    if invalid > 0 {
        log::debug!("{invalid} unparsable value(s) in '{column}' coerced to null");
    }
    table.set_column(column, parsed.iter().map(|p| p.map_or(Value::Null, Value::Timestamp)).collect())?;
    Ok(Some(parsed))
}

/// Age in whole years from a `dd/mm/YYYY` birth date column, stored in
/// `target` as a nullable integer.
pub fn compute_age(
    table: &mut Table,
    birth_column: &str,
    target: &str,
    as_of: NaiveDateTime,
) -> EnrichResult<()> {
    let Some(births) = coerce_dates(table, birth_column, parse_day_first)? else {
        return Ok(());
    };
    let ages = births
        .into_iter()
        .map(|b| b.map_or(Value::Null, |b| Value::Int(days_between(b, as_of).div_euclid(DAYS_PER_YEAR))))
        .collect();
    table.set_column(target, ages)
}

/// Tenure in months since the inclusion date, stored in `target` as a
/// nullable integer.
pub fn compute_tenure(
    table: &mut Table,
    inclusion_column: &str,
    target: &str,
    as_of: NaiveDateTime,
) -> EnrichResult<()> {
    let Some(inclusions) = coerce_dates(table, inclusion_column, parse_flexible)? else {
        return Ok(());
    };
    let tenure = inclusions
        .into_iter()
        .map(|d| d.map_or(Value::Null, |d| Value::Int(tenure_months(days_between(d, as_of)))))
        .collect();
    table.set_column(target, tenure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn utc_parse_converts_offsets() {
        assert_eq!(
            parse_utc("2024-03-31 22:30:00-03:00"),
            Some(ts("2024-04-01 01:30:00"))
        );
        assert_eq!(parse_utc("2024-03-31 22:30:00"), Some(ts("2024-03-31 22:30:00")));
    }

    #[test]
    fn flexible_parse_keeps_wall_time() {
        assert_eq!(
            parse_flexible("2020-05-10T08:00:00+02:00"),
            Some(ts("2020-05-10 08:00:00"))
        );
        assert_eq!(parse_flexible("10/05/2020"), Some(ts("2020-05-10 00:00:00")));
        assert_eq!(parse_flexible("not a date"), None);
    }

    #[test]
    fn tenure_rounds_half_to_even() {
        assert_eq!(tenure_months(45), 2); // 1.5
        assert_eq!(tenure_months(75), 2); // 2.5
        assert_eq!(tenure_months(76), 3);
    }

    #[test]
    fn days_between_floors_partial_days() {
        assert_eq!(days_between(ts("2024-01-01 00:00:00"), ts("2024-01-02 12:00:00")), 1);
        assert_eq!(days_between(ts("2024-01-02 12:00:00"), ts("2024-01-01 00:00:00")), -2);
    }
}
