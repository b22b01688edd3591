use chrono::NaiveDate;

/// Inclusive list of ISO dates. Empty when either bound is malformed or end precedes start.
pub fn date_range(start: &str, end: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (parse_date(start), parse_date(end)) else {
        return Vec::new();
    };
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| day.format("%Y-%m-%d").to_string())
        .collect()
}

/// Number of days in the inclusive range, without building it.
pub fn day_span(start: &str, end: &str) -> Option<usize> {
    let (start, end) = (parse_date(start)?, parse_date(end)?);
    let days = end.signed_duration_since(start).num_days();
    usize::try_from(days).ok().map(|days| days + 1)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
