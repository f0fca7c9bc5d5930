//! Publication date normalization.
//!
//! Feeds publish dates in a handful of loosely followed formats. Each accepted
//! layout is tried in order and the first successful parse wins; when nothing
//! matches, callers fall back to the current time so that an item is never
//! dropped because of its date. That fallback loses the real publish date.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// A date layout accepted in `pubDate` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Numeric,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `Mon, 2 Jan 2006 15:04:05 MST`
    DayMonthZone,
}

pub const DEFAULT_LAYOUTS: [DateLayout; 4] = [
    DateLayout::Rfc1123Numeric,
    DateLayout::Rfc1123,
    DateLayout::Rfc3339,
    DateLayout::DayMonthZone,
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl DateLayout {
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        match self {
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|date| date.with_timezone(&Utc)),
            DateLayout::Rfc1123Numeric => {
                let rest = strip_weekday(raw)?;
                if !has_two_digit_day(rest) {
                    return None;
                }
                DateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S %z")
                    .ok()
                    .map(|date| date.with_timezone(&Utc))
            }
            DateLayout::Rfc1123 => {
                let rest = strip_weekday(raw)?;
                if !has_two_digit_day(rest) {
                    return None;
                }
                parse_with_zone_name(rest)
            }
            DateLayout::DayMonthZone => parse_with_zone_name(strip_weekday(raw)?),
        }
    }
}

/// Ordered list of layouts with first-match-wins semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNormalizer {
    layouts: Vec<DateLayout>,
}

impl DateNormalizer {
    pub fn new(layouts: Vec<DateLayout>) -> Self {
        DateNormalizer { layouts }
    }

    pub fn layouts(&self) -> &[DateLayout] {
        &self.layouts
    }

    /// Returns the first successful parse, or `None` when no layout matches.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        self.layouts.iter().find_map(|layout| layout.parse(raw))
    }

    /// Parses `raw`, substituting `now` when no layout matches.
    pub fn normalize(&self, raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        self.parse(raw).unwrap_or(now)
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        DateNormalizer::new(DEFAULT_LAYOUTS.to_vec())
    }
}

// The weekday must look like a weekday but is not checked against the date;
// plenty of feeds get it wrong.
fn strip_weekday(raw: &str) -> Option<&str> {
    let (weekday, rest) = raw.split_once(',')?;
    let weekday = weekday.trim();
    if !WEEKDAYS.iter().any(|day| day.eq_ignore_ascii_case(weekday)) {
        return None;
    }
    Some(rest.trim_start())
}

fn has_two_digit_day(rest: &str) -> bool {
    rest.split_whitespace()
        .next()
        .map_or(false, |day| day.len() == 2 && day.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_with_zone_name(rest: &str) -> Option<DateTime<Utc>> {
    let (stamp, zone) = rest.trim_end().rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(stamp.trim_end(), "%d %b %Y %H:%M:%S").ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|date| date.with_timezone(&Utc))
}

/// Resolves an RFC 822 zone abbreviation. Unknown alphabetic names are taken as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.len() > 5 || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
