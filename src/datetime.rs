//! Date and time decoding for `chrono` types.
//!
//! Form inputs carry timestamps in many spellings, so the raw value is tried
//! against an ordered list of layouts and the first one that parses wins.

use std::{error::Error, fmt};

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, ParseResult, Utc, Weekday,
};

use crate::DecoderRegistry;

/// How a layout's format string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// RFC 3339 with optional fractional seconds.
    Rfc3339,
    /// A date and time with an explicit UTC offset (`%z`).
    Zoned(&'static str),
    /// A date and time without an offset; read as UTC.
    Naive(&'static str),
    /// A date and time without a year; read as year 0, UTC.
    Yearless(&'static str),
    /// A calendar date; read as midnight UTC.
    Date(&'static str),
    /// A time of day; read on 0000-01-01 UTC.
    Time(&'static str),
}

/// Layouts tried by [`parse_datetime`], in order.
///
/// Layouts with a numeric offset come before their zone-name twins: `%Z` skips
/// any word when parsing, so it would otherwise swallow `-0700` and read the
/// time as UTC.
pub const LAYOUTS: &[Layout] = &[
    // 01/02 03:04:05PM '06 -0700
    Layout::Zoned("%m/%d %I:%M:%S%p '%y %z"),
    // Mon Jan _2 15:04:05 2006
    Layout::Naive("%a %b %e %H:%M:%S %Y"),
    // Mon Jan 02 15:04:05 -0700 2006
    Layout::Zoned("%a %b %d %H:%M:%S %z %Y"),
    // Mon Jan _2 15:04:05 MST 2006
    Layout::Naive("%a %b %e %H:%M:%S %Z %Y"),
    // 02 Jan 06 15:04 -0700
    Layout::Zoned("%d %b %y %H:%M %z"),
    // 02 Jan 06 15:04 MST
    Layout::Naive("%d %b %y %H:%M %Z"),
    // Monday, 02-Jan-06 15:04:05 MST
    Layout::Naive("%A, %d-%b-%y %H:%M:%S %Z"),
    // Mon, 02 Jan 2006 15:04:05 -0700
    Layout::Zoned("%a, %d %b %Y %H:%M:%S %z"),
    // Mon, 02 Jan 2006 15:04:05 MST
    Layout::Naive("%a, %d %b %Y %H:%M:%S %Z"),
    // 2006-01-02T15:04:05.999999999Z07:00
    Layout::Rfc3339,
    // 3:04PM
    Layout::Time("%I:%M%p"),
    // Jan _2 15:04:05.000000000
    Layout::Yearless("%b %e %H:%M:%S%.f"),
    // 2006-01-02 15:04:05
    Layout::Naive("%Y-%m-%d %H:%M:%S"),
    // 2006-01-02T15:04 and 2006-01-02T15:04:05, as sent by datetime-local inputs
    Layout::Naive("%Y-%m-%dT%H:%M"),
    Layout::Naive("%Y-%m-%dT%H:%M:%S"),
    // 2006-01-02
    Layout::Date("%Y-%m-%d"),
    // Jan 2, 2006
    Layout::Date("%b %d, %Y"),
    // 15:04:05
    Layout::Time("%H:%M:%S"),
    // 15:04
    Layout::Time("%H:%M"),
];

impl Layout {
    fn parse(self, raw: &str) -> ParseResult<DateTime<FixedOffset>> {
        match self {
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(raw),
            Layout::Zoned(format) => {
                ignoring_weekday(raw, format, |raw, format| DateTime::parse_from_str(raw, format))
            }
            Layout::Naive(format) => ignoring_weekday(raw, format, |raw, format| {
                NaiveDateTime::parse_from_str(raw, format)
            })
            .map(|naive| naive.and_utc().fixed_offset()),
            Layout::Yearless(format) => {
                NaiveDateTime::parse_from_str(&format!("0000 {raw}"), &format!("%Y {format}"))
                    .map(|naive| naive.and_utc().fixed_offset())
            }
            Layout::Date(format) => NaiveDate::parse_from_str(raw, format)
                .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
            Layout::Time(format) => {
                let time = NaiveTime::parse_from_str(raw, format)?;
                let day = NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or(NaiveDate::MIN);
                Ok(day.and_time(time).and_utc().fixed_offset())
            }
        }
    }
}

/// Parses with `format`, then retries with the leading weekday dropped from
/// both sides. A weekday name must be spelled correctly but need not match
/// the date.
fn ignoring_weekday<T>(
    raw: &str,
    format: &str,
    parse: impl Fn(&str, &str) -> ParseResult<T>,
) -> ParseResult<T> {
    parse(raw, format).or_else(|err| match strip_weekday(raw, format) {
        Some((raw, format)) => parse(raw, format),
        None => Err(err),
    })
}

fn strip_weekday<'a, 'f>(raw: &'a str, format: &'f str) -> Option<(&'a str, &'f str)> {
    let rest = format
        .strip_prefix("%a")
        .or_else(|| format.strip_prefix("%A"))?;
    let (separator, format) = rest.split_at(rest.find('%').unwrap_or(rest.len()));

    let (word, raw) = raw.split_at(
        raw.find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(raw.len()),
    );
    word.parse::<Weekday>().ok()?;
    Some((raw.strip_prefix(separator)?, format))
}

/// No entry of [`LAYOUTS`] accepted the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoLayoutMatched {
    value: String,
}

impl NoLayoutMatched {
    /// The rejected input.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for NoLayoutMatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time value: {:?} (no known layout matched)", self.value)
    }
}

impl Error for NoLayoutMatched {}

/// Parses `raw` with the first matching entry of [`LAYOUTS`].
pub fn parse_datetime(raw: &str) -> Result<DateTime<FixedOffset>, NoLayoutMatched> {
    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(raw).ok())
        .ok_or_else(|| NoLayoutMatched {
            value: raw.to_owned(),
        })
}

pub(crate) fn register_defaults(registry: &DecoderRegistry) {
    registry.register(parse_datetime);
    registry.register(|raw: &str| parse_datetime(raw).map(|at| at.with_timezone(&Utc)));
    registry.register(|raw: &str| parse_datetime(raw).map(|at| at.naive_local()));
    registry.register(|raw: &str| parse_datetime(raw).map(|at| at.date_naive()));
}
