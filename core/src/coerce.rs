//! Conversions from the loosely typed strings a response carries into
//! domain scalars.
//!
//! None of these functions fail: malformed input yields `None`, and the
//! enum and timestamp conversions emit a `warn` event so the bad value
//! shows up in traces without breaking the call.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// An enumeration with a fixed wire vocabulary.
///
/// `MEMBERS` is the lookup table used by `to_enum`; names are matched
/// case-insensitively.
pub trait WireEnum: Copy + Sized + 'static {
    const TYPE_NAME: &'static str;
    const MEMBERS: &'static [(&'static str, Self)];
}

/// Parse a decimal identifier. Surrounding whitespace is ignored.
pub fn to_identifier(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse().ok()
}

/// Parse a truth value: `true`/`false`/`1`/`0`, any case.
pub fn to_truth(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

pub fn to_enum<E: WireEnum>(raw: Option<&str>) -> Option<E> {
    let raw = raw?.trim();
    let found = E::MEMBERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, member)| *member);
    if found.is_none() {
        tracing::warn!(
            stage = "coerce.enum",
            enum_type = E::TYPE_NAME,
            value = %raw,
            "unknown enum member"
        );
    }
    found
}

/// One accepted date-time layout.
#[derive(Clone, Copy)]
pub struct TimestampFormat {
    pub name: &'static str,
    pub parse: fn(&str) -> Option<DateTime<Utc>>,
}

/// Accepted layouts in priority order; the first one that parses the whole
/// input wins.
pub const TIMESTAMP_FORMATS: &[TimestampFormat] = &[
    TimestampFormat {
        name: "offset-millis",
        parse: parse_offset_millis,
    },
    TimestampFormat {
        name: "offset",
        parse: parse_offset,
    },
    TimestampFormat {
        name: "zulu-millis",
        parse: parse_zulu_millis,
    },
    TimestampFormat {
        name: "zulu",
        parse: parse_zulu,
    },
    TimestampFormat {
        name: "date",
        parse: parse_date,
    },
];

pub fn to_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match first_match(TIMESTAMP_FORMATS, raw) {
        Some((_, instant)) => Some(instant),
        None => {
            tracing::warn!(stage = "coerce.timestamp", value = %raw, "no known date-time format matched");
            None
        }
    }
}

/// Try `formats` in order and report which one matched.
pub fn first_match(
    formats: &[TimestampFormat],
    raw: &str,
) -> Option<(&'static str, DateTime<Utc>)> {
    formats
        .iter()
        .find_map(|format| (format.parse)(raw).map(|instant| (format.name, instant)))
}

fn with_offset(raw: &str, pattern: &str) -> Option<DateTime<Utc>> {
    DateTime::<FixedOffset>::parse_from_str(raw, pattern)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn zulu(raw: &str, pattern: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, pattern)
        .ok()
        .map(|naive| naive.and_utc())
}

fn has_fraction(raw: &str) -> bool {
    raw.find('T').is_some_and(|t| raw[t..].contains('.'))
}

fn is_zulu(raw: &str) -> bool {
    raw.ends_with(['Z', 'z'])
}

fn parse_offset_millis(raw: &str) -> Option<DateTime<Utc>> {
    if !has_fraction(raw) || is_zulu(raw) {
        return None;
    }
    with_offset(raw, "%Y-%m-%dT%H:%M:%S%.f%:z")
}

fn parse_offset(raw: &str) -> Option<DateTime<Utc>> {
    if has_fraction(raw) || is_zulu(raw) {
        return None;
    }
    with_offset(raw, "%Y-%m-%dT%H:%M:%S%:z")
}

fn parse_zulu_millis(raw: &str) -> Option<DateTime<Utc>> {
    if !has_fraction(raw) {
        return None;
    }
    zulu(raw, "%Y-%m-%dT%H:%M:%S%.fZ")
}

fn parse_zulu(raw: &str) -> Option<DateTime<Utc>> {
    if has_fraction(raw) {
        return None;
    }
    zulu(raw, "%Y-%m-%dT%H:%M:%SZ")
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
