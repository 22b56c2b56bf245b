//! Duration strings in the TaskWarrior style, with a Go-style fallback.
//!
//! `"3d"`, `"2 weeks"`, `"quarterly"` and a bare `"month"` go through the unit
//! table. Anything else (`"2h30m"`, `"-2h"`, `".5h"`, `"2ns"`) is handed to
//! [`parse_go_duration`].

use crate::error::{PoetError, PoetResult};
use chrono::TimeDelta;
use regex_lite::Regex;
use std::sync::LazyLock;

static ORDINAL_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ordinal>\d+)?\s?(?P<unit>[A-Za-z]+)$").expect("static regex compiles")
});

const SECOND: i64 = 1;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Seconds per unit word, or `None` if the word is not in the table.
fn unit_seconds(unit: &str) -> Option<i64> {
    let secs = match unit {
        "seconds" | "second" | "secs" | "sec" | "s" => SECOND,
        "minutes" | "minute" | "mins" | "min" => MINUTE,
        "hours" | "hour" | "hrs" | "hr" | "h" => HOUR,
        "days" | "day" | "d" | "daily" => DAY,
        "weeks" | "week" | "wks" | "wk" | "w" | "weekly" => 7 * DAY,
        "monthly" | "months" | "month" | "mnths" | "mths" | "mth" | "mo" | "m" => 30 * DAY,
        "quarterly" | "quarters" | "quarter" | "qrtrs" | "qrtr" | "qtr" | "q" => 91 * DAY,
        "semiannual" => 180 * DAY,
        "yearly" | "years" | "year" | "yrs" | "yr" | "y" => 8760 * HOUR,
        _ => return None,
    };
    Some(secs)
}

/// Parse a duration expression.
pub fn parse_duration(s: &str) -> PoetResult<TimeDelta> {
    let s = s.trim();
    if s.is_empty() {
        return Err(PoetError::invalid_expression(s));
    }

    if let Some(caps) = ORDINAL_UNIT.captures(s) {
        let unit = caps.name("unit").map_or("", |m| m.as_str());
        if let Some(secs) = unit_seconds(unit) {
            let ordinal = match caps.name("ordinal") {
                Some(m) => m
                    .as_str()
                    .parse::<i64>()
                    .map_err(|_| PoetError::invalid_expression(s))?,
                None => 1,
            };
            return ordinal
                .checked_mul(secs)
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| PoetError::invalid_expression(s));
        }
    }

    parse_go_duration(s).ok_or_else(|| PoetError::invalid_expression(s))
}

/// Nanoseconds per Go duration unit.
fn go_unit_nanos(unit: &str) -> Option<i128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}

/// Parse a signed sequence of decimal numbers with unit suffixes, such as
/// `"300ms"`, `"-1.5h"` or `"2h45m"`.
pub fn parse_go_duration(s: &str) -> Option<TimeDelta> {
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Some(TimeDelta::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map_or(rest.len(), |(idx, _)| idx);
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let unit_nanos = go_unit_nanos(unit)?;

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        total = total.checked_add(whole.checked_mul(unit_nanos)?)?;

        // Digits past 18 cannot change the result at nanosecond resolution.
        let frac_part = &frac_part[..frac_part.len().min(18)];
        if !frac_part.is_empty() {
            let frac: i128 = frac_part.parse().ok()?;
            let scale = 10i128.pow(frac_part.len() as u32);
            total = total.checked_add(frac * unit_nanos / scale)?;
        }
    }

    if negative {
        total = -total;
    }
    i64::try_from(total).ok().map(TimeDelta::nanoseconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_style_durations() {
        let cases = [
            ("0", 0),
            ("2h", 7200),
            ("-2h", -7200),
            (".5h", 1800),
            ("02h", 7200),
            ("24h", 86400),
            ("1d", 86400),
            ("2h30m", 9000),
        ];
        for (input, secs) in cases {
            let got = parse_duration(input).unwrap();
            assert_eq!(got.num_seconds(), secs, "{input}");
        }
    }

    #[test]
    fn rejects_invalid_durations() {
        for input in ["", "5", ".ah", ".s", "-.s", "3 fortnights"] {
            assert!(parse_duration(input).is_err(), "{input}");
        }
    }

    #[test]
    fn unit_table_words() {
        assert_eq!(parse_duration("quarterly").unwrap().num_days(), 91);
        assert_eq!(parse_duration("2 weeks").unwrap().num_days(), 14);
        assert_eq!(parse_duration("month").unwrap().num_days(), 30);
        assert_eq!(parse_duration("semiannual").unwrap().num_days(), 180);
        assert_eq!(parse_duration("1y").unwrap().num_hours(), 8760);
        assert_eq!(parse_duration("3days").unwrap().num_days(), 3);
    }

    #[test]
    fn falls_back_for_sub_second_units() {
        assert_eq!(parse_duration("2ns").unwrap().num_nanoseconds(), Some(2));
        assert_eq!(
            parse_duration("1.5ms").unwrap().num_microseconds(),
            Some(1500)
        );
    }
}
