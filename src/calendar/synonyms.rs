//! Named relative dates ("eom", "monday", "15th", ...) and their aliases.

use chrono::{Month, Weekday};
use std::fmt;
use std::str::FromStr;

const MONTH_DESC: &str = "Date for the specified month, starting at the beginning of the 1st day";
const DAY_DESC: &str = "Date for the specified day, after today, starting at the beginning of the day";
const NTH_DESC: &str = "Next date with this day of the month, after today, starting at the beginning of the day";

const WEEKDAYS: [(Weekday, &str, &str); 7] = [
    (Weekday::Mon, "monday", "mon"),
    (Weekday::Tue, "tuesday", "tue"),
    (Weekday::Wed, "wednesday", "wed"),
    (Weekday::Thu, "thursday", "thu"),
    (Weekday::Fri, "friday", "fri"),
    (Weekday::Sat, "saturday", "sat"),
    (Weekday::Sun, "sunday", "sun"),
];

const MONTHS: [(Month, &str, &str); 12] = [
    (Month::January, "january", "jan"),
    (Month::February, "february", "feb"),
    (Month::March, "march", "mar"),
    (Month::April, "april", "apr"),
    (Month::May, "may", "may"),
    (Month::June, "june", "jun"),
    (Month::July, "july", "jul"),
    (Month::August, "august", "aug"),
    (Month::September, "september", "sep"),
    (Month::October, "october", "oct"),
    (Month::November, "november", "nov"),
    (Month::December, "december", "dec"),
];

/// A relative time period, resolved by [`Calendar`](super::Calendar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Synonym {
    Now,
    Today,
    Yesterday,
    Tomorrow,
    StartOfDay,
    EndOfDay,
    /// Start of next year.
    StartOfYear,
    /// End of this year.
    EndOfYear,
    /// Start of next month.
    Som,
    /// Start of the current month.
    Socm,
    Eom,
    Eocm,
    /// Start of next week (Sunday).
    Sow,
    /// Start of the current week (Sunday).
    Socw,
    Eow,
    Eocw,
    /// Start of the work week (Monday).
    Soww,
    /// End of the work week (Friday).
    Eoww,
    Later,
    Weekday(Weekday),
    Month(Month),
    /// N'th day of the month, 1..=31.
    Nth(u32),
}

const SIMPLE: [(Synonym, &str); 19] = [
    (Synonym::Now, "now"),
    (Synonym::Today, "today"),
    (Synonym::Yesterday, "yesterday"),
    (Synonym::Tomorrow, "tomorrow"),
    (Synonym::StartOfDay, "startofday"),
    (Synonym::EndOfDay, "endofday"),
    (Synonym::StartOfYear, "startofyear"),
    (Synonym::EndOfYear, "endofyear"),
    (Synonym::Som, "som"),
    (Synonym::Socm, "socm"),
    (Synonym::Eom, "eom"),
    (Synonym::Eocm, "eocm"),
    (Synonym::Sow, "sow"),
    (Synonym::Socw, "socw"),
    (Synonym::Eow, "eow"),
    (Synonym::Eocw, "eocw"),
    (Synonym::Soww, "soww"),
    (Synonym::Eoww, "eoww"),
    (Synonym::Later, "later"),
];

fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

impl Synonym {
    /// Every synonym, in a stable order.
    pub fn all() -> Vec<Synonym> {
        let mut out: Vec<Synonym> = SIMPLE.iter().map(|(s, _)| *s).collect();
        out.extend(WEEKDAYS.iter().map(|(w, _, _)| Synonym::Weekday(*w)));
        out.extend(MONTHS.iter().map(|(m, _, _)| Synonym::Month(*m)));
        out.extend((1..=31).map(Synonym::Nth));
        out
    }

    /// Canonical name.
    pub fn name(&self) -> String {
        match self {
            Synonym::Weekday(w) => WEEKDAYS
                .iter()
                .find(|(day, _, _)| day == w)
                .map_or_else(String::new, |(_, name, _)| name.to_string()),
            Synonym::Month(m) => MONTHS
                .iter()
                .find(|(month, _, _)| month == m)
                .map_or_else(String::new, |(_, name, _)| name.to_string()),
            Synonym::Nth(n) => format!("{n}{}", ordinal_suffix(*n)),
            simple => SIMPLE
                .iter()
                .find(|(s, _)| s == simple)
                .map_or_else(String::new, |(_, name)| name.to_string()),
        }
    }

    /// Short forms accepted in place of the canonical name.
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Synonym::Weekday(w) => WEEKDAYS
                .iter()
                .filter(|(day, _, _)| day == w)
                .map(|(_, _, alias)| *alias)
                .collect(),
            // "may" is its own abbreviation.
            Synonym::Month(Month::May) => Vec::new(),
            Synonym::Month(m) => MONTHS
                .iter()
                .filter(|(month, _, _)| month == m)
                .map(|(_, _, alias)| *alias)
                .collect(),
            Synonym::Later => vec!["someday"],
            Synonym::EndOfDay => vec!["eod"],
            Synonym::StartOfDay => vec!["sod"],
            Synonym::StartOfYear => vec!["soy"],
            Synonym::EndOfYear => vec!["eoy"],
            _ => Vec::new(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Synonym::Now => "Exactly now",
            Synonym::Today => "Start of the day, today",
            Synonym::Yesterday => "Start of the day, yesterday",
            Synonym::Tomorrow => "Start of the day, tomorrow",
            Synonym::StartOfDay => "Start of the day, today",
            Synonym::EndOfDay => "End of the day, today",
            Synonym::StartOfYear => "Start of next year, beginning of the day",
            Synonym::EndOfYear => "End of this year, end of the day",
            Synonym::Som => "Start of next month, beginning of the day",
            Synonym::Socm => "Start of the current month, beginning of the day",
            Synonym::Eom | Synonym::Eocm => "Last day of the current month, end of the day",
            Synonym::Sow => "Start of next week (Sunday), beginning of the day",
            Synonym::Socw => "Start of the current week (Sunday), beginning of the day",
            Synonym::Eow | Synonym::Eocw => "End of the week (Saturday), end of the day",
            Synonym::Soww => "Start of the work week (Monday), beginning of the day",
            Synonym::Eoww => "End of the work week (Friday), end of the day",
            Synonym::Later => "Super far away date",
            Synonym::Weekday(_) => DAY_DESC,
            Synonym::Month(_) => MONTH_DESC,
            Synonym::Nth(_) => NTH_DESC,
        }
    }
}

impl fmt::Display for Synonym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn parse_nth(s: &str) -> Option<u32> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let n: u32 = s[..digits].parse().ok()?;
    if !(1..=31).contains(&n) || &s[digits..] != ordinal_suffix(n) || s.starts_with('0') {
        return None;
    }
    Some(n)
}

impl FromStr for Synonym {
    type Err = String;

    /// Exact match on a canonical name or alias, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some((syn, _)) = SIMPLE.iter().find(|(_, name)| *name == s) {
            return Ok(*syn);
        }
        if let Some((w, _, _)) = WEEKDAYS
            .iter()
            .find(|(_, name, alias)| *name == s || *alias == s)
        {
            return Ok(Synonym::Weekday(*w));
        }
        if let Some((m, _, _)) = MONTHS
            .iter()
            .find(|(_, name, alias)| *name == s || *alias == s)
        {
            return Ok(Synonym::Month(*m));
        }
        match s.as_str() {
            "someday" => return Ok(Synonym::Later),
            "eod" => return Ok(Synonym::EndOfDay),
            "sod" => return Ok(Synonym::StartOfDay),
            "soy" => return Ok(Synonym::StartOfYear),
            "eoy" => return Ok(Synonym::EndOfYear),
            _ => {}
        }
        parse_nth(&s)
            .map(Synonym::Nth)
            .ok_or_else(|| format!("unknown synonym: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_and_descriptions() {
        assert_eq!(Synonym::Month(Month::January).aliases(), vec!["jan"]);
        assert_eq!(Synonym::Later.aliases(), vec!["someday"]);
        assert!(Synonym::Eom.aliases().is_empty());
        assert_eq!(Synonym::Month(Month::January).description(), MONTH_DESC);
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("jan".parse(), Ok(Synonym::Month(Month::January)));
        assert_eq!("February".parse(), Ok(Synonym::Month(Month::February)));
        assert_eq!("mon".parse(), Ok(Synonym::Weekday(Weekday::Mon)));
        assert_eq!("eod".parse(), Ok(Synonym::EndOfDay));
        assert_eq!("someday".parse(), Ok(Synonym::Later));
        assert_eq!("eom".parse(), Ok(Synonym::Eom));
        assert!("Some-Never-Existent-Thing".parse::<Synonym>().is_err());
    }

    #[test]
    fn parses_ordinals() {
        assert_eq!("1st".parse(), Ok(Synonym::Nth(1)));
        assert_eq!("2nd".parse(), Ok(Synonym::Nth(2)));
        assert_eq!("3rd".parse(), Ok(Synonym::Nth(3)));
        assert_eq!("11th".parse(), Ok(Synonym::Nth(11)));
        assert_eq!("22nd".parse(), Ok(Synonym::Nth(22)));
        assert_eq!("31st".parse(), Ok(Synonym::Nth(31)));
        assert!("2ns".parse::<Synonym>().is_err());
        assert!("32nd".parse::<Synonym>().is_err());
        assert!("1th".parse::<Synonym>().is_err());
        assert!("01st".parse::<Synonym>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for syn in Synonym::all() {
            assert_eq!(syn.name().parse::<Synonym>(), Ok(syn), "{syn}");
            for alias in syn.aliases() {
                assert_eq!(alias.parse::<Synonym>(), Ok(syn), "{alias}");
            }
        }
    }
}
