//! Integration tests for date resolution.

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskpoet::calendar::{Calendar, Synonym};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 15, 4, 5).unwrap()
}

mod calendar_tests {
    use super::*;

    #[test]
    fn monday_from_tuesday_is_six_days_out() {
        // 2024-06-04 is a Tuesday
        let cal = Calendar::with_present(at(2024, 6, 4));
        let monday = cal.synonym("monday").unwrap();
        assert_eq!(monday, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn monday_from_monday_is_a_week_out() {
        let cal = Calendar::with_present(at(2024, 6, 3));
        let monday = cal.synonym("mon").unwrap();
        assert_eq!(monday, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn date_prefers_synonyms_then_durations() {
        let cal = Calendar::with_present(at(2024, 6, 4));
        assert_eq!(cal.date("tomorrow").unwrap(), Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap());
        assert_eq!(cal.date("3d").unwrap(), at(2024, 6, 7));
        assert_eq!(cal.date("2h30m").unwrap(), at(2024, 6, 4) + Duration::minutes(150));
        assert!(cal.date("someday maybe").is_err());
    }

    #[test]
    fn every_synonym_resolves() {
        let cal = Calendar::with_present(at(2024, 1, 31));
        for syn in Synonym::all() {
            let resolved = cal.resolve(syn);
            assert!(resolved.is_ok(), "{syn} failed to resolve");
        }
    }
}
