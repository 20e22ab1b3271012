//! Folder-name parsing for the two naming conventions.
//!
//! Source folders are named freely with a trailing `Month Day, Year`
//! (`"Crescent Park - Surrey, BC, September 10, 2022"`), destination folders
//! start with an ISO date optionally followed by `_description`
//! (`"2022-09-10_CrescentPark-SurreyBC"`). Both parsers are total: a name that
//! does not follow the convention, or names an impossible date, yields `None`.

use backupcheck_common::ParsedFolderName;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Trailing `Month Day, Year`. Full month names come before their
/// abbreviations (and `sept` before `sep`) so the longest spelling wins.
static SOURCE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\s+([0-9]{1,2}),\s*([0-9]{4})\s*$",
    )
    .unwrap()
});

const DESTINATION_DATE_LEN: usize = 10;

/// Month number for a full or abbreviated English month name.
pub fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a source folder name of the form `[description, ]Month Day, Year`.
///
/// The date is matched at the end of the name, so descriptions may contain
/// commas of their own. Trailing commas, dashes and whitespace are stripped
/// from the description; an empty description is `None`.
pub fn parse_source_folder_name(name: &str) -> Option<ParsedFolderName> {
    let captures = SOURCE_DATE.captures(name)?;

    let month = month_from_name(captures.get(1)?.as_str())?;
    let day: u32 = captures.get(2)?.as_str().parse().ok()?;
    let year: i32 = captures.get(3)?.as_str().parse().ok()?;

    if !(1..=31).contains(&day) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let start = captures.get(0)?.start();
    let description = name[..start]
        .trim_end_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .trim_start();

    Some(ParsedFolderName {
        date,
        description: non_empty(description),
    })
}

/// Parse a destination folder name of the form `YYYY-MM-DD[_description]`.
pub fn parse_destination_folder_name(name: &str) -> Option<ParsedFolderName> {
    let prefix = name.get(..DESTINATION_DATE_LEN)?;
    let well_formed = prefix.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !well_formed {
        return None;
    }

    let year: i32 = prefix[0..4].parse().ok()?;
    let month: u32 = prefix[5..7].parse().ok()?;
    let day: u32 = prefix[8..10].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let rest = &name[DESTINATION_DATE_LEN..];
    let description = if rest.is_empty() {
        None
    } else {
        non_empty(rest.strip_prefix('_')?.trim())
    };

    Some(ParsedFolderName { date, description })
}

/// Render a date the way destination folder names start.
pub fn format_destination_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_source_without_description() {
        let parsed = parse_source_folder_name("September 10, 2022").unwrap();
        assert_eq!(parsed.date, ymd(2022, 9, 10));
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_source_description_with_commas() {
        let parsed =
            parse_source_folder_name("Crescent Park - Surrey, BC, September 10, 2022").unwrap();
        assert_eq!(parsed.date, ymd(2022, 9, 10));
        assert_eq!(parsed.description.as_deref(), Some("Crescent Park - Surrey, BC"));

        let parsed = parse_source_folder_name("Family, Vacation, Photos, August 15, 2023").unwrap();
        assert_eq!(parsed.description.as_deref(), Some("Family, Vacation, Photos"));
    }

    #[test]
    fn test_source_description_trailing_separators() {
        let parsed = parse_source_folder_name("My Photos  ,  September 10, 2022").unwrap();
        assert_eq!(parsed.description.as_deref(), Some("My Photos"));

        let parsed = parse_source_folder_name("Beach Trip - July 4, 2023").unwrap();
        assert_eq!(parsed.description.as_deref(), Some("Beach Trip"));
    }

    #[test]
    fn test_source_all_month_spellings() {
        let names = [
            ("January", 1), ("February", 2), ("March", 3), ("April", 4),
            ("May", 5), ("June", 6), ("July", 7), ("August", 8),
            ("September", 9), ("October", 10), ("November", 11), ("December", 12),
            ("Jan", 1), ("Feb", 2), ("Mar", 3), ("Apr", 4), ("Jun", 6), ("Jul", 7),
            ("Aug", 8), ("Sep", 9), ("Sept", 9), ("Oct", 10), ("Nov", 11), ("Dec", 12),
        ];
        for (month, number) in names {
            let parsed = parse_source_folder_name(&format!("{month} 15, 2023"))
                .unwrap_or_else(|| panic!("failed to parse {month}"));
            assert_eq!(parsed.date, ymd(2023, number, 15), "month {month}");
        }
    }

    #[test]
    fn test_source_case_insensitive() {
        for name in ["september 10, 2022", "SEPTEMBER 10, 2022", "SePtEmBeR 10, 2022", "SEPT 10, 2022"] {
            assert_eq!(parse_source_folder_name(name).unwrap().date, ymd(2022, 9, 10), "{name}");
        }
    }

    #[test]
    fn test_source_single_digit_day_and_spacing() {
        assert_eq!(parse_source_folder_name("September 5, 2022").unwrap().date, ymd(2022, 9, 5));
        assert_eq!(parse_source_folder_name("September 5,2022").unwrap().date, ymd(2022, 9, 5));
        assert_eq!(parse_source_folder_name("September 5, 2022 ").unwrap().date, ymd(2022, 9, 5));
    }

    #[test]
    fn test_source_rejects_invalid_dates() {
        for name in [
            "February 30, 2022",
            "February 29, 2023",
            "April 31, 2022",
            "January 32, 2022",
            "January 0, 2022",
        ] {
            assert!(parse_source_folder_name(name).is_none(), "{name}");
        }
        assert_eq!(parse_source_folder_name("February 29, 2024").unwrap().date, ymd(2024, 2, 29));
    }

    #[test]
    fn test_source_rejects_non_matching_names() {
        for name in [
            "",
            "Invalid folder name",
            "2022-09-10",
            "September 2022",
            "Smarch 10, 2022",
            "Mayday 10, 2022",
            "September 10, 22",
            "September 10, 2022 extra",
        ] {
            assert!(parse_source_folder_name(name).is_none(), "{name:?}");
        }
    }

    #[test]
    fn test_source_month_needs_word_boundary() {
        let parsed = parse_source_folder_name("Summer, Dec 1, 2021").unwrap();
        assert_eq!(parsed.date, ymd(2021, 12, 1));
        assert_eq!(parsed.description.as_deref(), Some("Summer"));
        assert!(parse_source_folder_name("XDec 1, 2021").is_none());
    }

    #[test]
    fn test_destination_with_and_without_description() {
        let parsed = parse_destination_folder_name("2022-09-10_CrescentPark-SurreyBC").unwrap();
        assert_eq!(parsed.date, ymd(2022, 9, 10));
        assert_eq!(parsed.description.as_deref(), Some("CrescentPark-SurreyBC"));

        let parsed = parse_destination_folder_name("2022-09-10").unwrap();
        assert_eq!(parsed.date, ymd(2022, 9, 10));
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_destination_description_verbatim_after_first_underscore() {
        let parsed = parse_destination_folder_name("2023-08-15_Family_Vacation_Photos").unwrap();
        assert_eq!(parsed.description.as_deref(), Some("Family_Vacation_Photos"));

        let parsed = parse_destination_folder_name("2023-09-10_My Photo Collection").unwrap();
        assert_eq!(parsed.description.as_deref(), Some("My Photo Collection"));

        let parsed = parse_destination_folder_name("2023-09-10_").unwrap();
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_destination_rejects_malformed() {
        for name in [
            "",
            "2022-9-10",
            "2022/09/10",
            "22-09-10",
            "2022-09-10-Description",
            "2022-09-10 Description",
            "September 10, 2022",
            "2022-13-01",
            "2022-00-10",
            "2022-02-30",
            "2023-02-29",
            "２０２２-09-10",
        ] {
            assert!(parse_destination_folder_name(name).is_none(), "{name:?}");
        }
        assert_eq!(parse_destination_folder_name("2024-02-29").unwrap().date, ymd(2024, 2, 29));
    }

    #[test]
    fn test_source_dates_round_trip_through_destination_format() {
        let months = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        let mut date = ymd(2024, 1, 1);
        while date.year() == 2024 {
            let name = format!("Trip, {} {}, {}", months[date.month0() as usize], date.day(), date.year());
            let source = parse_source_folder_name(&name).unwrap();
            let formatted = format_destination_date(source.date);
            let destination = parse_destination_folder_name(&formatted).unwrap();
            assert_eq!(destination.date, source.date, "{name}");
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_month_from_name() {
        assert_eq!(month_from_name("SePt"), Some(9));
        assert_eq!(month_from_name("May"), Some(5));
        assert_eq!(month_from_name("Ma"), None);
    }
}
