//! Cell cleaning and type coercion.
//!
//! Every scraped cell goes through [`clean_token`] before parsing. Dates use
//! the report's compact `Mon-YY` form; counts are integers with thousands
//! separators. An unparseable count becomes `None` so a single bad cell
//! doesn't sink the whole month.

use chrono::{Month, NaiveDate};
use ev_sales_models::{Category, RawTableRow, WideRecord};

use crate::TransformError;

/// Two-digit years below this map to 20xx; the rest map to 19xx.
///
/// `00..=68` → `2000..=2068`, `69..=99` → `1969..=1999`.
pub const CENTURY_PIVOT: u32 = 69;

/// Trims `value`, then removes every space and comma.
///
/// Idempotent: cleaning a cleaned token returns it unchanged.
#[must_use]
pub fn clean_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != ',')
        .collect()
}

/// Expands a two-digit year using [`CENTURY_PIVOT`].
#[must_use]
pub const fn expand_two_digit_year(yy: u32) -> i32 {
    #[allow(clippy::cast_possible_wrap)] // yy < 100
    let yy = yy as i32;
    if yy < CENTURY_PIVOT as i32 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Parses a `Mon-YY` token (e.g. `"Dec-10"`) into the first day of that
/// month.
///
/// The month is a three-letter English abbreviation, matched
/// case-insensitively. Returns `None` for anything else.
#[must_use]
pub fn parse_month_token(token: &str) -> Option<NaiveDate> {
    let (month, year) = token.trim().split_once('-')?;
    if month.len() != 3 || year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let month: Month = month.parse().ok()?;
    let yy: u32 = year.parse().ok()?;

    NaiveDate::from_ymd_opt(expand_two_digit_year(yy), month.number_from_month(), 1)
}

/// Parses a cleaned count. Returns `None` if the text is not a
/// non-negative integer.
#[must_use]
pub fn coerce_count(value: &str) -> Option<i64> {
    clean_token(value)
        .parse::<i64>()
        .ok()
        .filter(|count| *count >= 0)
}

/// Normalizes raw table rows into wide records.
///
/// # Errors
///
/// Returns [`TransformError::InvalidDate`] if a row's date cell is not a
/// `Mon-YY` token. Counts that fail to parse are recorded as `None`.
pub fn normalize_rows(rows: &[RawTableRow]) -> Result<Vec<WideRecord>, TransformError> {
    let mut missing = 0usize;

    let records = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let token = clean_token(&row.date);
            let date = parse_month_token(&token).ok_or_else(|| TransformError::InvalidDate {
                row: idx,
                value: row.date.clone(),
            })?;

            let mut record = WideRecord::empty(date);
            for category in Category::ALL {
                let value = coerce_count(row.category(category));
                if value.is_none() {
                    missing += 1;
                    log::warn!(
                        "Row {idx} ({token}): {category} value {:?} is not an integer",
                        row.category(category)
                    );
                }
                record.set(category, value);
            }
            Ok(record)
        })
        .collect::<Result<Vec<_>, TransformError>>()?;

    if missing > 0 {
        log::warn!("{missing} value(s) could not be coerced and were left empty");
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::Datelike as _;

    use super::*;

    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    #[test]
    fn cleans_whitespace_and_separators() {
        assert_eq!(clean_token(" 12,345 "), "12345");
        assert_eq!(clean_token("1, 012, 000"), "1012000");
        assert_eq!(clean_token("\tJan-23\n"), "Jan-23");
    }

    #[test]
    fn cleaning_is_idempotent() {
        for input in [" 12,345 ", "a b,c", "", "  ", "1,,2", "Dec-10", " x , y "] {
            let once = clean_token(input);
            assert_eq!(clean_token(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn coerces_cleaned_counts() {
        assert_eq!(coerce_count(" 12,345 "), Some(12_345));
        assert_eq!(coerce_count("0"), Some(0));
        assert_eq!(coerce_count("n/a"), None);
        assert_eq!(coerce_count(""), None);
        assert_eq!(coerce_count("1.5"), None);
    }

    #[test]
    fn negative_counts_are_missing() {
        assert_eq!(coerce_count("-5"), None);
        assert_eq!(coerce_count("-1,200"), None);
        assert_eq!(coerce_count("+5"), Some(5));
    }

    #[test]
    fn parses_month_tokens_to_first_of_month() {
        assert_eq!(
            parse_month_token("Dec-10"),
            NaiveDate::from_ymd_opt(2010, 12, 1)
        );
        assert_eq!(
            parse_month_token("jan-23"),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
    }

    #[test]
    fn every_month_and_year_lands_on_day_one() {
        for (i, month) in MONTHS.iter().enumerate() {
            for yy in 0..100u32 {
                let token = format!("{month}-{yy:02}");
                let date = parse_month_token(&token).unwrap();
                assert_eq!(date.day(), 1, "{token}");
                assert_eq!(date.month() as usize, i + 1, "{token}");
                assert_eq!(date.format("%b-%y").to_string(), token, "{token}");
            }
        }
    }

    #[test]
    fn century_pivot_is_pinned() {
        assert_eq!(expand_two_digit_year(0), 2000);
        assert_eq!(expand_two_digit_year(68), 2068);
        assert_eq!(expand_two_digit_year(69), 1969);
        assert_eq!(expand_two_digit_year(99), 1999);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "Dec", "Dec-2010", "December-10", "Foo-10", "12-10", "Dec-1a"] {
            assert_eq!(parse_month_token(token), None, "{token}");
        }
    }

    #[test]
    fn normalizes_rows_and_tolerates_bad_counts() {
        let rows = vec![
            RawTableRow::from_cells(&["Jan-23", "1,234", "56", "7", "1,297"]).unwrap(),
            RawTableRow::from_cells(&["Feb-23", "—", " 60 ", "8", "n/a"]).unwrap(),
        ];

        let records = normalize_rows(&rows).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(records[0].bev, Some(1234));
        assert_eq!(records[0].total_ldv, Some(1297));
        assert_eq!(records[1].bev, None);
        assert_eq!(records[1].phev, Some(60));
        assert_eq!(records[1].total_ldv, None);
    }

    #[test]
    fn bad_date_is_an_error() {
        let rows = vec![RawTableRow::from_cells(&["Total", "1", "2", "3", "6"]).unwrap()];
        let err = normalize_rows(&rows).unwrap_err();
        assert!(matches!(err, TransformError::InvalidDate { row: 0, .. }));
    }
}
