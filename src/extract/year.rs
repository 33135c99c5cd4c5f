//! Model-year range extraction.
//!
//! Runs over the raw line: the Hebrew markers (`מ` "from", `עד` "to")
//! attach directly to the digits and survive normalization anyway, and the
//! raw form is what feedback audits quote.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::expand_two_digit_year;

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"מ(\d{2,4})(?:\s*-\s*|\s*עד\s*)(\d{2,4})").expect("year range regex"));
static FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r"מ(\d{2})").expect("year from regex"));
static TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"עד\s*(\d{2})").expect("year to regex"));

/// Extract `(year_from, year_to)` from a part description.
///
/// An explicit from-to range wins; otherwise lone "from" and "to" markers
/// are recognized independently. Two-digit years expand with the <50 →
/// 2000s rule. Years outside [1950, current year + 5] are dropped. A lone
/// "to" year synthesizes `year_to - 15` as the from-year, and a reversed
/// pair is swapped.
#[must_use]
pub fn extract(raw: &str, current_year: i32) -> (Option<i32>, Option<i32>) {
    let mut year_from = None;
    let mut year_to = None;

    if let Some(caps) = RANGE.captures(raw) {
        year_from = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .map(expand_two_digit_year);
        year_to = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .map(expand_two_digit_year);
    } else {
        if let Some(caps) = FROM.captures(raw) {
            year_from = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .map(expand_two_digit_year);
        }
        if let Some(caps) = TO.captures(raw) {
            year_to = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .map(expand_two_digit_year);
        }
    }

    let plausible = |y: i32| (1950..=current_year + 5).contains(&y);
    year_from = year_from.filter(|&y| plausible(y));
    year_to = year_to.filter(|&y| plausible(y));

    if year_from.is_none() {
        if let Some(to) = year_to {
            year_from = Some(to - 15);
        }
    }

    if let (Some(from), Some(to)) = (year_from, year_to) {
        if from > to {
            return (Some(to), Some(from));
        }
    }

    (year_from, year_to)
}
