//! Range and text validators
//!
//! An out-of-range value is not an error: it is logged at trace level and
//! the field becomes `None`.

use std::fmt::Display;
use std::ops::RangeInclusive;

pub const PRICE_RANGE: RangeInclusive<i64> = 0..=10_000_000;
pub const MIN_YEAR: i32 = 1900;
/// Registrations may be announced up to this many years ahead
pub const MAX_YEARS_AHEAD: i32 = 2;
pub const MONTH_RANGE: RangeInclusive<i64> = 1..=12;
pub const MILEAGE_RANGE: RangeInclusive<i64> = 0..=2_000_000;
pub const POWER_KW_RANGE: RangeInclusive<i64> = 10..=2000;
pub const DOORS_RANGE: RangeInclusive<i64> = 2..=8;
pub const SEATS_RANGE: RangeInclusive<i64> = 1..=15;

/// Default cap for free-text fields
pub const MAX_TEXT_LEN: usize = 255;
/// Cap for category and condition labels
pub const MAX_LABEL_LEN: usize = 50;

fn checked<T: TryFrom<i64>>(field: &str, value: i64, range: RangeInclusive<i64>) -> Option<T> {
    if range.contains(&value) {
        T::try_from(value).ok()
    } else {
        log_out_of_range(field, value, &range);
        None
    }
}

fn log_out_of_range(field: &str, value: impl Display, range: &RangeInclusive<i64>) {
    tracing::trace!(
        "{} {} outside {}..={}, dropping",
        field,
        value,
        range.start(),
        range.end()
    );
}

pub fn price(value: i64) -> Option<u32> {
    checked("price", value, PRICE_RANGE)
}

/// Validates a registration year against the reference year
pub fn year(value: i32, reference_year: i32) -> Option<i32> {
    let range = i64::from(MIN_YEAR)..=i64::from(reference_year + MAX_YEARS_AHEAD);
    checked("year", i64::from(value), range)
}

pub fn month(value: i64) -> Option<u8> {
    checked("month", value, MONTH_RANGE)
}

pub fn mileage(value: i64) -> Option<u32> {
    checked("mileage", value, MILEAGE_RANGE)
}

pub fn power_kw(value: i64) -> Option<u32> {
    checked("power", value, POWER_KW_RANGE)
}

pub fn doors(value: i64) -> Option<u8> {
    checked("doors", value, DOORS_RANGE)
}

pub fn seats(value: i64) -> Option<u8> {
    checked("seats", value, SEATS_RANGE)
}

/// Cleans a free-text field
///
/// Strips `<` and `>`, collapses whitespace, trims and truncates to
/// `max_chars` characters. Empty results become `None`. Applying it twice
/// gives the same result as applying it once.
pub fn clean_text(text: &str, max_chars: usize) -> Option<String> {
    let stripped = text.replace(['<', '>'], " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_chars).collect();
    let cleaned = truncated.trim_end();

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
