//! Field sub-parsers for listing text
//!
//! Each parser applies one dedicated pattern and returns `None` when the text
//! does not match. None of them range-check their result; that is the
//! normalizer's job.

use regex::Regex;
use std::sync::LazyLock;

/// A grouped number: "24.990", "1 234 567", "12'500" or plain "24990"
const GROUPED: &str = r"\d{1,3}(?:[.,'\s]\d{3})+|\d+";

static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let amount = format!(r"(?:{GROUPED})(?:[.,]\d{{1,2}})?");
    Regex::new(&format!(
        r"(?i)(?:(?:€|eur)\s*({amount})|({amount})\s*(?:€|eur\b|,-))"
    ))
    .expect("hardcoded regex pattern is valid")
});

static BARE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*((?:{GROUPED})(?:[.,]\d{{1,2}})?)\s*$"))
        .expect("hardcoded regex pattern is valid")
});

static MILEAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({GROUPED})\s*km\b(/h)?")).expect("hardcoded regex pattern is valid")
});

static REGISTRATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(0?[1-9]|1[0-2])\s*/\s*((?:19|20)\d{2})\b")
        .expect("hardcoded regex pattern is valid")
});

static REGISTRATION_YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bEZ|Erstzulassung|first registration|Baujahr|\byear)\s*:?\s*((?:19|20)\d{2})\b")
        .expect("hardcoded regex pattern is valid")
});

static POWER_KW_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2,4})\s*kW\b").expect("hardcoded regex pattern is valid")
});

static POWER_PS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2,4})\s*(?:PS|hp|bhp)\b").expect("hardcoded regex pattern is valid")
});

static DOORS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d)(?:\s*/\s*(\d))?\s*-?\s*(?:Türen|Tür|doors?)\b")
        .expect("hardcoded regex pattern is valid")
});

static SEATS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s*(?:Sitzplätze|Sitze|seats?)\b")
        .expect("hardcoded regex pattern is valid")
});

/// PS (metric horsepower) to kW
const KW_PER_PS: f64 = 0.735_498_75;

/// First registration as printed on a listing ("03/2019" or "EZ 2019")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub year: i32,
    pub month: Option<u8>,
}

/// Parses a displayed price into a rounded amount
///
/// Accepts a currency marker before or after the amount ("24.990 €",
/// "€ 15,500", "EUR 9.999,50", "12.500,-") or a bare number.
///
/// # Examples
///
/// ```
/// use auto_alert::extract::parse_price;
///
/// assert_eq!(parse_price("24.990 €"), Some(24990));
/// assert_eq!(parse_price("Preis auf Anfrage"), None);
/// ```
pub fn parse_price(text: &str) -> Option<i64> {
    let amount = PRICE_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .or_else(|| BARE_NUMBER_REGEX.captures(text).and_then(|caps| caps.get(1)))?;

    parse_amount(amount.as_str()).map(|value| value.round() as i64)
}

/// Parses a mileage such as "45.000 km" (speeds like "250 km/h" are skipped)
pub fn parse_mileage(text: &str) -> Option<i64> {
    MILEAGE_REGEX
        .captures_iter(text)
        .find(|caps| caps.get(2).is_none())
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_amount(m.as_str()))
        .map(|value| value as i64)
}

/// Parses the first registration date
///
/// Prefers "MM/YYYY"; falls back to a labelled year ("EZ 2019").
pub fn parse_registration(text: &str) -> Option<Registration> {
    if let Some(caps) = REGISTRATION_REGEX.captures(text) {
        let month = caps.get(1)?.as_str().parse::<u8>().ok()?;
        let year = caps.get(2)?.as_str().parse::<i32>().ok()?;
        return Some(Registration {
            year,
            month: Some(month),
        });
    }

    let caps = REGISTRATION_YEAR_REGEX.captures(text)?;
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    Some(Registration { year, month: None })
}

/// Parses engine power in kW, converting from PS/hp when only that is given
pub fn parse_power_kw(text: &str) -> Option<i64> {
    if let Some(caps) = POWER_KW_REGEX.captures(text) {
        return caps.get(1)?.as_str().parse::<i64>().ok();
    }

    let caps = POWER_PS_REGEX.captures(text)?;
    let ps = caps.get(1)?.as_str().parse::<f64>().ok()?;
    Some((ps * KW_PER_PS).round() as i64)
}

/// Parses a door count; "4/5 Türen" yields the larger figure
pub fn parse_doors(text: &str) -> Option<i64> {
    let caps = DOORS_REGEX.captures(text)?;
    let first = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let second = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
    Some(second.map_or(first, |second| second.max(first)))
}

/// Parses a seat count ("5 Sitze", "7 seats")
pub fn parse_seats(text: &str) -> Option<i64> {
    let caps = SEATS_REGEX.captures(text)?;
    caps.get(1)?.as_str().parse::<i64>().ok()
}

/// Interprets grouping and decimal separators
///
/// A trailing "." or "," followed by one or two digits is a decimal
/// separator; every other separator groups thousands.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();

    let (integer, fraction) = match cleaned.rfind(|c| c == '.' || c == ',') {
        Some(pos) if (1..=2).contains(&(cleaned.len() - pos - 1)) => {
            (&cleaned[..pos], Some(&cleaned[pos + 1..]))
        }
        _ => (cleaned.as_str(), None),
    };

    let digits: String = integer.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let mut value = digits.parse::<f64>().ok()?;
    if let Some(fraction) = fraction {
        let scale = 10f64.powi(fraction.len() as i32);
        value += fraction.parse::<f64>().ok()? / scale;
    }

    Some(value)
}
