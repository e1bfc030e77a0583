//! Extraction layer
//!
//! - [`Extractor`]: selector-driven parsing of result pages into
//!   [`RawListing`]s and the total page count
//! - [`fields`]: dedicated sub-parsers for price, mileage, registration,
//!   power, doors and seats

pub mod fields;
mod parser;
mod selectors;

pub use crate::model::RawListing;
pub use fields::{
    parse_doors, parse_mileage, parse_power_kw, parse_price, parse_registration, parse_seats,
    Registration,
};
pub use parser::{ExtractedPage, ExtractionItemError, Extractor};
pub use selectors::SelectorSet;
