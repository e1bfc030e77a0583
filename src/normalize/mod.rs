//! Normalization layer
//!
//! Turns a [`RawListing`] into a canonical [`Vehicle`]: numbers are parsed
//! and range-checked, strings cleaned, enumerated values mapped through the
//! synonym tables, make and model split from the title, and the identity
//! derived. Invalid values become `None`; normalization never fails.
//!
//! [`Normalizer::canonicalize`] applies the same rules to an existing
//! vehicle, and `canonicalize(normalize(raw)) == normalize(raw)`.

pub mod identity;
pub mod makes;
pub mod synonyms;
pub mod validators;

use crate::extract::{
    parse_doors, parse_mileage, parse_power_kw, parse_price, parse_registration, parse_seats,
};
use crate::model::{RawListing, Vehicle};
use crate::url::canonical_listing_url;
use chrono::{DateTime, Datelike, Utc};
use validators::{clean_text, MAX_TEXT_LEN};

/// Separators between items of a specification blob
const SPEC_SEPARATORS: &[char] = &['•', '·', ',', '|', ';', '\n'];

/// Converts raw listings into validated vehicles
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    reference: Option<DateTime<Utc>>,
}

impl Normalizer {
    /// Normalizer that validates against the current time
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer with a fixed "now", for first-seen stamps and the
    /// registration year bound
    pub fn with_reference(reference: DateTime<Utc>) -> Self {
        Self {
            reference: Some(reference),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference.unwrap_or_else(Utc::now)
    }

    /// Builds a vehicle from one raw listing
    pub fn normalize(&self, raw: &RawListing) -> Vehicle {
        let title = opt_text(raw.title.as_deref()).unwrap_or_default();
        let mut vehicle = Vehicle::new(String::new(), title, self.now());

        vehicle.url = raw.detail_link.as_deref().and_then(canonical_url);
        vehicle.source_id = opt_text(raw.source_id.as_deref());

        let parts = makes::split_title(&vehicle.title);
        vehicle.make = parts.make.map(str::to_string);
        vehicle.model = opt_text(parts.model.as_deref());
        vehicle.variant = opt_text(parts.variant.as_deref());

        let specs = raw.specs_text.as_deref().unwrap_or_default();
        vehicle.mileage = parse_mileage(specs).and_then(validators::mileage);
        vehicle.power_kw = parse_power_kw(specs).and_then(validators::power_kw);
        vehicle.doors = parse_doors(specs).and_then(validators::doors);
        vehicle.seats = parse_seats(specs).and_then(validators::seats);

        vehicle.fuel = scan(&[specs], synonyms::lookup_fuel);
        vehicle.gearbox = scan(&[specs], synonyms::lookup_gearbox);
        vehicle.category = scan(&[specs, &vehicle.title], synonyms::lookup_category);
        vehicle.condition = scan(&[specs], synonyms::lookup_condition);

        if let Some(seller) = raw.seller_text.as_deref() {
            vehicle.seller_type = scan(&[seller], synonyms::lookup_seller_type);
            vehicle.seller_name = seller
                .split(SPEC_SEPARATORS)
                .find_map(|part| clean_text(part, MAX_TEXT_LEN));
        }

        vehicle.features = raw
            .features
            .iter()
            .filter_map(|feature| clean_text(feature, MAX_TEXT_LEN))
            .collect();

        for image in &raw.images {
            if !vehicle.images.contains(image) {
                vehicle.images.push(image.clone());
            }
        }

        let price = raw.price_text.as_deref().and_then(parse_price);
        let registration = parse_registration(specs);
        self.finish(
            vehicle,
            price,
            registration.map(|r| r.year),
            registration.and_then(|r| r.month).map(i64::from),
        )
    }

    /// Re-applies every normalization rule to an existing vehicle
    pub fn canonicalize(&self, mut vehicle: Vehicle) -> Vehicle {
        vehicle.title = opt_text(Some(&vehicle.title)).unwrap_or_default();
        vehicle.url = vehicle.url.as_deref().and_then(canonical_url);
        vehicle.source_id = opt_text(vehicle.source_id.as_deref());

        vehicle.make = vehicle.make.as_deref().and_then(|make| {
            makes::canonical_make(make)
                .map(str::to_string)
                .or_else(|| clean_text(make, MAX_TEXT_LEN))
        });
        vehicle.model = opt_text(vehicle.model.as_deref());
        vehicle.variant = opt_text(vehicle.variant.as_deref());

        vehicle.mileage = vehicle.mileage.and_then(|v| validators::mileage(i64::from(v)));
        vehicle.power_kw = vehicle.power_kw.and_then(|v| validators::power_kw(i64::from(v)));
        vehicle.doors = vehicle.doors.and_then(|v| validators::doors(i64::from(v)));
        vehicle.seats = vehicle.seats.and_then(|v| validators::seats(i64::from(v)));

        vehicle.fuel = vehicle.fuel.map(|v| synonyms::fuel(v.as_str()));
        vehicle.gearbox = vehicle.gearbox.map(|v| synonyms::gearbox(v.as_str()));
        vehicle.category = vehicle.category.map(|v| synonyms::category(v.as_str()));
        vehicle.condition = vehicle.condition.map(|v| synonyms::condition(v.as_str()));
        vehicle.seller_type = vehicle.seller_type.map(|v| synonyms::seller_type(v.as_str()));
        vehicle.seller_name = opt_text(vehicle.seller_name.as_deref());

        vehicle.features = vehicle
            .features
            .iter()
            .filter_map(|feature| clean_text(feature, MAX_TEXT_LEN))
            .collect();

        let price = vehicle.price().map(i64::from);
        let year = vehicle.year();
        let month = vehicle.month().map(i64::from);
        self.finish(vehicle, price, year, month)
    }

    /// Validates price and registration, then derives identity and the
    /// computed fields
    fn finish(
        &self,
        mut vehicle: Vehicle,
        price: Option<i64>,
        year: Option<i32>,
        month: Option<i64>,
    ) -> Vehicle {
        let reference_year = self.now().year();
        let year = year.and_then(|y| validators::year(y, reference_year));
        let month = month.and_then(validators::month);

        vehicle.set_price(price.and_then(validators::price));
        vehicle.set_registration(year, month);
        vehicle.id = identity::vehicle_identity(&vehicle);
        vehicle.refresh_derived();
        vehicle
    }
}

fn opt_text(text: Option<&str>) -> Option<String> {
    text.and_then(|t| clean_text(t, MAX_TEXT_LEN))
}

fn canonical_url(url: &str) -> Option<String> {
    match canonical_listing_url(url) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            tracing::trace!("Dropping detail link '{}': {}", url, e);
            None
        }
    }
}

/// First vocabulary hit among the items of the given texts
///
/// Each separator-delimited item is tried whole, then word by word.
fn scan<T>(texts: &[&str], lookup: fn(&str) -> Option<T>) -> Option<T> {
    texts.iter().find_map(|text| {
        text.split(SPEC_SEPARATORS).find_map(|item| {
            lookup(item).or_else(|| {
                item.split(|c: char| c.is_whitespace() || c == '(' || c == ')')
                    .filter(|word| !word.is_empty())
                    .find_map(lookup)
            })
        })
    })
}
