use crate::model::{Category, Condition, Fuel, Gearbox, SellerType};
use crate::normalize::identity;
use chrono::{DateTime, Datelike, Utc};
use std::collections::BTreeSet;

/// Canonical, range-validated vehicle record
///
/// Price and first registration are private: they can only change through
/// [`Vehicle::set_price`] and [`Vehicle::set_registration`], which keep the
/// derived fields (age, price per year, keywords) in step.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    /// Stable identity, see [`identity::vehicle_identity`]
    pub id: String,

    pub url: Option<String>,
    pub source_id: Option<String>,
    pub title: String,

    pub make: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,

    price: Option<u32>,
    year: Option<i32>,
    month: Option<u8>,

    pub mileage: Option<u32>,
    pub power_kw: Option<u32>,
    pub doors: Option<u8>,
    pub seats: Option<u8>,

    pub fuel: Option<Fuel>,
    pub gearbox: Option<Gearbox>,
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub seller_type: Option<SellerType>,
    pub seller_name: Option<String>,

    pub features: BTreeSet<String>,
    pub images: Vec<String>,

    derived: Derived,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    /// Cycle that first produced this record
    pub cycle_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Derived {
    age_years: Option<u32>,
    price_per_year: Option<u32>,
    keywords: BTreeSet<String>,
}

impl Vehicle {
    /// Creates a record with only a title; everything else is filled in by
    /// the normalizer or the storage layer
    pub fn new(id: impl Into<String>, title: impl Into<String>, seen_at: DateTime<Utc>) -> Self {
        let mut vehicle = Self {
            id: id.into(),
            url: None,
            source_id: None,
            title: title.into(),
            make: None,
            model: None,
            variant: None,
            price: None,
            year: None,
            month: None,
            mileage: None,
            power_kw: None,
            doors: None,
            seats: None,
            fuel: None,
            gearbox: None,
            category: None,
            condition: None,
            seller_type: None,
            seller_name: None,
            features: BTreeSet::new(),
            images: Vec::new(),
            derived: Derived::default(),
            first_seen: seen_at,
            last_seen: seen_at,
            cycle_id: None,
        };
        vehicle.refresh_derived();
        vehicle
    }

    pub fn price(&self) -> Option<u32> {
        self.price
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn month(&self) -> Option<u8> {
        self.month
    }

    pub fn age_years(&self) -> Option<u32> {
        self.derived.age_years
    }

    pub fn price_per_year(&self) -> Option<u32> {
        self.derived.price_per_year
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.derived.keywords
    }

    pub fn set_price(&mut self, price: Option<u32>) {
        self.price = price;
        self.refresh_derived();
    }

    pub fn set_registration(&mut self, year: Option<i32>, month: Option<u8>) {
        self.year = year;
        self.month = if year.is_some() { month } else { None };
        self.refresh_derived();
    }

    /// Content hash used for exact duplicate detection
    pub fn content_hash(&self) -> String {
        identity::content_hash(self)
    }

    /// Recomputes age, price per year and the keyword set
    ///
    /// Age is measured at `last_seen`, so the result depends only on the
    /// record itself.
    pub fn refresh_derived(&mut self) {
        let age_years = self.year.map(|year| {
            let reference_months = self.last_seen.year() * 12 + self.last_seen.month() as i32;
            let registered_months = year * 12 + i32::from(self.month.unwrap_or(1));
            (reference_months - registered_months).max(0) as u32 / 12
        });

        let price_per_year = match (self.price, age_years) {
            (Some(price), Some(age)) => Some(price / age.max(1)),
            _ => None,
        };

        let mut keywords = BTreeSet::new();
        let texts = [
            self.make.as_deref(),
            self.model.as_deref(),
            self.variant.as_deref(),
            self.fuel.as_ref().map(|f| f.as_str()),
            self.gearbox.as_ref().map(|g| g.as_str()),
            self.category.as_ref().map(|c| c.as_str()),
        ];
        for text in texts.into_iter().flatten() {
            insert_keywords(&mut keywords, text);
        }
        for feature in &self.features {
            insert_keywords(&mut keywords, feature);
        }

        self.derived = Derived {
            age_years,
            price_per_year,
            keywords,
        };
    }
}

fn insert_keywords(keywords: &mut BTreeSet<String>, text: &str) {
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() >= 2 {
            keywords.insert(token.to_lowercase());
        }
    }
}
