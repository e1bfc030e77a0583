//! Deduplication engine
//!
//! Classifies a normalized vehicle against everything already known:
//!
//! - **Duplicate**: same identity, same detail URL, or same content hash
//! - **NearDuplicate**: same make and model and a [`similarity`] of at least
//!   [`NEAR_DUPLICATE_THRESHOLD`]
//! - **New**: anything else

use crate::model::{Fuel, Gearbox, Vehicle};
use std::collections::HashMap;

/// Minimum similarity for a near-duplicate
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.90;

/// Prices match when they differ by at most this share of their average
pub const PRICE_TOLERANCE: f64 = 0.05;

/// Mileages match when they differ by at most this share of their average
pub const MILEAGE_TOLERANCE: f64 = 0.10;

/// Outcome of classifying one vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    New,
    Duplicate { existing_id: String },
    NearDuplicate { existing_id: String },
}

impl Classification {
    pub fn existing_id(&self) -> Option<&str> {
        match self {
            Self::New => None,
            Self::Duplicate { existing_id } | Self::NearDuplicate { existing_id } => {
                Some(existing_id.as_str())
            }
        }
    }
}

/// The attributes similarity is computed over
#[derive(Debug, Clone, PartialEq)]
struct Fingerprint {
    id: String,
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    fuel: Option<Fuel>,
    gearbox: Option<Gearbox>,
    price: Option<u32>,
    mileage: Option<u32>,
}

impl From<&Vehicle> for Fingerprint {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id.clone(),
            make: vehicle.make.as_deref().map(str::to_lowercase),
            model: vehicle.model.as_deref().map(str::to_lowercase),
            year: vehicle.year(),
            fuel: vehicle.fuel.clone(),
            gearbox: vehicle.gearbox.clone(),
            price: vehicle.price(),
            mileage: vehicle.mileage,
        }
    }
}

impl Fingerprint {
    fn bucket(&self) -> Option<(String, String)> {
        Some((self.make.clone()?, self.model.clone()?))
    }
}

/// Lookup structure over known vehicles
///
/// Keyed by identity, detail URL and content hash for exact matches, and
/// bucketed by (make, model) for near-duplicate candidates.
#[derive(Debug, Clone, Default)]
pub struct DeduplicationIndex {
    by_identity: HashMap<String, usize>,
    by_url: HashMap<String, usize>,
    by_content: HashMap<String, usize>,
    by_bucket: HashMap<(String, String), Vec<usize>>,
    entries: Vec<Fingerprint>,
}

impl DeduplicationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index over the given vehicles
    pub fn from_vehicles<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        let mut index = Self::new();
        for vehicle in vehicles {
            index.insert(vehicle);
        }
        index
    }

    /// Adds a vehicle; re-inserting a known identity is a no-op
    pub fn insert(&mut self, vehicle: &Vehicle) {
        if self.by_identity.contains_key(&vehicle.id) {
            return;
        }

        let position = self.entries.len();
        let fingerprint = Fingerprint::from(vehicle);

        self.by_identity.insert(vehicle.id.clone(), position);
        if let Some(url) = &vehicle.url {
            self.by_url.entry(url.clone()).or_insert(position);
        }
        if let Some(hash) = exact_content_hash(vehicle) {
            self.by_content.entry(hash).or_insert(position);
        }
        if let Some(bucket) = fingerprint.bucket() {
            self.by_bucket.entry(bucket).or_default().push(position);
        }
        self.entries.push(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn id_at(&self, position: usize) -> String {
        self.entries[position].id.clone()
    }
}

/// Content hash, only for vehicles with enough content to be compared
///
/// Without make, model and price the hash collapses unrelated listings.
fn exact_content_hash(vehicle: &Vehicle) -> Option<String> {
    if vehicle.make.is_some() && vehicle.model.is_some() && vehicle.price().is_some() {
        Some(vehicle.content_hash())
    } else {
        None
    }
}

/// Classifies a vehicle against the index
pub fn classify(vehicle: &Vehicle, index: &DeduplicationIndex) -> Classification {
    let exact = index
        .by_identity
        .get(&vehicle.id)
        .or_else(|| vehicle.url.as_ref().and_then(|url| index.by_url.get(url)))
        .or_else(|| exact_content_hash(vehicle).and_then(|hash| index.by_content.get(&hash)));
    if let Some(&position) = exact {
        return Classification::Duplicate {
            existing_id: index.id_at(position),
        };
    }

    let candidate = Fingerprint::from(vehicle);
    let Some(bucket) = candidate.bucket() else {
        return Classification::New;
    };

    let mut best: Option<(f64, usize)> = None;
    for &position in index.by_bucket.get(&bucket).into_iter().flatten() {
        let score = score(&candidate, &index.entries[position]);
        if score >= NEAR_DUPLICATE_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, position));
        }
    }

    match best {
        Some((_, position)) => Classification::NearDuplicate {
            existing_id: index.id_at(position),
        },
        None => Classification::New,
    }
}

/// Similarity between two vehicles, from 0.0 to 1.0
///
/// Counts agreeing fields among make, model, year, fuel and gearbox (equal),
/// price (within 5% of the pair's average) and mileage (within 10%), divided
/// by the number of those fields present on both. Vehicles sharing no field
/// score 0.0.
pub fn similarity(a: &Vehicle, b: &Vehicle) -> f64 {
    score(&Fingerprint::from(a), &Fingerprint::from(b))
}

fn score(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut present = 0u32;
    let mut matching = 0u32;

    let mut compare = |outcome: Option<bool>| {
        if let Some(equal) = outcome {
            present += 1;
            if equal {
                matching += 1;
            }
        }
    };

    compare(both(&a.make, &b.make, |x, y| x == y));
    compare(both(&a.model, &b.model, |x, y| x == y));
    compare(both(&a.year, &b.year, |x, y| x == y));
    compare(both(&a.fuel, &b.fuel, |x, y| x == y));
    compare(both(&a.gearbox, &b.gearbox, |x, y| x == y));
    compare(both(&a.price, &b.price, |x, y| {
        within(f64::from(*x), f64::from(*y), PRICE_TOLERANCE)
    }));
    compare(both(&a.mileage, &b.mileage, |x, y| {
        within(f64::from(*x), f64::from(*y), MILEAGE_TOLERANCE)
    }));

    if present == 0 {
        0.0
    } else {
        f64::from(matching) / f64::from(present)
    }
}

fn both<T>(a: &Option<T>, b: &Option<T>, eq: impl Fn(&T, &T) -> bool) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(eq(a, b)),
        _ => None,
    }
}

/// Whether two amounts differ by at most `tolerance` of their average
fn within(a: f64, b: f64, tolerance: f64) -> bool {
    let average = (a + b) / 2.0;
    if average == 0.0 {
        return a == b;
    }
    (a - b).abs() <= tolerance * average
}
