//! Catalog vocabulary tables
//!
//! Translate canonical criteria values into the catalog's parameter
//! values. Anything not listed here cannot be expressed as a filter.

use crate::model::{Condition, Fuel, Gearbox, SellerType};

/// Catalog make IDs, keyed by canonical make name
const MAKE_IDS: &[(&str, u32)] = &[
    ("Alfa Romeo", 900),
    ("Audi", 1900),
    ("BMW", 3500),
    ("Citroen", 5900),
    ("Cupra", 3),
    ("Dacia", 21600),
    ("Fiat", 8800),
    ("Ford", 9000),
    ("Honda", 11000),
    ("Hyundai", 11600),
    ("Kia", 13200),
    ("Land Rover", 14800),
    ("Mazda", 16800),
    ("Mercedes-Benz", 17200),
    ("MINI", 17500),
    ("Nissan", 18700),
    ("Opel", 19000),
    ("Peugeot", 19300),
    ("Porsche", 20100),
    ("Renault", 20700),
    ("Seat", 22500),
    ("Skoda", 22900),
    ("Tesla", 135),
    ("Toyota", 24100),
    ("Volkswagen", 25200),
    ("Volvo", 25100),
];

/// (canonical make, model key, catalog model ID); keys are lowercase with
/// spaces and hyphens removed
const MODEL_IDS: &[(&str, &str, u32)] = &[
    ("Audi", "a3", 4),
    ("Audi", "a4", 5),
    ("Audi", "a6", 7),
    ("Audi", "q3", 32),
    ("Audi", "q5", 31),
    ("BMW", "1er", 2),
    ("BMW", "1series", 2),
    ("BMW", "2er", 68),
    ("BMW", "3er", 73),
    ("BMW", "3series", 73),
    ("BMW", "4er", 76),
    ("BMW", "5er", 79),
    ("BMW", "5series", 79),
    ("BMW", "x1", 44),
    ("BMW", "x3", 47),
    ("BMW", "x5", 49),
    ("Ford", "fiesta", 14),
    ("Ford", "focus", 15),
    ("Mercedes-Benz", "aklasse", 1),
    ("Mercedes-Benz", "aclass", 1),
    ("Mercedes-Benz", "cklasse", 4),
    ("Mercedes-Benz", "cclass", 4),
    ("Mercedes-Benz", "eklasse", 6),
    ("Mercedes-Benz", "eclass", 6),
    ("Mercedes-Benz", "glc", 88),
    ("Opel", "astra", 5),
    ("Opel", "corsa", 9),
    ("Porsche", "911", 7),
    ("Skoda", "octavia", 6),
    ("Tesla", "model3", 2),
    ("Tesla", "modely", 4),
    ("Volkswagen", "golf", 17),
    ("Volkswagen", "passat", 25),
    ("Volkswagen", "polo", 26),
    ("Volkswagen", "tiguan", 33),
    ("Volkswagen", "id.3", 78),
];

/// (feature key, catalog code); keys are lowercase, single-spaced
const FEATURES: &[(&str, &str)] = &[
    ("navigation", "NAVIGATION_SYSTEM"),
    ("navigationssystem", "NAVIGATION_SYSTEM"),
    ("navi", "NAVIGATION_SYSTEM"),
    ("sitzheizung", "ELECTRIC_HEATED_SEATS"),
    ("heated seats", "ELECTRIC_HEATED_SEATS"),
    ("anhängerkupplung", "TRAILER_COUPLING"),
    ("tow bar", "TRAILER_COUPLING"),
    ("towbar", "TRAILER_COUPLING"),
    ("klimaautomatik", "AUTOMATIC_CLIMATISATION"),
    ("automatic climate control", "AUTOMATIC_CLIMATISATION"),
    ("einparkhilfe", "PARKING_SENSORS"),
    ("parking sensors", "PARKING_SENSORS"),
    ("tempomat", "CRUISE_CONTROL"),
    ("cruise control", "CRUISE_CONTROL"),
    ("led scheinwerfer", "LED_HEADLIGHTS"),
    ("led headlights", "LED_HEADLIGHTS"),
    ("panoramadach", "PANORAMIC_GLASS_ROOF"),
    ("panoramic roof", "PANORAMIC_GLASS_ROOF"),
    ("allrad", "FOUR_WHEEL_DRIVE"),
    ("4x4", "FOUR_WHEEL_DRIVE"),
    ("awd", "FOUR_WHEEL_DRIVE"),
    ("apple carplay", "CARPLAY"),
    ("carplay", "CARPLAY"),
    ("android auto", "ANDROID_AUTO"),
];

pub fn make_id(make: &str) -> Option<u32> {
    MAKE_IDS
        .iter()
        .find(|(name, _)| *name == make)
        .map(|(_, id)| *id)
}

pub fn model_id(make: &str, model: &str) -> Option<u32> {
    let key: String = model
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    MODEL_IDS
        .iter()
        .find(|(m, k, _)| *m == make && *k == key)
        .map(|(_, _, id)| *id)
}

pub fn feature_code(feature: &str) -> Option<&'static str> {
    let key = feature
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    FEATURES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, code)| *code)
}

pub fn fuel(fuel: &Fuel) -> Option<&'static str> {
    match fuel {
        Fuel::Petrol => Some("PETROL"),
        Fuel::Diesel => Some("DIESEL"),
        Fuel::Electric => Some("ELECTRICITY"),
        Fuel::Hybrid => Some("HYBRID"),
        Fuel::PluginHybrid => Some("HYBRID_PLUGIN"),
        Fuel::Lpg => Some("LPG"),
        Fuel::Cng => Some("CNG"),
        Fuel::Hydrogen => Some("HYDROGENIUM"),
        Fuel::Other(_) => None,
    }
}

pub fn gearbox(gearbox: &Gearbox) -> Option<&'static str> {
    match gearbox {
        Gearbox::Manual => Some("MANUAL_GEAR"),
        Gearbox::Automatic => Some("AUTOMATIC_GEAR"),
        Gearbox::SemiAutomatic => Some("SEMIAUTOMATIC_GEAR"),
        Gearbox::Other(_) => None,
    }
}

pub fn condition(condition: &Condition) -> Option<&'static str> {
    match condition {
        Condition::New => Some("NEW"),
        Condition::Used => Some("USED"),
        Condition::Demonstration => Some("DEMONSTRATION"),
        Condition::Damaged => Some("DAMAGED"),
        Condition::Other(_) => None,
    }
}

pub fn seller_type(seller_type: &SellerType) -> Option<&'static str> {
    match seller_type {
        SellerType::Dealer => Some("DEALER"),
        SellerType::Private => Some("FSBO"),
        SellerType::Other(_) => None,
    }
}
