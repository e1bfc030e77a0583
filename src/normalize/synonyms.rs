//! Synonym tables for enumerated vehicle attributes
//!
//! Keys are compared after lowercasing, collapsing whitespace and treating
//! `-` and `_` as spaces, so "Plug-in-Hybrid", "plugin_hybrid" and
//! "plug in hybrid" all hit the same row. Canonical names are part of every
//! table, which keeps re-normalization a fixed point.

use crate::model::{Category, Condition, Fuel, Gearbox, SellerType};
use crate::normalize::validators::MAX_LABEL_LEN;

/// Unknown values are kept, but only this many characters of them
pub const MAX_OTHER_LEN: usize = MAX_LABEL_LEN;

const FUEL: &[(&str, Fuel)] = &[
    ("petrol", Fuel::Petrol),
    ("benzin", Fuel::Petrol),
    ("gasoline", Fuel::Petrol),
    ("super", Fuel::Petrol),
    ("super plus", Fuel::Petrol),
    ("diesel", Fuel::Diesel),
    ("electric", Fuel::Electric),
    ("electricity", Fuel::Electric),
    ("elektro", Fuel::Electric),
    ("ev", Fuel::Electric),
    ("hybrid", Fuel::Hybrid),
    ("hybrid (benzin/elektro)", Fuel::Hybrid),
    ("hybrid (diesel/elektro)", Fuel::Hybrid),
    ("plugin hybrid", Fuel::PluginHybrid),
    ("plug in hybrid", Fuel::PluginHybrid),
    ("phev", Fuel::PluginHybrid),
    ("lpg", Fuel::Lpg),
    ("autogas", Fuel::Lpg),
    ("autogas (lpg)", Fuel::Lpg),
    ("cng", Fuel::Cng),
    ("erdgas", Fuel::Cng),
    ("erdgas (cng)", Fuel::Cng),
    ("hydrogen", Fuel::Hydrogen),
    ("wasserstoff", Fuel::Hydrogen),
];

const GEARBOX: &[(&str, Gearbox)] = &[
    ("manual", Gearbox::Manual),
    ("manuell", Gearbox::Manual),
    ("schaltgetriebe", Gearbox::Manual),
    ("schaltung", Gearbox::Manual),
    ("automatic", Gearbox::Automatic),
    ("automatik", Gearbox::Automatic),
    ("automatikgetriebe", Gearbox::Automatic),
    ("semi automatic", Gearbox::SemiAutomatic),
    ("halbautomatik", Gearbox::SemiAutomatic),
    ("halbautomatisch", Gearbox::SemiAutomatic),
    ("sequential", Gearbox::SemiAutomatic),
];

const CATEGORY: &[(&str, Category)] = &[
    ("sedan", Category::Sedan),
    ("saloon", Category::Sedan),
    ("limousine", Category::Sedan),
    ("estate", Category::Estate),
    ("wagon", Category::Estate),
    ("kombi", Category::Estate),
    ("touring", Category::Estate),
    ("avant", Category::Estate),
    ("hatchback", Category::Hatchback),
    ("kleinwagen", Category::Hatchback),
    ("suv", Category::Suv),
    ("geländewagen", Category::Suv),
    ("suv / geländewagen", Category::Suv),
    ("coupe", Category::Coupe),
    ("coupé", Category::Coupe),
    ("sportwagen", Category::Coupe),
    ("sportwagen/coupé", Category::Coupe),
    ("convertible", Category::Convertible),
    ("cabrio", Category::Convertible),
    ("cabriolet", Category::Convertible),
    ("roadster", Category::Convertible),
    ("cabrio/roadster", Category::Convertible),
    ("van", Category::Van),
    ("minibus", Category::Van),
    ("van/minibus", Category::Van),
    ("transporter", Category::Van),
    ("pickup", Category::Pickup),
    ("pick up", Category::Pickup),
];

const CONDITION: &[(&str, Condition)] = &[
    ("new", Condition::New),
    ("neu", Condition::New),
    ("neuwagen", Condition::New),
    ("used", Condition::Used),
    ("gebraucht", Condition::Used),
    ("gebrauchtwagen", Condition::Used),
    ("jahreswagen", Condition::Used),
    ("demonstration", Condition::Demonstration),
    ("demo", Condition::Demonstration),
    ("vorführfahrzeug", Condition::Demonstration),
    ("vorführwagen", Condition::Demonstration),
    ("damaged", Condition::Damaged),
    ("unfallfahrzeug", Condition::Damaged),
    ("unfallwagen", Condition::Damaged),
    ("beschädigt", Condition::Damaged),
];

const SELLER_TYPE: &[(&str, SellerType)] = &[
    ("dealer", SellerType::Dealer),
    ("dealership", SellerType::Dealer),
    ("händler", SellerType::Dealer),
    ("haendler", SellerType::Dealer),
    ("autohaus", SellerType::Dealer),
    ("private", SellerType::Private),
    ("private seller", SellerType::Private),
    ("privat", SellerType::Private),
    ("privatanbieter", SellerType::Private),
    ("privatverkauf", SellerType::Private),
];

fn key(text: &str) -> String {
    text.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn other(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_OTHER_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn lookup<T: Clone>(table: &[(&str, T)], text: &str) -> Option<T> {
    let key = key(text);
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value.clone())
}

pub fn lookup_fuel(text: &str) -> Option<Fuel> {
    lookup(FUEL, text)
}

pub fn lookup_gearbox(text: &str) -> Option<Gearbox> {
    lookup(GEARBOX, text)
}

pub fn lookup_category(text: &str) -> Option<Category> {
    lookup(CATEGORY, text)
}

pub fn lookup_condition(text: &str) -> Option<Condition> {
    lookup(CONDITION, text)
}

pub fn lookup_seller_type(text: &str) -> Option<SellerType> {
    lookup(SELLER_TYPE, text)
}

/// Maps free text to a fuel, keeping unknown text as [`Fuel::Other`]
pub fn fuel(text: &str) -> Fuel {
    lookup_fuel(text).unwrap_or_else(|| Fuel::Other(other(text)))
}

pub fn gearbox(text: &str) -> Gearbox {
    lookup_gearbox(text).unwrap_or_else(|| Gearbox::Other(other(text)))
}

pub fn category(text: &str) -> Category {
    lookup_category(text).unwrap_or_else(|| Category::Other(other(text)))
}

pub fn condition(text: &str) -> Condition {
    lookup_condition(text).unwrap_or_else(|| Condition::Other(other(text)))
}

pub fn seller_type(text: &str) -> SellerType {
    lookup_seller_type(text).unwrap_or_else(|| SellerType::Other(other(text)))
}
