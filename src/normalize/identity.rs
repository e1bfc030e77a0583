//! Vehicle identity and content hashing
//!
//! Both hashes are SHA-256 truncated to 128 bits and hex-encoded.

use crate::model::Vehicle;
use sha2::{Digest, Sha256};

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..16])
}

fn field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Stable identity of a vehicle
///
/// The canonical detail URL when there is one, otherwise the listing's
/// key attributes. Two records with the same identity are the same listing.
pub fn vehicle_identity(vehicle: &Vehicle) -> String {
    match vehicle.url.as_deref() {
        Some(url) => short_hash(&format!("url:{}", url)),
        None => short_hash(&format!(
            "attrs:{}|{}|{}|{}|{}",
            field(vehicle.make.as_deref()).to_lowercase(),
            field(vehicle.model.as_deref()).to_lowercase(),
            field(vehicle.price()),
            field(vehicle.year()),
            field(vehicle.mileage),
        )),
    }
}

/// Hash over the attributes that make two listings the same offer
///
/// Covers make, model, year, price, fuel and gearbox; the URL is not part
/// of it, so a relisted vehicle hashes the same as the original.
pub fn content_hash(vehicle: &Vehicle) -> String {
    short_hash(
        &format!(
            "{}|{}|{}|{}|{}|{}",
            field(vehicle.make.as_deref()),
            field(vehicle.model.as_deref()),
            field(vehicle.year()),
            field(vehicle.price()),
            field(vehicle.fuel.as_ref().map(|f| f.as_str())),
            field(vehicle.gearbox.as_ref().map(|g| g.as_str())),
        )
        .to_lowercase(),
    )
}
