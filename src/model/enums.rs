//! Enumerated vehicle attributes
//!
//! Every enum carries an `Other` variant so that unrecognized source values
//! pass through (truncated by the normalizer) instead of being rejected.
//! `as_str` and `from_canonical` round-trip for every value, which is what
//! the database and the query vocabulary rely on.

use std::fmt;

/// Fuel / energy source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fuel {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
    PluginHybrid,
    Lpg,
    Cng,
    Hydrogen,
    Other(String),
}

impl Fuel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Petrol => "petrol",
            Self::Diesel => "diesel",
            Self::Electric => "electric",
            Self::Hybrid => "hybrid",
            Self::PluginHybrid => "plugin_hybrid",
            Self::Lpg => "lpg",
            Self::Cng => "cng",
            Self::Hydrogen => "hydrogen",
            Self::Other(s) => s,
        }
    }

    pub fn from_canonical(s: &str) -> Self {
        match s {
            "petrol" => Self::Petrol,
            "diesel" => Self::Diesel,
            "electric" => Self::Electric,
            "hybrid" => Self::Hybrid,
            "plugin_hybrid" => Self::PluginHybrid,
            "lpg" => Self::Lpg,
            "cng" => Self::Cng,
            "hydrogen" => Self::Hydrogen,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Transmission type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gearbox {
    Manual,
    Automatic,
    SemiAutomatic,
    Other(String),
}

impl Gearbox {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::SemiAutomatic => "semi_automatic",
            Self::Other(s) => s,
        }
    }

    pub fn from_canonical(s: &str) -> Self {
        match s {
            "manual" => Self::Manual,
            "automatic" => Self::Automatic,
            "semi_automatic" => Self::SemiAutomatic,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Body style
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Sedan,
    Estate,
    Hatchback,
    Suv,
    Coupe,
    Convertible,
    Van,
    Pickup,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sedan => "sedan",
            Self::Estate => "estate",
            Self::Hatchback => "hatchback",
            Self::Suv => "suv",
            Self::Coupe => "coupe",
            Self::Convertible => "convertible",
            Self::Van => "van",
            Self::Pickup => "pickup",
            Self::Other(s) => s,
        }
    }

    pub fn from_canonical(s: &str) -> Self {
        match s {
            "sedan" => Self::Sedan,
            "estate" => Self::Estate,
            "hatchback" => Self::Hatchback,
            "suv" => Self::Suv,
            "coupe" => Self::Coupe,
            "convertible" => Self::Convertible,
            "van" => Self::Van,
            "pickup" => Self::Pickup,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Vehicle condition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Condition {
    New,
    Used,
    Demonstration,
    Damaged,
    Other(String),
}

impl Condition {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Demonstration => "demonstration",
            Self::Damaged => "damaged",
            Self::Other(s) => s,
        }
    }

    pub fn from_canonical(s: &str) -> Self {
        match s {
            "new" => Self::New,
            "used" => Self::Used,
            "demonstration" => Self::Demonstration,
            "damaged" => Self::Damaged,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Who is selling the vehicle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SellerType {
    Dealer,
    Private,
    Other(String),
}

impl SellerType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Dealer => "dealer",
            Self::Private => "private",
            Self::Other(s) => s,
        }
    }

    pub fn from_canonical(s: &str) -> Self {
        match s {
            "dealer" => Self::Dealer,
            "private" => Self::Private,
            other => Self::Other(other.to_string()),
        }
    }
}

/// How urgently a match should reach the user
///
/// Assigned per tier; delivery semantics belong to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Urgency {
    Immediate,
    #[default]
    Normal,
    Digest,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Normal => "normal",
            Self::Digest => "digest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "immediate" | "high" => Some(Self::Immediate),
            "normal" | "medium" => Some(Self::Normal),
            "digest" | "low" => Some(Self::Digest),
            _ => None,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Fuel, Gearbox, Category, Condition, SellerType, Urgency);
