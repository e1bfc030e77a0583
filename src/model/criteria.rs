use crate::model::{Condition, CycleStatus, Fuel, Gearbox, SellerType};
use crate::normalize::synonyms;
use crate::CriteriaError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Polling interval applied when an imported search does not specify one
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u32 = 15;

/// A user's saved vehicle search
///
/// The tier is an explicit field: the scheduler never infers it, and a search
/// without a tier is rejected by [`SearchCriteria::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    /// Database ID (0 until stored)
    pub id: i64,

    /// Owning account, passed through to the notification dispatcher
    pub user_id: String,

    /// Display name chosen by the owner
    pub name: String,

    pub make: Option<String>,
    pub model: Option<String>,

    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub mileage_min: Option<u32>,
    pub mileage_max: Option<u32>,

    pub fuel: Option<Fuel>,
    pub gearbox: Option<Gearbox>,
    pub condition: Option<Condition>,
    pub seller_type: Option<SellerType>,

    /// Postal code the radius is measured from
    pub zip_code: Option<String>,

    /// Search radius in kilometres (ignored without a zip code)
    pub radius_km: Option<u32>,

    /// Required equipment, as free-text labels
    pub features: Vec<String>,

    /// Inactive searches are never selected for a cycle
    pub active: bool,

    /// Name of the scheduler tier that polls this search
    pub tier: String,

    /// Minimum time between two cycles of this search
    pub polling_interval_minutes: u32,

    /// When the last cycle finished, successful or not
    pub last_run_at: Option<DateTime<Utc>>,

    /// Error recorded by the last failed cycle
    pub last_error: Option<String>,

    pub last_status: Option<CycleStatus>,
}

impl SearchCriteria {
    /// Creates an active search with no filters
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            name: name.into(),
            make: None,
            model: None,
            price_min: None,
            price_max: None,
            year_min: None,
            year_max: None,
            mileage_min: None,
            mileage_max: None,
            fuel: None,
            gearbox: None,
            condition: None,
            seller_type: None,
            zip_code: None,
            radius_km: None,
            features: Vec::new(),
            active: true,
            tier: tier.into(),
            polling_interval_minutes: DEFAULT_POLLING_INTERVAL_MINUTES,
            last_run_at: None,
            last_error: None,
            last_status: None,
        }
    }

    /// Checks the invariants a search must hold before it can be stored
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.user_id.trim().is_empty() {
            return Err(CriteriaError::MissingOwner(self.name.clone()));
        }

        if self.tier.trim().is_empty() {
            return Err(CriteriaError::MissingTier(self.name.clone()));
        }

        if self.polling_interval_minutes == 0 {
            return Err(CriteriaError::ZeroInterval(self.name.clone()));
        }

        check_range("price", self.price_min.map(i64::from), self.price_max.map(i64::from))?;
        check_range("year", self.year_min.map(i64::from), self.year_max.map(i64::from))?;
        check_range(
            "mileage",
            self.mileage_min.map(i64::from),
            self.mileage_max.map(i64::from),
        )?;

        Ok(())
    }

    /// Whether enough time has passed since the last cycle
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => last + Duration::minutes(i64::from(self.polling_interval_minutes)) <= now,
        }
    }
}

fn check_range(field: &'static str, min: Option<i64>, max: Option<i64>) -> Result<(), CriteriaError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            Err(CriteriaError::InvertedRange { field, min, max })
        }
        _ => Ok(()),
    }
}

/// File format for `--import-searches`
#[derive(Debug, Deserialize)]
pub struct CriteriaFile {
    #[serde(default)]
    pub search: Vec<CriteriaSpec>,
}

/// One search as written by hand in an import file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CriteriaSpec {
    pub user: String,
    pub name: String,
    pub tier: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub mileage_min: Option<u32>,
    pub mileage_max: Option<u32>,
    pub fuel: Option<String>,
    pub gearbox: Option<String>,
    pub condition: Option<String>,
    pub seller_type: Option<String>,
    pub zip_code: Option<String>,
    pub radius_km: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
    pub polling_interval: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CriteriaSpec {
    /// Resolves free-text enum values and validates the result
    ///
    /// Unlike listing normalization, a search must only use values the
    /// query vocabulary understands, so unknown values are an error here.
    pub fn into_criteria(self) -> Result<SearchCriteria, CriteriaError> {
        let name = self.name.clone();
        let unknown = |field: &'static str, value: &str| CriteriaError::UnknownValue {
            name: name.clone(),
            field,
            value: value.to_string(),
        };

        let fuel = match self.fuel.as_deref() {
            Some(text) => match synonyms::fuel(text) {
                Fuel::Other(_) => return Err(unknown("fuel", text)),
                fuel => Some(fuel),
            },
            None => None,
        };
        let gearbox = match self.gearbox.as_deref() {
            Some(text) => match synonyms::gearbox(text) {
                Gearbox::Other(_) => return Err(unknown("gearbox", text)),
                gearbox => Some(gearbox),
            },
            None => None,
        };
        let condition = match self.condition.as_deref() {
            Some(text) => match synonyms::condition(text) {
                Condition::Other(_) => return Err(unknown("condition", text)),
                condition => Some(condition),
            },
            None => None,
        };
        let seller_type = match self.seller_type.as_deref() {
            Some(text) => match synonyms::seller_type(text) {
                SellerType::Other(_) => return Err(unknown("seller-type", text)),
                seller_type => Some(seller_type),
            },
            None => None,
        };

        let mut criteria = SearchCriteria::new(self.user, self.name, self.tier);
        criteria.make = self.make;
        criteria.model = self.model;
        criteria.price_min = self.price_min;
        criteria.price_max = self.price_max;
        criteria.year_min = self.year_min;
        criteria.year_max = self.year_max;
        criteria.mileage_min = self.mileage_min;
        criteria.mileage_max = self.mileage_max;
        criteria.fuel = fuel;
        criteria.gearbox = gearbox;
        criteria.condition = condition;
        criteria.seller_type = seller_type;
        criteria.zip_code = self.zip_code;
        criteria.radius_km = self.radius_km;
        criteria.features = self.features;
        criteria.active = self.active;
        if let Some(interval) = self.polling_interval {
            criteria.polling_interval_minutes = interval;
        }

        criteria.validate()?;
        Ok(criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_open_ranges() {
        let mut criteria = SearchCriteria::new("user-1", "any bmw", "high");
        criteria.price_max = Some(30_000);
        criteria.year_min = Some(2015);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_price() {
        let mut criteria = SearchCriteria::new("user-1", "broken", "high");
        criteria.price_min = Some(20_000);
        criteria.price_max = Some(10_000);
        assert_eq!(
            criteria.validate(),
            Err(CriteriaError::InvertedRange {
                field: "price",
                min: 20_000,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_validate_rejects_inverted_year() {
        let mut criteria = SearchCriteria::new("user-1", "broken", "high");
        criteria.year_min = Some(2020);
        criteria.year_max = Some(2010);
        assert!(matches!(
            criteria.validate(),
            Err(CriteriaError::InvertedRange { field: "year", .. })
        ));
    }

    #[test]
    fn test_validate_requires_tier() {
        let criteria = SearchCriteria::new("user-1", "no tier", "  ");
        assert_eq!(
            criteria.validate(),
            Err(CriteriaError::MissingTier("no tier".to_string()))
        );
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut criteria = SearchCriteria::new("user-1", "due", "high");
        assert!(criteria.is_due(now));

        criteria.polling_interval_minutes = 10;
        criteria.last_run_at = Some(now - Duration::minutes(5));
        assert!(!criteria.is_due(now));

        criteria.last_run_at = Some(now - Duration::minutes(10));
        assert!(criteria.is_due(now));
    }

    #[test]
    fn test_spec_resolves_synonyms() {
        let spec: CriteriaFile = toml::from_str(
            r#"
[[search]]
user = "user-1"
name = "Diesel 3er"
tier = "high"
make = "BMW"
model = "3er"
price-max = 30000
fuel = "Diesel"
gearbox = "Automatik"
"#,
        )
        .unwrap();

        let criteria = spec.search[0].clone().into_criteria().unwrap();
        assert_eq!(criteria.fuel, Some(Fuel::Diesel));
        assert_eq!(criteria.gearbox, Some(Gearbox::Automatic));
        assert_eq!(criteria.price_max, Some(30_000));
        assert!(criteria.active);
    }

    #[test]
    fn test_spec_rejects_unknown_fuel() {
        let spec: CriteriaFile = toml::from_str(
            r#"
[[search]]
user = "user-1"
name = "odd"
tier = "low"
fuel = "steam"
"#,
        )
        .unwrap();

        let err = spec.search[0].clone().into_criteria().unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownValue { field: "fuel", .. }));
    }
}
