//! Query builder
//!
//! [`build_query`] turns a [`SearchCriteria`] into catalog parameters. It is
//! a pure function: the same criteria always yield the same parameters in
//! the same order, and absent fields are never emitted.

pub mod vocab;

use crate::model::SearchCriteria;
use crate::normalize::makes::canonical_make;
use std::collections::BTreeSet;
use url::Url;

/// Parameter carrying the page number; omitted for page 1
pub const PAGE_PARAM: &str = "pageNumber";

/// A catalog search, independent of the endpoint it is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values of a repeated parameter, in order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// URL of one result page
    ///
    /// The parameters are appended to whatever query the base URL already
    /// carries.
    pub fn page_url(&self, base: &Url, page: u32) -> Url {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs(&self.params);
            if page > 1 {
                pairs.append_pair(PAGE_PARAM, &page.to_string());
            }
        }
        url
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.params.push((key.to_string(), value.into()));
    }
}

/// Builds the catalog query for a search
///
/// Parameter order: category, make/model (or keyword), price, registration,
/// mileage, fuel, gearbox, condition, seller type, location, features, sort.
///
/// # Example
///
/// ```
/// use auto_alert::{build_query, SearchCriteria};
///
/// let mut criteria = SearchCriteria::new("user-1", "3er", "high");
/// criteria.make = Some("BMW".to_string());
/// criteria.model = Some("3er".to_string());
/// criteria.price_max = Some(30_000);
///
/// let query = build_query(&criteria);
/// assert_eq!(query.get("ms"), Some("3500;73;;"));
/// assert_eq!(query.get("p"), Some(":30000"));
/// ```
pub fn build_query(criteria: &SearchCriteria) -> Query {
    let mut query = Query { params: Vec::new() };
    query.push("s", "Car");
    query.push("vc", "Car");

    push_make_model(&mut query, criteria);

    if let Some(range) = range(criteria.price_min, criteria.price_max) {
        query.push("p", range);
    }
    if let Some(range) = range(criteria.year_min, criteria.year_max) {
        query.push("fr", range);
    }
    if let Some(range) = range(criteria.mileage_min, criteria.mileage_max) {
        query.push("ml", range);
    }

    if let Some(value) = criteria.fuel.as_ref().and_then(vocab::fuel) {
        query.push("ft", value);
    }
    if let Some(value) = criteria.gearbox.as_ref().and_then(vocab::gearbox) {
        query.push("tr", value);
    }
    if let Some(value) = criteria.condition.as_ref().and_then(vocab::condition) {
        query.push("con", value);
    }
    if let Some(value) = criteria.seller_type.as_ref().and_then(vocab::seller_type) {
        query.push("st", value);
    }

    let zip = criteria
        .zip_code
        .as_deref()
        .map(str::trim)
        .filter(|zip| !zip.is_empty());
    if let Some(zip) = zip {
        query.push("zip", zip);
        if let Some(radius) = criteria.radius_km.filter(|r| *r > 0) {
            query.push("zipr", radius.to_string());
        }
    }

    let features: BTreeSet<&str> = criteria
        .features
        .iter()
        .filter_map(|feature| {
            let code = vocab::feature_code(feature);
            if code.is_none() {
                tracing::debug!("Search {} has unknown feature '{}'", criteria.id, feature);
            }
            code
        })
        .collect();
    for code in features {
        query.push("fe", code);
    }

    query.push("sb", "doc");
    query.push("od", "down");

    query
}

/// Resolved make ID plus model ID, or a keyword when the make is unknown
fn push_make_model(query: &mut Query, criteria: &SearchCriteria) {
    let make_text = criteria
        .make
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let model_text = criteria
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let Some(make_text) = make_text else {
        if let Some(model) = model_text {
            query.push("q", model);
        }
        return;
    };

    let resolved = canonical_make(make_text).and_then(|make| Some((make, vocab::make_id(make)?)));
    match resolved {
        Some((make, make_id)) => {
            let model_id = model_text.and_then(|model| vocab::model_id(make, model));
            match model_id {
                Some(model_id) => query.push("ms", format!("{};{};;", make_id, model_id)),
                None => {
                    if let Some(model) = model_text {
                        tracing::debug!("Unknown model '{}' for {}, searching by make", model, make);
                    }
                    query.push("ms", format!("{};;;", make_id));
                }
            }
        }
        None => {
            let keyword = match model_text {
                Some(model) => format!("{} {}", make_text, model),
                None => make_text.to_string(),
            };
            query.push("q", keyword);
        }
    }
}

/// "min:max" with either side left empty, or None when both are absent
fn range<T: ToString>(min: Option<T>, max: Option<T>) -> Option<String> {
    if min.is_none() && max.is_none() {
        return None;
    }
    let side = |value: Option<T>| value.map(|v| v.to_string()).unwrap_or_default();
    Some(format!("{}:{}", side(min), side(max)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Fuel, Gearbox, SellerType};

    fn bmw_3er() -> SearchCriteria {
        let mut criteria = SearchCriteria::new("user-1", "3er", "high");
        criteria.make = Some("BMW".to_string());
        criteria.model = Some("3er".to_string());
        criteria.price_max = Some(30_000);
        criteria
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut criteria = bmw_3er();
        criteria.features = vec!["Sitzheizung".to_string(), "Navi".to_string()];
        criteria.fuel = Some(Fuel::Diesel);

        assert_eq!(build_query(&criteria), build_query(&criteria));
    }

    #[test]
    fn test_make_model_and_price_bound() {
        let query = build_query(&bmw_3er());

        assert_eq!(query.get("ms"), Some("3500;73;;"));
        assert_eq!(query.get("p"), Some(":30000"));
        assert_eq!(query.get("q"), None);
    }

    #[test]
    fn test_absent_fields_are_not_emitted() {
        let query = build_query(&SearchCriteria::new("user-1", "anything", "low"));
        let keys: Vec<&str> = query.params().iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, vec!["s", "vc", "sb", "od"]);
        assert!(query.params().iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn test_unknown_model_searches_by_make() {
        let mut criteria = bmw_3er();
        criteria.model = Some("Isetta".to_string());

        assert_eq!(build_query(&criteria).get("ms"), Some("3500;;;"));
    }

    #[test]
    fn test_unknown_make_becomes_keyword() {
        let mut criteria = bmw_3er();
        criteria.make = Some("Wartburg".to_string());
        criteria.model = Some("353".to_string());

        let query = build_query(&criteria);
        assert_eq!(query.get("ms"), None);
        assert_eq!(query.get("q"), Some("Wartburg 353"));
    }

    #[test]
    fn test_make_alias_resolves() {
        let mut criteria = SearchCriteria::new("user-1", "golf", "high");
        criteria.make = Some("VW".to_string());
        criteria.model = Some("Golf".to_string());

        assert_eq!(build_query(&criteria).get("ms"), Some("25200;17;;"));
    }

    #[test]
    fn test_enumerated_fields_use_vocabulary() {
        let mut criteria = bmw_3er();
        criteria.fuel = Some(Fuel::PluginHybrid);
        criteria.gearbox = Some(Gearbox::Automatic);
        criteria.condition = Some(Condition::Used);
        criteria.seller_type = Some(SellerType::Private);
        criteria.year_min = Some(2018);
        criteria.mileage_max = Some(100_000);

        let query = build_query(&criteria);
        assert_eq!(query.get("ft"), Some("HYBRID_PLUGIN"));
        assert_eq!(query.get("tr"), Some("AUTOMATIC_GEAR"));
        assert_eq!(query.get("con"), Some("USED"));
        assert_eq!(query.get("st"), Some("FSBO"));
        assert_eq!(query.get("fr"), Some("2018:"));
        assert_eq!(query.get("ml"), Some(":100000"));
    }

    #[test]
    fn test_features_sorted_deduplicated_unknown_skipped() {
        let mut criteria = bmw_3er();
        criteria.features = vec![
            "Sitzheizung".to_string(),
            "Navi".to_string(),
            "Navigation".to_string(),
            "Schleudersitz".to_string(),
        ];

        assert_eq!(
            build_query(&criteria).get_all("fe"),
            vec!["ELECTRIC_HEATED_SEATS", "NAVIGATION_SYSTEM"]
        );
    }

    #[test]
    fn test_radius_requires_zip() {
        let mut criteria = bmw_3er();
        criteria.radius_km = Some(50);
        assert_eq!(build_query(&criteria).get("zipr"), None);

        criteria.zip_code = Some("10115".to_string());
        let query = build_query(&criteria);
        assert_eq!(query.get("zip"), Some("10115"));
        assert_eq!(query.get("zipr"), Some("50"));
    }

    #[test]
    fn test_page_url() {
        let base = Url::parse("https://suchen.example.de/fahrzeuge/search.html").unwrap();
        let query = build_query(&bmw_3er());

        let first = query.page_url(&base, 1);
        assert!(!first.as_str().contains(PAGE_PARAM));
        assert!(first.as_str().contains("ms=3500%3B73%3B%3B"));

        let third = query.page_url(&base, 3);
        assert!(third.as_str().ends_with("pageNumber=3"));
    }
}
