/// Unvalidated data extracted from one result page for one candidate vehicle
///
/// Lives only for the duration of a cycle; the normalizer turns it into a
/// [`crate::model::Vehicle`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    /// Headline text, usually "Make Model Variant"
    pub title: Option<String>,

    /// Price as displayed, e.g. "24.990 €"
    pub price_text: Option<String>,

    /// Absolute URL of the detail page
    pub detail_link: Option<String>,

    /// Free-text specification blob (registration, mileage, power, fuel, ...)
    pub specs_text: Option<String>,

    /// Seller blurb (dealer name, private seller, location)
    pub seller_text: Option<String>,

    /// Absolute image URLs in page order
    pub images: Vec<String>,

    /// Equipment labels listed on the result card
    pub features: Vec<String>,

    /// Listing ID published by the source site, if any
    pub source_id: Option<String>,
}

impl RawListing {
    /// A listing needs a title or a detail link to be identifiable at all
    pub fn has_identity(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.title) || present(&self.detail_link)
    }
}
