use crate::config::SelectorConfig;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;

/// Compiled result-page selectors
#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub item: Selector,
    pub title: Selector,
    pub price: Selector,
    pub link: Selector,
    pub specs: Selector,
    pub seller: Selector,
    pub image: Selector,
    pub feature: Selector,
    pub pagination: Selector,
    pub source_id_attribute: String,
}

impl SelectorSet {
    /// Compiles every configured selector, failing on the first invalid one
    pub fn compile(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            item: compile("item", &config.item)?,
            title: compile("title", &config.title)?,
            price: compile("price", &config.price)?,
            link: compile("link", &config.link)?,
            specs: compile("specs", &config.specs)?,
            seller: compile("seller", &config.seller)?,
            image: compile("image", &config.image)?,
            feature: compile("feature", &config.feature)?,
            pagination: compile("pagination", &config.pagination)?,
            source_id_attribute: config.source_id_attribute.clone(),
        })
    }
}

fn compile(field: &'static str, selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}
