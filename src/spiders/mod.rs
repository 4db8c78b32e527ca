pub mod chi_buildings;

use crate::common::constants::{get_supported_spiders, CHI_BUILDINGS_SPIDER};
use crate::common::error::{Result, ScraperError};
use crate::config::Config;
use crate::spider::Spider;

pub use chi_buildings::ChiBuildingsSpider;

/// Build the spider registered under `name`
pub fn create_spider(name: &str, config: &Config) -> Result<Box<dyn Spider>> {
    match name {
        CHI_BUILDINGS_SPIDER => Ok(Box::new(ChiBuildingsSpider::new(&config.crawl))),
        other => Err(ScraperError::UnknownSpider(other.to_string())),
    }
}

pub fn supported_spiders() -> Vec<&'static str> {
    get_supported_spiders()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_spider_is_constructible() {
        let config = Config::default();
        for name in supported_spiders() {
            let spider = create_spider(name, &config).unwrap();
            assert_eq!(spider.name(), name);
        }
    }

    #[test]
    fn test_unknown_spider() {
        let result = create_spider("chi_nowhere", &Config::default());
        assert!(matches!(result, Err(ScraperError::UnknownSpider(name)) if name == "chi_nowhere"));
    }
}
