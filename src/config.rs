use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Marketplace;

/// Application configuration. Defaults are built in; a `catalog-sync.toml`
/// next to the binary and `CATALOG_SYNC_*` environment variables override
/// them (e.g. `CATALOG_SYNC_MERGE__PRICE_TOLERANCE=0.05`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sites: HashMap<String, SiteConfig>,
    pub targets: Vec<ScrapeTarget>,
    pub merge: MergeSettings,
    pub db_path: String,
    /// Optional JSON catalog seed imported on startup when the db is empty.
    pub seed_json_path: Option<String>,
    pub user_agent: String,
    pub max_pages: u32,
    pub request_delay_ms: u64,
    /// Fetch specification sheets for secondary-only products after merging.
    pub enrich_attributes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
}

/// One paginated listing to scrape: a category page on one marketplace,
/// merged under the given category scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub name: String,
    pub url: String,
    pub scope_id: i64,
    pub marketplace: Marketplace,
}

/// Knobs of the merge core. The thresholds are on the 0-100 similarity scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub price_tolerance: f64,
    pub fuzzy_reference_threshold: f64,
    pub fuzzy_category_threshold: f64,
    pub unassigned_category_sentinel: i64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            price_tolerance: 0.03,
            fuzzy_reference_threshold: 85.0,
            fuzzy_category_threshold: 80.0,
            unassigned_category_sentinel: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut sites = HashMap::new();
        sites.insert(
            Marketplace::Primary.key().to_string(),
            SiteConfig {
                name: "Marketplace A".to_string(),
                base_url: "https://shop-a.example".to_string(),
            },
        );
        sites.insert(
            Marketplace::Secondary.key().to_string(),
            SiteConfig {
                name: "Marketplace B".to_string(),
                base_url: "https://shop-b.example".to_string(),
            },
        );

        Self {
            sites,
            targets: Vec::new(),
            merge: MergeSettings::default(),
            db_path: "catalog_sync.db".to_string(),
            seed_json_path: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36".to_string(),
            max_pages: 50,
            request_delay_ms: 1000,
            enrich_attributes: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Config::default();
        let raw = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(File::with_name("catalog-sync").required(false))
            .add_source(Environment::with_prefix("CATALOG_SYNC").separator("__"))
            .build()
            .context("Failed to assemble configuration")?;

        raw.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let merge = MergeSettings::default();
        assert_eq!(merge.price_tolerance, 0.03);
        assert_eq!(merge.fuzzy_reference_threshold, 85.0);
        assert_eq!(merge.fuzzy_category_threshold, 80.0);
        assert_eq!(merge.unassigned_category_sentinel, 0);
    }

    #[test]
    fn both_marketplaces_have_a_default_site() {
        let config = Config::default();
        assert!(config.sites.contains_key(Marketplace::Primary.key()));
        assert!(config.sites.contains_key(Marketplace::Secondary.key()));
    }
}
