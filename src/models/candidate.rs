use serde::{Deserialize, Serialize};
use std::fmt;

/// The two storefront platforms being reconciled. `Primary` fields on a
/// catalog entry come from the Magento storefront, `Secondary` fields from
/// the PrestaShop storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marketplace {
    #[serde(rename = "magento")]
    Primary,
    #[serde(rename = "prestashop")]
    Secondary,
}

impl Marketplace {
    pub fn key(&self) -> &'static str {
        match self {
            Marketplace::Primary => "magento",
            Marketplace::Secondary => "prestashop",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Marketplace::Primary => Marketplace::Secondary,
            Marketplace::Secondary => Marketplace::Primary,
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One scraped listing, consumed once by the merge engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub raw_reference: Option<String>,
    pub raw_price_text: Option<String>,
    pub availability: Option<String>,
    pub source_marketplace: Marketplace,
    pub source_url: String,
}
