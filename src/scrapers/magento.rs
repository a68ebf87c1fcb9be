use async_trait::async_trait;
use anyhow::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::{Config, ScrapeTarget, SiteConfig};
use crate::models::{CandidateRecord, Marketplace};
use crate::parsers::clean_text;
use crate::scrapers::{CatalogScraper, ScrapeError, ScrapeItem};
use crate::utils::http::fetch_with_retry;

/// Scraper for the Magento-based storefront (marketplace A).
pub struct MagentoScraper {
    config: Arc<Config>,
}

impl MagentoScraper {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CatalogScraper for MagentoScraper {
    async fn scrape_target(&self, client: &Client, target: &ScrapeTarget) -> Result<Vec<ScrapeItem>> {
        let mut items = Vec::new();

        for page in 1..=self.config.max_pages {
            let page_url = format!("{}?p={}", target.url, page);
            info!(category = %target.name, page, url = %page_url, "fetching listing page");

            let html = match fetch_with_retry(client, &page_url, 3).await {
                Ok(response) => response.text().await?,
                Err(e) => {
                    warn!(category = %target.name, page, error = %e, "stopping category after fetch failure");
                    break;
                }
            };

            let page_items = parse_listing_page(&html, &self.site_config().base_url)?;
            if page_items.is_empty() {
                info!(category = %target.name, page, "no more listings, category done");
                break;
            }
            items.extend(page_items);

            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        Ok(items)
    }

    fn marketplace(&self) -> Marketplace {
        Marketplace::Primary
    }

    fn site_config(&self) -> &SiteConfig {
        &self.config.sites[Marketplace::Primary.key()]
    }
}

/// Extracts product items from a Magento category listing page.
pub fn parse_listing_page(html: &str, base_url: &str) -> Result<Vec<ScrapeItem>> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("li.product-item, div.products-grid li.item")
        .map_err(|e| anyhow::anyhow!("bad product selector: {e}"))?;
    let name_selector = Selector::parse("a.product-item-link").unwrap();
    let reference_selector = Selector::parse(".product-item-sku, [itemprop=sku]").unwrap();
    let price_selector = Selector::parse("span.price").unwrap();
    let availability_selector = Selector::parse(".stock span, .stock").unwrap();

    let mut items = Vec::new();

    for element in document.select(&item_selector) {
        let link = element.select(&name_selector).next();
        let name = link
            .map(|n| clean_text(&n.text().collect::<String>()))
            .unwrap_or_default();

        let url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| {
                Url::parse(base_url)
                    .and_then(|base| base.join(href))
                    .ok()
                    .map(|u| u.to_string())
            });

        let Some(url) = url else {
            items.push(Err(ScrapeError::MissingField {
                field: "product url",
                url: base_url.to_string(),
            }));
            continue;
        };

        let raw_reference = element
            .select(&reference_selector)
            .next()
            .map(|r| clean_text(&r.text().collect::<String>()))
            .filter(|r| !r.is_empty());

        let raw_price_text = element
            .select(&price_selector)
            .next()
            .map(|p| clean_text(&p.text().collect::<String>()))
            .filter(|p| !p.is_empty());

        let availability = element
            .select(&availability_selector)
            .next()
            .map(|a| clean_text(&a.text().collect::<String>()))
            .filter(|a| !a.is_empty());

        items.push(Ok(CandidateRecord {
            name,
            raw_reference,
            raw_price_text,
            availability,
            source_marketplace: Marketplace::Primary,
            source_url: url,
        }));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"
        <ol class="products list items product-items">
          <li class="product-item">
            <a class="product-item-link" href="/pixma-mg2541s.html">Imprimante Canon PIXMA MG2541S</a>
            <div class="product-item-sku">MG2541S</div>
            <span class="price">120,000 DT</span>
            <div class="stock available"><span>En stock</span></div>
          </li>
        </ol>"#;

    #[test]
    fn parses_product_items_into_candidates() {
        let items = parse_listing_page(LISTING, "https://shop-a.example").unwrap();
        assert_eq!(items.len(), 1);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.name, "Imprimante Canon PIXMA MG2541S");
        assert_eq!(first.raw_reference.as_deref(), Some("MG2541S"));
        assert_eq!(first.raw_price_text.as_deref(), Some("120,000 DT"));
        assert_eq!(first.availability.as_deref(), Some("En stock"));
        assert_eq!(first.source_url, "https://shop-a.example/pixma-mg2541s.html");
        assert_eq!(first.source_marketplace, Marketplace::Primary);
    }

    #[test]
    fn item_without_link_is_a_structured_error() {
        let html = r#"<li class="product-item"><span class="price">10,000</span></li>"#;
        let items = parse_listing_page(html, "https://shop-a.example").unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
