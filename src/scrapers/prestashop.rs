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

/// Scraper for the PrestaShop-based storefront (marketplace B).
pub struct PrestashopScraper {
    config: Arc<Config>,
}

impl PrestashopScraper {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Fetches one product page and returns its specification table as
    /// (attribute, value) pairs, for the EAV enrichment flow.
    pub async fn scrape_spec_sheet(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<Vec<(String, String)>, ScrapeError> {
        let response = fetch_with_retry(client, url, 3)
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))?;
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))?;
        parse_spec_sheet(&html)
    }
}

#[async_trait]
impl CatalogScraper for PrestashopScraper {
    async fn scrape_target(&self, client: &Client, target: &ScrapeTarget) -> Result<Vec<ScrapeItem>> {
        let mut items = Vec::new();

        for page in 1..=self.config.max_pages {
            let page_url = format!("{}?page={}", target.url, page);
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
        Marketplace::Secondary
    }

    fn site_config(&self) -> &SiteConfig {
        &self.config.sites[Marketplace::Secondary.key()]
    }
}

/// Extracts all product miniatures from one listing page. An item without a
/// product link becomes an `Err` entry for the engine to count and skip.
pub fn parse_listing_page(html: &str, base_url: &str) -> Result<Vec<ScrapeItem>> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("article.product-miniature")
        .map_err(|e| anyhow::anyhow!("bad product selector: {e}"))?;
    let title_selector = Selector::parse("h2.product-title, h3.product-title").unwrap();
    let reference_selector = Selector::parse("span.product-reference, .product-reference").unwrap();
    let price_selector = Selector::parse(".product-price-and-shipping .price, span.price").unwrap();
    let availability_selector = Selector::parse("#stock_availability, .product-availability").unwrap();
    let link_selector = Selector::parse("a.product-thumbnail, h2.product-title a, a").unwrap();

    let mut items = Vec::new();

    for element in document.select(&item_selector) {
        let name = element
            .select(&title_selector)
            .next()
            .map(|n| clean_text(&n.text().collect::<String>()))
            .unwrap_or_default();

        let url = element
            .select(&link_selector)
            .find_map(|a| a.value().attr("href"))
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
            .map(|r| r.trim_start_matches("[").trim_end_matches("]").to_string())
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
            source_marketplace: Marketplace::Secondary,
            source_url: url,
        }));
    }

    Ok(items)
}

/// Parses a PrestaShop data sheet (`dl.data-sheet`) into attribute pairs.
pub fn parse_spec_sheet(html: &str) -> Result<Vec<(String, String)>, ScrapeError> {
    let document = Html::parse_document(html);
    let dt_selector = Selector::parse("section.product-features dl.data-sheet dt.name, dl.data-sheet dt.name")
        .map_err(|e| ScrapeError::Selector(e.to_string()))?;
    let dd_selector = Selector::parse("dd.value").unwrap();

    let mut pairs = Vec::new();
    for dt in document.select(&dt_selector) {
        let key = clean_text(&dt.text().collect::<String>());
        // The value is the next dd sibling of this dt.
        let value = dt
            .next_siblings()
            .filter_map(scraper::ElementRef::wrap)
            .find(|el| dd_selector.matches(el))
            .map(|dd| clean_text(&dd.text().collect::<String>()));

        if let (false, Some(value)) = (key.is_empty(), value) {
            if !value.is_empty() {
                pairs.push((key, value));
            }
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"
        <div id="products">
          <article class="product-miniature">
            <a class="product-thumbnail" href="/imprimantes/ts3340.html"></a>
            <h2 class="product-title"><a href="/imprimantes/ts3340.html">Imprimante CANON PIXMA TS3340</a></h2>
            <span class="product-reference">[3771C007AA]</span>
            <div class="product-price-and-shipping"><span class="price">199,000 DT</span></div>
            <div class="product-availability">En stock</div>
          </article>
          <article class="product-miniature">
            <h2 class="product-title">Orphan without link</h2>
          </article>
        </div>"#;

    #[test]
    fn parses_miniatures_into_candidates() {
        let items = parse_listing_page(LISTING, "https://shop-b.example").unwrap();
        assert_eq!(items.len(), 2);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.name, "Imprimante CANON PIXMA TS3340");
        assert_eq!(first.raw_reference.as_deref(), Some("3771C007AA"));
        assert_eq!(first.raw_price_text.as_deref(), Some("199,000 DT"));
        assert_eq!(first.availability.as_deref(), Some("En stock"));
        assert_eq!(first.source_url, "https://shop-b.example/imprimantes/ts3340.html");
        assert_eq!(first.source_marketplace, Marketplace::Secondary);

        assert!(items[1].is_err());
    }

    #[test]
    fn empty_page_yields_no_items() {
        let items = parse_listing_page("<div id='products'></div>", "https://shop-b.example").unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn scrape_target_walks_pages_until_empty() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imprimantes"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/imprimantes"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div id='products'></div>"))
            .mount(&server)
            .await;

        let mut config = crate::config::Config::default();
        config.request_delay_ms = 0;
        config
            .sites
            .get_mut(Marketplace::Secondary.key())
            .unwrap()
            .base_url = server.uri();
        let scraper = PrestashopScraper::new(std::sync::Arc::new(config));

        let client = crate::utils::http::create_client("catalog-sync-test").unwrap();
        let target = crate::config::ScrapeTarget {
            name: "Imprimantes".to_string(),
            url: format!("{}/imprimantes", server.uri()),
            scope_id: 1,
            marketplace: Marketplace::Secondary,
        };

        let items = scraper.scrape_target(&client, &target).await.unwrap();
        assert_eq!(items.len(), 2);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.raw_reference.as_deref(), Some("3771C007AA"));
    }

    #[test]
    fn spec_sheet_pairs_up_names_and_values() {
        let html = r#"
            <section class="product-features">
              <dl class="data-sheet">
                <dt class="name">Puissance</dt><dd class="value">650 VA</dd>
                <dt class="name">Garantie</dt><dd class="value">1 an</dd>
                <dt class="name">Vide</dt><dd class="value"></dd>
              </dl>
            </section>"#;
        let pairs = parse_spec_sheet(html).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Puissance".to_string(), "650 VA".to_string()),
                ("Garantie".to_string(), "1 an".to_string()),
            ]
        );
    }
}
