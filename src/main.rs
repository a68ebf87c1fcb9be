use anyhow::Result;
use chrono::Local;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod matching;
mod merge;
mod models;
mod parsers;
mod scrapers;
mod storage;
mod utils;

use crate::config::Config;
use crate::merge::{AttributeIngestor, MergeEngine};
use crate::models::Marketplace;
use crate::scrapers::{CatalogScraper, MagentoScraper, PrestashopScraper};
use crate::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_sync=info".parse()?),
        )
        .init();

    info!(
        "--- Starting catalog sync at {} ---",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let config = Arc::new(Config::load()?);

    let storage = Arc::new(SqliteStorage::new(&config.db_path).await?);
    storage.migrate().await?;
    if let Some(seed) = &config.seed_json_path {
        storage.import_from_json(seed).await?;
    }

    let client = utils::http::create_client(&config.user_agent)?;

    let magento = MagentoScraper::new(config.clone());
    let prestashop = PrestashopScraper::new(config.clone());

    // Fetch all targets concurrently; merging stays strictly sequential so
    // id allocation and the once-per-pass update marker are never raced.
    let scrape_futures = config.targets.iter().map(|target| {
        let client = client.clone();
        let magento = &magento;
        let prestashop = &prestashop;
        async move {
            let scraper: &dyn CatalogScraper = match target.marketplace {
                Marketplace::Primary => magento,
                Marketplace::Secondary => prestashop,
            };
            info!(target = %target.name, marketplace = %target.marketplace, "scraping target");
            (target, scraper.scrape_target(&client, target).await)
        }
    });
    let batches = join_all(scrape_futures).await;

    let mut catalog = storage.load_catalog().await?;
    let categories = storage.load_categories().await?;
    if catalog.is_empty() {
        info!("catalog is empty, all candidates will be inserts");
    }
    let engine = MergeEngine::new(&config.merge);

    for (target, result) in batches {
        match result {
            Ok(items) => {
                let summary = engine.run_pass(&mut catalog, &categories, target.scope_id, items);
                info!(
                    target = %target.name,
                    updated = summary.updated,
                    inserted = summary.inserted,
                    "target merged"
                );
            }
            Err(e) => {
                error!(target = %target.name, error = %e, "scrape failed, continuing with next target");
            }
        }
    }

    storage.save_catalog(&catalog).await?;

    if config.enrich_attributes {
        enrich_attributes(&config, &client, &prestashop, &catalog, storage.as_ref()).await?;
    }

    info!(rows = catalog.len(), "Catalog sync finished");
    Ok(())
}

/// EAV enrichment: products known only from the secondary marketplace get
/// their specification sheet scraped and folded into the attribute tables.
async fn enrich_attributes(
    config: &Config,
    client: &reqwest::Client,
    prestashop: &PrestashopScraper,
    catalog: &models::Catalog,
    storage: &dyn Storage,
) -> Result<()> {
    let (mut definitions, mut values) = storage.load_attributes().await?;
    let mut ingestor = AttributeIngestor::new(&definitions);

    let pending: Vec<_> = catalog
        .entries
        .iter()
        .filter(|e| e.reference_primary.is_none())
        .filter_map(|e| {
            e.source_url_secondary
                .as_deref()
                .map(|url| (e.id, e.category_id, url))
        })
        .collect();
    info!(products = pending.len(), "enriching attributes from spec sheets");

    for (product_id, category_id, url) in pending {
        match prestashop.scrape_spec_sheet(client, url).await {
            Ok(pairs) => {
                let written =
                    ingestor.ingest(&mut definitions, &mut values, product_id, category_id, pairs);
                info!(product_id, written, "spec sheet ingested");
            }
            Err(e) => {
                warn!(product_id, url, error = %e, "spec sheet fetch failed, skipping product");
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(config.request_delay_ms)).await;
    }

    storage.save_attributes(&definitions, &values).await?;
    Ok(())
}
