use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Pooled HTTP client shared by both marketplace scrapers.
pub fn create_client(user_agent: &str) -> Result<Client> {
    let client = ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(25))
        .pool_max_idle_per_host(6)
        .build()
        .context("Failed to build HTTP client")?;

    Ok(client)
}

/// GET with exponential backoff. Non-2xx statuses count as failures.
pub async fn fetch_with_retry(client: &Client, url: &str, max_retries: u32) -> Result<Response> {
    let mut last_error = None;

    for attempt in 1..=max_retries {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                warn!(status = %response.status(), url, "http error");
                last_error = Some(anyhow::anyhow!("HTTP error: {}", response.status()));
            }
            Err(e) => {
                warn!(url, error = %e, "request failed");
                last_error = Some(e.into());
            }
        }

        if attempt < max_retries {
            let delay = Duration::from_secs(2u64.pow(attempt));
            warn!(url, attempt, "retrying in {:?}", delay);
            sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
        .with_context(|| format!("Failed to fetch {} after {} attempts", url, max_retries))
}
