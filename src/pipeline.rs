use crate::app::ports::HttpClientPort;
use crate::common::error::{Result, ScraperError};
use crate::common::helpers::local_now;
use crate::common::types::Event;
use crate::config::Config;
use crate::crawler::Crawler;
use crate::spider::Spider;
use crate::spiders::create_spider;
use chrono::{NaiveDateTime, Utc};
use metrics::histogram;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of a complete crawl run for one spider
#[derive(Debug, Serialize)]
pub struct CrawlResult {
    pub spider_name: String,
    pub total_requests: usize,
    pub total_events: usize,
    pub errors: Vec<String>,
    pub output_file: String,
}

pub struct Pipeline;

impl Pipeline {
    /// Build the named spider from `config` and crawl it at the agency's current local time
    pub async fn run_named(
        name: &str,
        config: &Config,
        http: Arc<dyn HttpClientPort>,
        output_dir: &str,
    ) -> Result<CrawlResult> {
        let spider = create_spider(name, config)?;
        let tz: chrono_tz::Tz = spider.timezone().parse().map_err(|e| {
            ScraperError::Config(format!("invalid timezone {}: {}", spider.timezone(), e))
        })?;
        Self::run_for_spider(spider.as_ref(), http, local_now(tz), output_dir).await
    }

    /// Crawl with `spider` and write every record it yields to a JSON feed
    #[instrument(skip(spider, http), fields(spider = %spider.name()))]
    pub async fn run_for_spider(
        spider: &dyn Spider,
        http: Arc<dyn HttpClientPort>,
        now: NaiveDateTime,
        output_dir: &str,
    ) -> Result<CrawlResult> {
        let spider_name = spider.name().to_string();
        info!("🚀 Starting crawl for {} ({})", spider_name, spider.agency_name());
        let t_crawl = std::time::Instant::now();

        let outcome = Crawler::new(http).crawl(spider, now).await;
        histogram!("city_scrapers_crawl_duration_seconds", "spider" => spider_name.clone())
            .record(t_crawl.elapsed().as_secs_f64());

        if !outcome.errors.is_empty() {
            warn!("{} errors encountered during crawl", outcome.errors.len());
        }
        info!(
            "✅ Crawled {} requests, {} events",
            outcome.requests,
            outcome.items.len()
        );

        let output_file = Self::persist_to_json(&outcome.items, &spider_name, output_dir)?;
        info!("💾 Saved events to {}", output_file);

        Ok(CrawlResult {
            spider_name,
            total_requests: outcome.requests,
            total_events: outcome.items.len(),
            errors: outcome.errors,
            output_file,
        })
    }

    /// Persist events to a timestamped JSON feed file
    pub fn persist_to_json(events: &[Event], spider_name: &str, output_dir: &str) -> Result<String> {
        fs::create_dir_all(output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{spider_name}_{timestamp}.json");
        let filepath = Path::new(output_dir).join(&filename);

        let json_content = serde_json::to_string_pretty(events)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}
