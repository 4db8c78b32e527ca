use crate::app::ports::HttpClientPort;
use crate::common::error::{Result, ScraperError};
use crate::common::types::Event;
use crate::spider::{ParseOutput, Request, RequestKind, Response, Spider};
use chrono::NaiveDateTime;
use metrics::counter;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Items and failures gathered from one crawl
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub items: Vec<Event>,
    pub requests: usize,
    pub errors: Vec<String>,
}

/// Sequential FIFO fetch loop that feeds responses to a spider
pub struct Crawler {
    http: Arc<dyn HttpClientPort>,
}

impl Crawler {
    pub fn new(http: Arc<dyn HttpClientPort>) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> Result<Response> {
        let result = self.http.get(url).await?;
        if !result.is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: result.status,
            });
        }
        Ok(Response::from(result))
    }

    #[instrument(skip(self, spider), fields(spider = %spider.name()))]
    pub async fn crawl(&self, spider: &dyn Spider, now: NaiveDateTime) -> CrawlOutcome {
        let spider_name = spider.name().to_string();
        let mut queue: VecDeque<Request> = spider.start_requests(now).into();
        let mut outcome = CrawlOutcome::default();

        while let Some(request) = queue.pop_front() {
            outcome.requests += 1;
            counter!("city_scrapers_requests_total", "spider" => spider_name.clone()).increment(1);
            debug!("Fetching {}", request.url);

            let response = match self.fetch(&request.url).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Fetch failed for {}: {}", request.url, e);
                    counter!("city_scrapers_request_errors_total", "spider" => spider_name.clone())
                        .increment(1);
                    outcome.errors.push(format!("{}: {}", request.url, e));
                    continue;
                }
            };

            match request.kind {
                RequestKind::Listing => match spider.parse(&response) {
                    Ok(outputs) => {
                        for output in outputs {
                            match output {
                                ParseOutput::Item(event) => outcome.items.push(event),
                                ParseOutput::Request(next) => queue.push_back(next),
                            }
                        }
                    }
                    Err(e) => {
                        error!("Parse failed for {}: {}", request.url, e);
                        outcome.errors.push(format!("{}: {}", request.url, e));
                    }
                },
                RequestKind::Detail(item) => match spider.parse_detail(&response, *item) {
                    Ok(event) => outcome.items.push(event),
                    Err(e) => {
                        error!("Detail parse failed for {}: {}", request.url, e);
                        outcome.errors.push(format!("{}: {}", request.url, e));
                    }
                },
            }
        }

        counter!("city_scrapers_items_total", "spider" => spider_name.clone())
            .increment(outcome.items.len() as u64);
        outcome
    }
}
