//! Spider contract used by the crawler.
//!
//! A spider turns fetched responses into [`Event`] records and, optionally, follow-up
//! requests for meeting detail pages. Follow-up requests carry the partially built
//! record so the detail callback can finish it.

use crate::app::ports::HttpGetResult;
use crate::common::error::Result;
use crate::common::types::Event;
use chrono::NaiveDateTime;
use scraper::Html;
use serde::de::DeserializeOwned;

/// What the crawler should do with a fetched page
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// Listing page, handled by [`Spider::parse`]
    Listing,
    /// Detail page for the carried record, handled by [`Spider::parse_detail`]
    Detail(Box<Event>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub kind: RequestKind,
}

impl Request {
    pub fn listing(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Listing,
        }
    }

    pub fn detail(url: impl Into<String>, item: Event) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Detail(Box::new(item)),
        }
    }
}

/// Fetched page handed to a spider callback
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

impl From<HttpGetResult> for Response {
    fn from(result: HttpGetResult) -> Self {
        Self {
            url: result.url,
            status: result.status,
            body: String::from_utf8_lossy(&result.bytes).into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutput {
    Item(Event),
    Request(Request),
}

impl ParseOutput {
    /// The record produced by this output, whether emitted now or carried to a detail page
    pub fn event(&self) -> Option<&Event> {
        match self {
            ParseOutput::Item(event) => Some(event),
            ParseOutput::Request(Request {
                kind: RequestKind::Detail(event),
                ..
            }) => Some(event),
            ParseOutput::Request(_) => None,
        }
    }
}

/// Core trait that all meeting spiders must implement
pub trait Spider: Send + Sync {
    /// Unique identifier, also the first segment of every record id
    fn name(&self) -> &'static str;

    fn agency_name(&self) -> &'static str;

    /// IANA timezone of the agency's published times
    fn timezone(&self) -> &'static str;

    /// Initial requests for a crawl started at local time `now`
    fn start_requests(&self, now: NaiveDateTime) -> Vec<Request>;

    /// Handle a listing response
    fn parse(&self, response: &Response) -> Result<Vec<ParseOutput>>;

    /// Finish a record from its detail page
    fn parse_detail(&self, _response: &Response, item: Event) -> Result<Event> {
        Ok(item)
    }
}
